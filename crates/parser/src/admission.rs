use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static EXTENSION_BLOCKLIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\.(css|js|bmp|gif|jpe?g|ico|png|tiff?|mid|mp2|mp3|mp4|wav|avi|mov|mpeg|ram|m4v|mkv|ogg|ogv|pdf|ps|eps|tex|ppt|pptx|doc|docx|xls|xlsx|names|data|dat|exe|bz2|tar|msi|bin|7z|psd|dmg|iso|epub|dll|cnf|tgz|sha1|thmx|mso|arff|rtf|jar|csv|rm|smil|wmv|swf|wma|zip|rar|gz)$",
    )
    .unwrap()
});

static CALENDAR_TRAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/calendar/\d{4}/\d{1,2}/\d{1,2}").unwrap()
});

const SESSION_QUERY_KEYS: [&str; 3] = ["session", "sid", "jsessionid"];
const MAX_PATH_SEGMENT_LEN: usize = 50;

/// Predicate over a canonical URL: should this ever be crawled?
/// Pure and deterministic; takes no lock and does no I/O.
pub fn is_valid(canonical_url: &str, allowed_host_suffixes: &[String]) -> bool {
    let Ok(parsed) = Url::parse(canonical_url) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }

    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    if !allowed_host_suffixes.iter().any(|suffix| host.ends_with(suffix.as_str())) {
        return false;
    }

    let path_lower = parsed.path().to_ascii_lowercase();
    if EXTENSION_BLOCKLIST.is_match(&path_lower) {
        return false;
    }

    if CALENDAR_TRAP.is_match(&path_lower) {
        return false;
    }

    if parsed
        .query_pairs()
        .any(|(k, _)| SESSION_QUERY_KEYS.contains(&k.to_ascii_lowercase().as_str()))
    {
        return false;
    }

    if parsed
        .path()
        .split('/')
        .any(|seg| seg.len() > MAX_PATH_SEGMENT_LEN)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes() -> Vec<String> {
        vec![
            ".ics.uci.edu".to_string(),
            ".cs.uci.edu".to_string(),
            ".informatics.uci.edu".to_string(),
            ".stat.uci.edu".to_string(),
        ]
    }

    #[test]
    fn rejects_foreign_host() {
        assert!(!is_valid("http://evil.com/", &suffixes()));
    }

    #[test]
    fn accepts_allowed_host() {
        assert!(is_valid("http://a.ics.uci.edu/index.html", &suffixes()));
    }

    #[test]
    fn rejects_calendar_trap() {
        assert!(!is_valid(
            "http://a.ics.uci.edu/calendar/2024/01/01",
            &suffixes()
        ));
    }

    #[test]
    fn rejects_session_id_query() {
        assert!(!is_valid(
            "http://a.ics.uci.edu/page?sid=abc123",
            &suffixes()
        ));
    }

    #[test]
    fn rejects_blocked_extension() {
        assert!(!is_valid("http://a.ics.uci.edu/slides.pptx", &suffixes()));
    }

    #[test]
    fn rejects_extensions_that_were_corrupted_by_line_continuations() {
        assert!(!is_valid("http://a.ics.uci.edu/paper.pdf", &suffixes()));
        assert!(!is_valid("http://a.ics.uci.edu/export.csv", &suffixes()));
        assert!(!is_valid("http://a.ics.uci.edu/archive.iso", &suffixes()));
        assert!(!is_valid("http://a.ics.uci.edu/checksum.sha1", &suffixes()));
        assert!(!is_valid("http://a.ics.uci.edu/clip.mp4", &suffixes()));
        assert!(!is_valid("http://a.ics.uci.edu/favicon.ico", &suffixes()));
    }

    #[test]
    fn rejects_long_path_segment() {
        let long_seg = "a".repeat(60);
        let url = format!("http://a.ics.uci.edu/{long_seg}");
        assert!(!is_valid(&url, &suffixes()));
    }
}
