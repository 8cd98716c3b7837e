use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crawler_core::Response;

use crate::canonicalize::canonicalize;
use crate::low_info::is_low_info;
use crate::reports::ReportSink;

const MAX_CONTENT_LENGTH: usize = 5_000_000;
const CACHE_SERVER_ERROR_RANGE: std::ops::RangeInclusive<u16> = 600..=608;

/// Runs a fetched response through the ordered rejection rules and, if the
/// page survives, extracts and canonicalizes its outbound links.
///
/// `reports` is optional: passing `None` skips the diagnostic accumulation
/// entirely (useful in unit tests), passing `Some` feeds component L.
pub fn extract_next_links(
    source_url: &str,
    response: Option<&Response>,
    reports: Option<&ReportSink>,
) -> Vec<String> {
    let Some(response) = response else {
        debug!(url = source_url, "no response, dropping");
        return Vec::new();
    };

    if CACHE_SERVER_ERROR_RANGE.contains(&response.status) {
        debug!(url = source_url, status = response.status, "cache server error, dropping");
        return Vec::new();
    }

    if response.status == 301 || response.status == 302 {
        return match response
            .raw_response
            .as_ref()
            .and_then(|r| r.header("location"))
        {
            Some(location) => vec![location.to_string()],
            None => {
                debug!(url = source_url, "redirect with no Location, dropping");
                Vec::new()
            }
        };
    }

    if response.status != 200 {
        debug!(url = source_url, status = response.status, "non-200, dropping");
        return Vec::new();
    }

    let Some(raw) = response.raw_response.as_ref() else {
        debug!(url = source_url, "empty raw response, dropping");
        return Vec::new();
    };

    if raw.content.is_empty() {
        debug!(url = source_url, "empty content, dropping");
        return Vec::new();
    }

    if let Some(len) = raw.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        if len > MAX_CONTENT_LENGTH {
            debug!(url = source_url, len, "oversize content, dropping");
            return Vec::new();
        }
    }

    if let Some(content_type) = raw.header("content-type") {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        if mime != "text/html" && mime != "application/xhtml+xml" {
            debug!(url = source_url, content_type, "non-html content-type, dropping");
            return Vec::new();
        }
    }

    let body = String::from_utf8_lossy(&raw.content);
    let document = Html::parse_document(&body);
    let body_text = visible_text(&document);

    if is_low_info(&body_text) {
        info!(url = source_url, "LOWINFO, dropping links");
        return Vec::new();
    }

    let Ok(base) = Url::parse(&raw.url) else {
        return Vec::new();
    };

    if let Some(sink) = reports {
        sink.record_page(&base, &body_text);
    }

    extract_links(&document, &base)
}

fn visible_text(document: &Html) -> String {
    let body_selector = Selector::parse("body").unwrap();
    let skip_selector = Selector::parse("script, style").unwrap();

    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let skip_ids: std::collections::HashSet<_> = document
        .select(&skip_selector)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    body.descendants()
        .filter_map(|node| node.value().as_text().map(|t| (node.id(), t)))
        .filter(|(id, _)| !skip_ids.contains(id))
        .map(|(_, t)| t.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let link_selector = Selector::parse("a[href]").unwrap();
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for el in document.select(&link_selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        let Some(canonical) = canonicalize(resolved.as_str()) else {
            continue;
        };
        if seen.insert(canonical.clone()) {
            out.push(canonical);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawler_core::RawResponse;
    use std::collections::HashMap;

    fn html_response(url: &str, body: &str) -> Response {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        Response {
            url: url.to_string(),
            status: 200,
            error: None,
            raw_response: Some(RawResponse {
                url: url.to_string(),
                content: body.as_bytes().to_vec(),
                headers,
            }),
        }
    }

    #[test]
    fn drops_when_response_absent() {
        assert!(extract_next_links("http://a.ics.uci.edu/", None, None).is_empty());
    }

    #[test]
    fn drops_non_html_content_type() {
        let mut resp = html_response("http://a.ics.uci.edu/", "<html></html>");
        resp.raw_response
            .as_mut()
            .unwrap()
            .headers
            .insert("content-type".to_string(), "application/pdf".to_string());
        assert!(extract_next_links("http://a.ics.uci.edu/", Some(&resp), None).is_empty());
    }

    #[test]
    fn redirect_without_location_is_dropped() {
        let resp = Response {
            url: "http://a.ics.uci.edu/".to_string(),
            status: 301,
            error: None,
            raw_response: Some(RawResponse {
                url: "http://a.ics.uci.edu/".to_string(),
                content: vec![1],
                headers: HashMap::new(),
            }),
        };
        assert!(extract_next_links("http://a.ics.uci.edu/", Some(&resp), None).is_empty());
    }

    #[test]
    fn redirect_with_location_yields_single_link() {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), "http://a.ics.uci.edu/new".to_string());
        let resp = Response {
            url: "http://a.ics.uci.edu/".to_string(),
            status: 302,
            error: None,
            raw_response: Some(RawResponse {
                url: "http://a.ics.uci.edu/".to_string(),
                content: vec![1],
                headers,
            }),
        };
        let links = extract_next_links("http://a.ics.uci.edu/", Some(&resp), None);
        assert_eq!(links, vec!["http://a.ics.uci.edu/new".to_string()]);
    }

    #[test]
    fn extracts_and_canonicalizes_outbound_links() {
        let words: String = (0..150).map(|i| format!("word{i} ")).collect();
        let body = format!(
            "<html><body><a href=\"/b?y=2&x=1\">b</a><a href=\"/b?x=1&y=2\">dup</a>{words}</body></html>"
        );
        let resp = html_response("http://a.ics.uci.edu/a", &body);
        let links = extract_next_links("http://a.ics.uci.edu/a", Some(&resp), None);
        assert_eq!(links, vec!["http://a.ics.uci.edu/b?x=1&y=2".to_string()]);
    }

    #[test]
    fn oversize_content_length_is_dropped() {
        let mut resp = html_response("http://a.ics.uci.edu/", "<html></html>");
        resp.raw_response
            .as_mut()
            .unwrap()
            .headers
            .insert("content-length".to_string(), "6000000".to_string());
        assert!(extract_next_links("http://a.ics.uci.edu/", Some(&resp), None).is_empty());
    }

    #[test]
    fn low_info_page_yields_no_links() {
        let body = "<html><body><a href=\"/b\">b</a>too short</body></html>";
        let resp = html_response("http://a.ics.uci.edu/a", body);
        assert!(extract_next_links("http://a.ics.uci.edu/a", Some(&resp), None).is_empty());
    }
}
