use url::Url;

/// Brings a raw URL to a unique string form: lowercased host, no fragment,
/// "/" for an empty path, one trailing slash stripped, query params sorted
/// by (key, value) with blank values preserved.
///
/// `canonicalize(canonicalize(x)) == canonicalize(x)` for every `x`.
pub fn canonicalize(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);

    let host = url.host_str()?.to_ascii_lowercase();
    url.set_host(Some(&host)).ok()?;

    let path = url.path();
    let normalized_path = if path.is_empty() {
        "/".to_string()
    } else if path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    };
    url.set_path(&normalized_path);

    if let Some(query) = url.query() {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if !query.is_empty() {
            pairs.sort();
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (k, v) in &pairs {
                serializer.append_pair(k, v);
            }
            url.set_query(Some(&serializer.finish()));
        }
    }

    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_host_and_strips_fragment() {
        let a = canonicalize("HTTP://A.ICS.UCI.EDU/path/?b=2&a=1#frag").unwrap();
        let b = canonicalize("http://a.ics.uci.edu/path?a=1&b=2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_path_becomes_root() {
        assert_eq!(
            canonicalize("http://a.ics.uci.edu").unwrap(),
            "http://a.ics.uci.edu/"
        );
    }

    #[test]
    fn idempotent() {
        let raw = "http://A.ics.uci.edu/a/b/?z=1&a=&m=2#x";
        let once = canonicalize(raw).unwrap();
        let twice = canonicalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(canonicalize("ftp://a.ics.uci.edu/").is_none());
        assert!(canonicalize("mailto:foo@bar.com").is_none());
    }

    #[test]
    fn preserves_blank_query_values() {
        let out = canonicalize("http://a.ics.uci.edu/p?b=&a=1").unwrap();
        assert_eq!(out, "http://a.ics.uci.edu/p?a=1&b=");
    }
}
