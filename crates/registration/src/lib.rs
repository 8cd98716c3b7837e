//! Handshake with the course registration service: identify this crawler by
//! its user agent and receive a cache-proxy endpoint in return. A drastic
//! simplification of the original's dataframe-sync handshake down to one
//! HTTP round trip, since the core only needs the final `(host, port)`.

use crawler_core::CrawlError;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize, Default)]
struct RegistrationResponse {
    cache_server: Option<(String, u16)>,
    #[serde(default)]
    invalid: bool,
}

/// Contacts the registration service and returns the cache-proxy endpoint.
/// `fresh` should be true when `--restart` was passed or no save file exists
/// yet, matching the server's fresh-vs-resume distinction.
///
/// A `CrawlError::Rejected` return means the server rejected this user agent
/// outright — per the unrecoverable-startup policy, callers must abort
/// rather than fall back. Every other variant means the service could not be
/// reached or replied with garbage, which callers may treat as recoverable.
pub async fn register(
    registration_host: &str,
    registration_port: u16,
    user_agent: &str,
    fresh: bool,
) -> Result<(String, u16), CrawlError> {
    let url = format!("http://{registration_host}:{registration_port}/");
    let client = reqwest::Client::new();

    let http_response = client
        .get(&url)
        .query(&[
            ("crawler_id", user_agent),
            ("fresh", if fresh { "1" } else { "0" }),
        ])
        .send()
        .await
        .map_err(|e| CrawlError::Network(e.to_string()))?;

    let response: RegistrationResponse = http_response
        .json()
        .await
        .map_err(|e| CrawlError::Parse(e.to_string()))?;

    let endpoint = resolve(response, user_agent)?;
    info!(host = %endpoint.0, port = endpoint.1, "registered with cache proxy");
    Ok(endpoint)
}

/// The pure decision over a parsed response: reject, or hand back an
/// endpoint. Split out so it's testable without a live server.
fn resolve(response: RegistrationResponse, user_agent: &str) -> Result<(String, u16), CrawlError> {
    if response.invalid {
        return Err(CrawlError::Rejected(user_agent.to_string()));
    }
    response.cache_server.ok_or_else(|| {
        CrawlError::Parse("registration response missing cache_server assignment".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_response_deserializes() {
        let raw = r#"{"invalid": true}"#;
        let parsed: RegistrationResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.invalid);
        assert!(parsed.cache_server.is_none());
    }

    #[test]
    fn accepted_response_deserializes() {
        let raw = r#"{"cache_server": ["cache.ics.uci.edu", 9000]}"#;
        let parsed: RegistrationResponse = serde_json::from_str(raw).unwrap();
        assert!(!parsed.invalid);
        assert_eq!(
            parsed.cache_server,
            Some(("cache.ics.uci.edu".to_string(), 9000))
        );
    }

    #[test]
    fn resolve_rejects_invalid_user_agent() {
        let response = RegistrationResponse {
            cache_server: None,
            invalid: true,
        };
        let err = resolve(response, "bad_agent").unwrap_err();
        assert!(matches!(err, CrawlError::Rejected(agent) if agent == "bad_agent"));
    }

    #[test]
    fn resolve_returns_endpoint_for_accepted_response() {
        let response = RegistrationResponse {
            cache_server: Some(("cache.ics.uci.edu".to_string(), 9000)),
            invalid: false,
        };
        let endpoint = resolve(response, "ir_project_crawler").unwrap();
        assert_eq!(endpoint, ("cache.ics.uci.edu".to_string(), 9000));
    }

    #[test]
    fn resolve_errors_on_missing_cache_server() {
        let response = RegistrationResponse {
            cache_server: None,
            invalid: false,
        };
        let err = resolve(response, "ir_project_crawler").unwrap_err();
        assert!(matches!(err, CrawlError::Parse(_)));
    }
}
