use std::collections::HashMap;

/// Raw bytes and headers as handed back by the cache proxy.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub content: Vec<u8>,
    /// Header names are lowercased on insertion so lookups are case-insensitive.
    pub headers: HashMap<String, String>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }
}

/// What the downloader hands back to a worker. `None` at the call site means
/// "give up permanently"; this type only exists once the proxy answered at all.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub error: Option<String>,
    pub raw_response: Option<RawResponse>,
}

/// A URL's lifecycle record as persisted by the discovery store.
#[derive(Debug, Clone)]
pub struct DiscoveryRecord {
    pub url: String,
    pub completed: bool,
}

/// Short digest of a canonical URL, used as the discovery store's primary key.
pub type UrlHash = u64;
