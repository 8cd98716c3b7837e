//! Single HTTP driver speaking to the course cache proxy. A deliberate
//! simplification of the overlay-network driver pattern (one `NetworkDriver`
//! per onion/i2p/zeronet/etc. network) down to the one network this crawler
//! actually needs: a plain HTTP cache server.

mod politeness;

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crawler_core::{CrawlError, RawResponse, Response};

pub use politeness::HostPoliteness;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Downloader {
    client: reqwest::Client,
    cache_server_host: String,
    cache_server_port: u16,
    user_agent: String,
    politeness: HostPoliteness,
}

impl Downloader {
    pub fn new(
        cache_server_host: String,
        cache_server_port: u16,
        user_agent: String,
        time_delay: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            cache_server_host,
            cache_server_port,
            user_agent,
            politeness: HostPoliteness::new(time_delay),
        })
    }

    /// Fetches `url` through the cache proxy. Returns `None` on any network
    /// error, timeout, or malformed proxy reply — a permanent give-up from
    /// the worker's point of view. A response that itself carries an error
    /// HTTP status is still `Some(Response)`; the content pipeline decides
    /// what to do with it.
    pub async fn download(&self, url: &str) -> Option<Response> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_string();
        self.politeness.wait_for_turn(&host).await;

        let proxy_url = format!("http://{}:{}/", self.cache_server_host, self.cache_server_port);
        let result = self
            .client
            .get(&proxy_url)
            .query(&[("q", url), ("u", self.user_agent.as_str())])
            .send()
            .await;

        let http_response = match result {
            Ok(r) => r,
            Err(e) => {
                let err = if e.is_timeout() {
                    CrawlError::Timeout(REQUEST_TIMEOUT.as_secs())
                } else {
                    CrawlError::Network(e.to_string())
                };
                warn!(url, error = %err, "download failed");
                return None;
            }
        };

        let status = http_response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in http_response.headers() {
            if let Ok(s) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), s.to_string());
            }
        }

        let body = match http_response.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => {
                let err = CrawlError::Network(e.to_string());
                warn!(url, error = %err, "failed to read response body");
                return None;
            }
        };

        Some(Response {
            url: url.to_string(),
            status,
            error: None,
            raw_response: Some(RawResponse {
                url: url.to_string(),
                content: body,
                headers,
            }),
        })
    }
}
