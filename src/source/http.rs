//! HTTP access for remote dumps
//!
//! The pipeline only needs "a readable body for this URL, or an error if the
//! server said no". [`HttpClient`] is that seam; [`ReqwestClient`] is the
//! blocking reqwest implementation used by default.

use crate::error::StreamError;
use reqwest::blocking::Client;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Default user agent; Wikimedia asks automated clients to identify themselves
pub const DEFAULT_USER_AGENT: &str = concat!(
    "pvcreek/",
    env!("CARGO_PKG_VERSION"),
    " (pageview dump streamer)"
);

/// Opens a streaming body for a URL.
///
/// Implementations must check the response status before returning: a
/// non-success status is `StreamError::Fetch` and no body bytes are handed out.
pub trait HttpClient: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, StreamError>;
}

/// Settings for [`ReqwestClient`]
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    /// Applies to establishing the connection only. Body reads block for as
    /// long as the server keeps the connection open.
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Blocking reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, StreamError> {
        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .connect_timeout(settings.connect_timeout)
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, StreamError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(
            "{} responded {} ({} bytes advertised)",
            url,
            status,
            response
                .content_length()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        Ok(Box::new(response))
    }
}
