use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::HeaderMap;
use url::Url;

use super::client::Result;

/// Status line and headers of a navigation probe, body discarded.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
}

/// An opened download: headers are known, body not yet read.
pub struct TransportResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    /// Filename from `Content-Disposition`, unsanitized.
    pub suggested_filename: Option<String>,
    pub body: BoxStream<'static, Result<Bytes>>,
}

/// Configuration for the import session and its HTTP client
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Directory downloads are written into.
    pub download_dir: PathBuf,
    /// JSON file holding the persisted home page.
    pub settings_path: PathBuf,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        let download_dir = dirs::document_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let settings_path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("web-import")
            .join("settings.json");

        Self {
            download_dir,
            settings_path,
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("web-import/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
