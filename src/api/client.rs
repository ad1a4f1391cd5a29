use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_DISPOSITION, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::models::{ImportConfig, ResponseHead, TransportResponse};
use crate::domain::{AuthMethod, Credential};
use crate::utils::parse_content_disposition;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("request to {url} failed with HTTP {status}")]
    Status { status: u16, url: String },

    #[error("{host} requires {method} authentication")]
    Unauthorized { host: String, method: AuthMethod },

    /// The body stream broke off after the headers arrived.
    #[error("transfer interrupted: {0}")]
    Interrupted(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Where downloads come from. `HttpClient` is the real one; tests script
/// their own to cut a body short.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns once headers arrive. Non-success
    /// statuses are errors.
    async fn open(&self, url: &Url, credential: Option<&Credential>) -> Result<TransportResponse>;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &ImportConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    fn request(&self, url: &Url, credential: Option<&Credential>) -> RequestBuilder {
        let request = self.client.get(url.clone());
        match credential {
            Some(credential) if !credential.user.is_empty() || !credential.secret.is_empty() => {
                request.basic_auth(&credential.user, Some(&credential.secret))
            }
            _ => request,
        }
    }

    /// Fetches only the status and headers of `url`, the way a browser sees
    /// them before deciding to render. Any status is returned as-is.
    pub async fn probe(&self, url: &Url, credential: Option<&Credential>) -> Result<ResponseHead> {
        let response = self.request(url, credential).send().await?;
        let head = ResponseHead {
            url: response.url().clone(),
            status: response.status().as_u16(),
            headers: response.headers().clone(),
        };
        debug!(url = %head.url, status = head.status, "probed navigation target");
        Ok(head)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn open(&self, url: &Url, credential: Option<&Credential>) -> Result<TransportResponse> {
        let response = self.request(url, credential).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let header = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok());
            return Err(ApiError::Unauthorized {
                host: url.host_str().unwrap_or_default().to_string(),
                method: AuthMethod::from_www_authenticate(header),
            });
        }

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let suggested_filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition);

        Ok(TransportResponse {
            status: status.as_u16(),
            content_length: response.content_length(),
            suggested_filename,
            body: response
                .bytes_stream()
                .map_err(|e| ApiError::Interrupted(e.to_string()))
                .boxed(),
        })
    }
}
