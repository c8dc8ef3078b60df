// src/fetch.rs

use crate::error::{DiscoveryError, NilaIdpError};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default bound on a single discovery or JWKS request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches JSON documents over HTTP GET.
///
/// Implementations must report connection-level failures as
/// [`NilaIdpError::Transport`] or [`NilaIdpError::Timeout`], and responses that
/// are not a successful JSON document as a [`DiscoveryError`].
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, NilaIdpError>;
}

/// A [`JsonFetcher`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, NilaIdpError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NilaIdpError::InvalidConfiguration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http_client, timeout })
    }

    /// Wraps an existing client, for callers that share connection pools.
    pub fn with_client(http_client: reqwest::Client, timeout: Duration) -> Self {
        Self { http_client, timeout }
    }

    fn transport_error(&self, url: &Url, err: reqwest::Error) -> NilaIdpError {
        if err.is_timeout() {
            NilaIdpError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            NilaIdpError::Transport {
                url: url.to_string(),
                source: Arc::new(err),
            }
        }
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, NilaIdpError> {
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        response.json().await.map_err(|e| {
            if e.is_decode() {
                DiscoveryError::MalformedDocument {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
                .into()
            } else {
                self.transport_error(url, e)
            }
        })
    }
}
