//! HTTP seam between the dispatcher and the push service.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::protocol::PushResponse;
use common::PushError;
use thiserror::Error;

/// A fully prepared push request: nothing left to encrypt or sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Request headers in send order.
    pub headers: Vec<(String, String)>,
    /// `aes128gcm` body.
    pub body: Bytes,
}

impl PushRequest {
    /// First header value named `name` (ASCII case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Errors raised when no usable response came back.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),

    /// Connection, timeout, or body read failure.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<TransportError> for PushError {
    fn from(e: TransportError) -> Self {
        PushError::Transport {
            status: None,
            body: e.to_string(),
        }
    }
}

/// Sends one prepared request and reports whatever the push service answered.
///
/// Implementations return `Ok` for every HTTP response, including non-2xx;
/// classifying the status is the dispatcher's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn post(&self, request: PushRequest) -> Result<PushResponse, TransportError>;
}

/// [`PushTransport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the TLS backend fails to initialise.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Reuse an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PushTransport for HttpTransport {
    async fn post(&self, request: PushRequest) -> Result<PushResponse, TransportError> {
        let mut builder = self.client.post(&request.endpoint);
        for (name, value) in &request.headers {
            // The client derives Content-Length from the body itself.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_owned(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(PushResponse {
            status,
            headers,
            body,
        })
    }
}
