//! HTTP transport layer.
//!
//! Abstracts the underlying connection engine behind [`HttpTransport`] so the
//! dispatch and download paths can be exercised against mock transports. The
//! default implementation delegates to `reqwest`; connection management, TLS
//! and DNS are its concern, not this crate's.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::{Client, ClientBuilder, Method};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use tracing::instrument;

use crate::config::NetworkConfig;
use crate::errors::TransportError;
use crate::request::{HttpMethod, RequestDescriptor};

/// A fully buffered transport response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

/// Stream of body chunks for a download-style transfer.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A transport response whose body arrives as a chunk stream.
pub struct StreamingResponse {
    /// HTTP status code.
    pub status: u16,
    /// Expected body length, when the server declared one.
    pub content_length: Option<u64>,
    /// The body chunk stream.
    pub stream: ByteStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish()
    }
}

/// HTTP transport abstraction.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and buffers the full response.
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError>;

    /// Sends a request and returns the response body as a chunk stream.
    async fn send_streaming(
        &self,
        request: RequestDescriptor,
    ) -> Result<StreamingResponse, TransportError>;
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Transport implementation backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport from the client configuration.
    ///
    /// Per-request timeouts come from each [`RequestDescriptor`]; the
    /// underlying client only carries the connection timeout and user agent.
    pub fn new(config: &NetworkConfig) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Connection {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn prepare(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout { timeout }
        } else if error.is_connect() {
            TransportError::Connection {
                message: error.to_string(),
            }
        } else {
            TransportError::InvalidResponse {
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = request.method.as_str(), url = %request.url))]
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let timeout = request.timeout;
        let response = self
            .prepare(&request)
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    #[instrument(skip(self, request), fields(method = request.method.as_str(), url = %request.url))]
    async fn send_streaming(
        &self,
        request: RequestDescriptor,
    ) -> Result<StreamingResponse, TransportError> {
        let timeout = request.timeout;
        let response = self
            .prepare(&request)
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| Self::classify(e, timeout)))
            .boxed();

        Ok(StreamingResponse {
            status,
            content_length,
            stream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_conversion() {
        assert_eq!(Method::from(HttpMethod::Get), Method::GET);
        assert_eq!(Method::from(HttpMethod::Post), Method::POST);
        assert_eq!(Method::from(HttpMethod::Delete), Method::DELETE);
    }

    #[test]
    fn transport_builds_from_default_config() {
        let config = NetworkConfig::default();
        assert!(ReqwestTransport::new(&config).is_ok());
    }
}
