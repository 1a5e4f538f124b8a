//! Error types for the network client.
//!
//! Every failure a request can produce is classified into exactly one
//! [`NetworkError`] kind and delivered through the same result channel as
//! success. No kind is retried automatically; all are terminal for the
//! request attempt that produced them.

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

use crate::request::Parameters;
use crate::status::HttpStatus;

/// Result type alias for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Error taxonomy for the client.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The URL failed to parse or encode, at build or query-mutation time.
    #[error("bad URL: {url}")]
    BadUrl {
        /// The offending URL string.
        url: String,
    },

    /// The parameter set could not be serialized as a JSON request body.
    #[error("bad request: parameter set could not be serialized as JSON")]
    BadRequest {
        /// The parameter set that failed to serialize.
        parameters: Parameters,
    },

    /// The underlying connection failed, timed out, or yielded no
    /// recognizable HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response was received but its status code was not exactly 200.
    #[error("HTTP server-side error (status {status})")]
    HttpServerSide {
        /// The raw response body.
        body: Bytes,
        /// The classified status code.
        status: HttpStatus,
    },

    /// A success response body failed to decode into the requested type.
    #[error("JSON format error: {message}")]
    JsonFormat {
        /// Decoder error detail.
        message: String,
    },

    /// Download-specific analogue of [`NetworkError::HttpServerSide`].
    #[error("download server-side error (status {status})")]
    DownloadServerSide {
        /// The classified status code.
        status: HttpStatus,
    },

    /// The client configuration is invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
    },
}

impl NetworkError {
    /// Creates a bad-URL error.
    pub fn bad_url(url: impl Into<String>) -> Self {
        NetworkError::BadUrl { url: url.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        NetworkError::Configuration {
            message: message.into(),
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<HttpStatus> {
        match self {
            NetworkError::HttpServerSide { status, .. }
            | NetworkError::DownloadServerSide { status } => Some(*status),
            _ => None,
        }
    }
}

/// Transport-level error variants.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {message}")]
    Connection {
        /// Error detail from the transport.
        message: String,
    },

    /// The request did not complete within its timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that expired.
        timeout: Duration,
    },

    /// The response could not be read or was not recognizable as HTTP.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Error detail from the transport.
        message: String,
    },
}
