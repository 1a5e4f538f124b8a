//! Async HTTP convenience client for application backends.
//!
//! This crate wraps an HTTP transport with the small set of conveniences a
//! mobile or desktop application layer actually needs: GET/POST/DELETE
//! requests with optional bearer-token authorization, JSON parameter
//! encoding, typed JSON response decoding, buffered downloads with
//! fractional progress reporting, and a connectivity monitor with a
//! subscription registry.
//!
//! Every request resolves to exactly one [`NetworkResult`]: either the raw
//! response bytes (or a decoded value) on HTTP 200, or a classified
//! [`NetworkError`]. There is no retry policy; each request makes a single
//! attempt with a fixed timeout, and retries are the caller's concern.
//!
//! # Example
//!
//! ```rust,no_run
//! use classclap_network::NetworkClient;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NetworkClient::with_defaults()?;
//!
//!     // Raw bytes
//!     let bytes = client
//!         .get("https://jsonplaceholder.typicode.com/posts/1/comments")
//!         .send()
//!         .await?;
//!
//!     // Typed decode
//!     let comments: Vec<Value> = client
//!         .get("https://jsonplaceholder.typicode.com/posts/1/comments")
//!         .object()
//!         .await?;
//!
//!     println!("{} bytes, {} comments", bytes.len(), comments.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connectivity;
pub mod dispatch;
pub mod download;
pub mod errors;
pub mod request;
pub mod status;
pub mod transport;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use client::{NetworkClient, NetworkClientBuilder, RequestBuilder};
pub use config::{NetworkConfig, NetworkConfigBuilder};
pub use connectivity::{ConnectionState, ConnectivityMonitor, PathMonitor, Subscription};
pub use download::{DownloadCoordinator, DownloadHandle};
pub use errors::{NetworkError, NetworkResult, TransportError};
pub use request::{Authorization, HttpMethod, Parameters, RequestDescriptor};
pub use status::{HttpStatus, StatusClass};
pub use transport::{HttpTransport, StreamingResponse, TransportResponse};

/// Commonly used types, importable with a single `use`.
pub mod prelude {
    pub use crate::client::{NetworkClient, NetworkClientBuilder, RequestBuilder};
    pub use crate::config::NetworkConfig;
    pub use crate::connectivity::{ConnectionState, ConnectivityMonitor};
    pub use crate::download::{DownloadCoordinator, DownloadHandle};
    pub use crate::errors::{NetworkError, NetworkResult};
    pub use crate::request::{Authorization, HttpMethod, Parameters};
    pub use crate::status::{HttpStatus, StatusClass};
}
