//! Test doubles for the transport layer.
//!
//! [`MockTransport`] replays queued [`MockResponse`]s in order and records
//! every request it receives, so dispatch and download behavior can be
//! tested without a server. Available in unit tests and behind the `mocks`
//! feature for downstream test suites.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::TransportError;
use crate::request::RequestDescriptor;
use crate::transport::{HttpTransport, StreamingResponse, TransportResponse};

/// A canned transport response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    chunk_size: Option<usize>,
    chunk_delay: Option<Duration>,
    declare_content_length: bool,
}

impl MockResponse {
    /// A 200 response with the given body bytes.
    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
            chunk_size: None,
            chunk_delay: None,
            declare_content_length: true,
        }
    }

    /// A 200 response whose body is the compact JSON encoding of `value`.
    pub fn json<T: Serialize>(value: &T) -> Self {
        let body = serde_json::to_vec(value).expect("mock response body must serialize");
        let mut response = Self::bytes(body);
        response
            .headers
            .insert("Content-Type".into(), "application/json".into());
        response
    }

    /// Overrides the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Splits the streamed body into chunks of at most `size` bytes.
    /// Without this the body streams as a single chunk.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Delays each streamed chunk, simulating a slow transfer.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Streams without declaring a content length.
    pub fn without_content_length(mut self) -> Self {
        self.declare_content_length = false;
        self
    }
}

#[derive(Default)]
struct MockState {
    queue: VecDeque<MockResponse>,
    recorded: Vec<RequestDescriptor>,
}

/// Transport double replaying queued responses.
///
/// Cloned handles share the same queue and request log.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// A second handle to the same queue and request log.
    pub fn clone_handle(&self) -> Self {
        self.clone()
    }

    /// Queues a response. Responses replay in queue order.
    pub fn queue(&self, response: MockResponse) {
        self.state.lock().unwrap().queue.push_back(response);
    }

    /// Every request received so far, in arrival order.
    pub fn recorded_requests(&self) -> Vec<RequestDescriptor> {
        self.state.lock().unwrap().recorded.clone()
    }

    fn next(&self, request: RequestDescriptor) -> Result<MockResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.recorded.push(request);
        state
            .queue
            .pop_front()
            .ok_or_else(|| TransportError::InvalidResponse {
                message: "no mock response queued".into(),
            })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("MockTransport")
            .field("queued", &state.queue.len())
            .field("recorded", &state.recorded.len())
            .finish()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let response = self.next(request)?;
        Ok(TransportResponse {
            status: response.status,
            headers: response.headers,
            body: Bytes::from(response.body),
        })
    }

    async fn send_streaming(
        &self,
        request: RequestDescriptor,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.next(request)?;
        let content_length = response
            .declare_content_length
            .then(|| response.body.len() as u64);

        let chunk_size = response.chunk_size.unwrap_or(response.body.len().max(1));
        let chunks: Vec<Bytes> = response
            .body
            .chunks(chunk_size)
            .map(Bytes::copy_from_slice)
            .collect();
        let delay = response.chunk_delay;
        let stream = futures::stream::iter(chunks)
            .then(move |chunk| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed();

        Ok(StreamingResponse {
            status: response.status,
            content_length,
            stream,
        })
    }
}
