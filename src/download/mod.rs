//! Download coordination.
//!
//! A download buffers the response body chunk by chunk, reporting
//! fractional progress against the declared content length, and resolves
//! exactly once with either the full accumulated buffer or an error. Any
//! number of transfers may be in flight at once; the active-transfer set is
//! a single mutexed map keyed by transfer id.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;
use uuid::Uuid;

use crate::dispatch::CallbackContext;
use crate::errors::NetworkResult;
use crate::request::RequestDescriptor;
use crate::status::HttpStatus;
use crate::transport::HttpTransport;

/// Progress callback, invoked with a fraction in `[0, 1]`.
pub type ProgressHandler = Arc<dyn Fn(f64) + Send + Sync>;

/// State for one in-flight transfer.
struct Transfer {
    buffer: BytesMut,
    expected: Option<u64>,
}

impl Transfer {
    fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            expected: None,
        }
    }
}

/// Coordinates download-style transfers.
///
/// Completion and progress callbacks are delivered on the callback context.
/// A transfer that is cancelled through its [`DownloadHandle`] stops
/// buffering at the next chunk and receives no further callbacks.
pub struct DownloadCoordinator {
    transport: Arc<dyn HttpTransport>,
    callbacks: CallbackContext,
    transfers: Mutex<HashMap<Uuid, Transfer>>,
}

/// Handle to an in-flight download.
#[derive(Debug, Clone)]
pub struct DownloadHandle {
    id: Uuid,
    coordinator: Weak<DownloadCoordinator>,
}

impl DownloadHandle {
    /// The transfer id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancels the transfer.
    ///
    /// The transfer is removed from the active set; intake stops at the next
    /// chunk and neither progress nor completion fires afterwards.
    pub fn cancel(&self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.transfers().remove(&self.id);
        }
    }
}

impl DownloadCoordinator {
    /// Creates a coordinator over the given transport and callback context.
    pub fn new(transport: Arc<dyn HttpTransport>, callbacks: CallbackContext) -> Self {
        Self {
            transport,
            callbacks,
            transfers: Mutex::new(HashMap::new()),
        }
    }

    fn transfers(&self) -> MutexGuard<'_, HashMap<Uuid, Transfer>> {
        self.transfers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of transfers currently in flight.
    pub fn active_transfers(&self) -> usize {
        self.transfers().len()
    }

    /// Begins a download, delivering progress and completion callbacks on
    /// the callback context.
    ///
    /// Must be called within a Tokio runtime. Exactly one completion is
    /// delivered per transfer, on success or error, unless the transfer is
    /// cancelled first.
    pub fn begin<P, C>(
        self: &Arc<Self>,
        descriptor: RequestDescriptor,
        progress: P,
        completion: C,
    ) -> DownloadHandle
    where
        P: Fn(f64) + Send + Sync + 'static,
        C: FnOnce(NetworkResult<Bytes>) + Send + 'static,
    {
        let id = Uuid::new_v4();
        self.transfers().insert(id, Transfer::new());

        let coordinator = Arc::clone(self);
        let progress: ProgressHandler = Arc::new(progress);
        tokio::spawn(async move {
            coordinator.run(id, descriptor, progress, completion).await;
        });

        DownloadHandle {
            id,
            coordinator: Arc::downgrade(self),
        }
    }

    /// Downloads and resolves to the full accumulated buffer.
    ///
    /// Progress callbacks are still delivered on the callback context while
    /// the returned future is pending. Dropping the future before it
    /// resolves cancels the transfer.
    pub async fn download<P>(
        self: &Arc<Self>,
        descriptor: RequestDescriptor,
        progress: P,
    ) -> NetworkResult<Bytes>
    where
        P: Fn(f64) + Send + Sync + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = self.begin(descriptor, progress, move |result| {
            let _ = tx.send(result);
        });
        let mut guard = CancelGuard {
            handle,
            armed: true,
        };
        match rx.await {
            Ok(result) => {
                guard.armed = false;
                result
            }
            // The completion sender is only dropped if the transfer was
            // cancelled out from under the await.
            Err(_) => {
                guard.armed = false;
                guard.handle.cancel();
                Err(crate::errors::TransportError::InvalidResponse {
                    message: "download cancelled".into(),
                }
                .into())
            }
        }
    }

    async fn run<C>(
        self: Arc<Self>,
        id: Uuid,
        descriptor: RequestDescriptor,
        progress: ProgressHandler,
        completion: C,
    ) where
        C: FnOnce(NetworkResult<Bytes>) + Send + 'static,
    {
        let response = match self.transport.send_streaming(descriptor).await {
            Ok(response) => response,
            Err(e) => {
                self.finalize(id, Err(e.into()), completion);
                return;
            }
        };

        let status = HttpStatus::from_code(response.status);
        if !status.is_success() {
            self.finalize(
                id,
                Err(crate::errors::NetworkError::DownloadServerSide { status }),
                completion,
            );
            return;
        }

        // Headers received: record the expected total. An unrecognized
        // transfer id means the download was cancelled; intake stops here.
        {
            let mut transfers = self.transfers();
            match transfers.get_mut(&id) {
                Some(transfer) => transfer.expected = response.content_length,
                None => {
                    debug!(transfer = %id, "orphaned transfer, cancelling intake");
                    return;
                }
            }
        }

        let mut stream = response.stream;
        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.finalize(id, Err(e.into()), completion);
                    return;
                }
            };

            let fraction = {
                let mut transfers = self.transfers();
                let Some(transfer) = transfers.get_mut(&id) else {
                    // Cancelled mid-body.
                    return;
                };
                transfer.buffer.extend_from_slice(&bytes);
                match transfer.expected {
                    // Zero or unknown expected length: progress unreported.
                    Some(expected) if expected > 0 => {
                        Some((transfer.buffer.len() as f64 / expected as f64).min(1.0))
                    }
                    _ => None,
                }
            };

            if let Some(fraction) = fraction {
                let progress = Arc::clone(&progress);
                self.callbacks.post(move || progress(fraction));
            }
        }

        if let Some(transfer) = self.transfers().remove(&id) {
            let result = Ok(transfer.buffer.freeze());
            self.callbacks.post(move || completion(result));
        }
    }

    /// Removes the transfer and delivers the completion, exactly once. A
    /// transfer already removed (cancelled) receives nothing.
    fn finalize<C>(&self, id: Uuid, result: NetworkResult<Bytes>, completion: C)
    where
        C: FnOnce(NetworkResult<Bytes>) + Send + 'static,
    {
        if self.transfers().remove(&id).is_some() {
            self.callbacks.post(move || completion(result));
        }
    }
}

/// Cancels the transfer if the awaiting future is dropped mid-download.
struct CancelGuard {
    handle: DownloadHandle,
    armed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.handle.cancel();
        }
    }
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("active_transfers", &self.active_transfers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NetworkError;
    use crate::mocks::{MockResponse, MockTransport};
    use crate::request::{build, HttpMethod};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn coordinator(transport: MockTransport) -> Arc<DownloadCoordinator> {
        Arc::new(DownloadCoordinator::new(
            Arc::new(transport),
            CallbackContext::new(),
        ))
    }

    fn descriptor() -> RequestDescriptor {
        build(
            "https://files.example.com/archive.bin",
            HttpMethod::Get,
            Duration::from_secs(60),
            None,
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn accumulates_chunks_and_reports_progress() {
        let transport = MockTransport::new();
        transport.queue(
            MockResponse::bytes(b"abcdefghij".to_vec()).with_chunk_size(2),
        );
        let coordinator = coordinator(transport);

        let fractions = Arc::new(StdMutex::new(Vec::new()));
        let recorded = Arc::clone(&fractions);
        let bytes = coordinator
            .download(descriptor(), move |fraction| {
                recorded.lock().unwrap().push(fraction);
            })
            .await
            .unwrap();

        assert_eq!(&bytes[..], b"abcdefghij");
        // Progress callbacks may still be in the dispatch queue right after
        // completion resolves; wait for the last one.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let seen = fractions.lock().unwrap().clone();
            if seen.last() == Some(&1.0) {
                assert_eq!(seen, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
                break;
            }
            assert!(std::time::Instant::now() < deadline, "progress never completed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(coordinator.active_transfers(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_length_reports_no_progress() {
        let transport = MockTransport::new();
        transport.queue(
            MockResponse::bytes(b"abcdef".to_vec())
                .with_chunk_size(3)
                .without_content_length(),
        );
        let coordinator = coordinator(transport);

        let fractions = Arc::new(StdMutex::new(Vec::new()));
        let recorded = Arc::clone(&fractions);
        let bytes = coordinator
            .download(descriptor(), move |fraction| {
                recorded.lock().unwrap().push(fraction);
            })
            .await
            .unwrap();

        assert_eq!(&bytes[..], b"abcdef");
        assert!(fractions.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_success_status_is_download_server_side_error() {
        let transport = MockTransport::new();
        transport.queue(MockResponse::bytes(b"gone".to_vec()).with_status(500));
        let coordinator = coordinator(transport);

        let error = coordinator
            .download(descriptor(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            NetworkError::DownloadServerSide {
                status: HttpStatus::InternalServerError
            }
        ));
        assert_eq!(coordinator.active_transfers(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_transfer_receives_no_completion() {
        let transport = MockTransport::new();
        transport.queue(
            MockResponse::bytes(vec![0u8; 64])
                .with_chunk_size(8)
                .with_chunk_delay(Duration::from_millis(20)),
        );
        let coordinator = coordinator(transport);

        let completed = Arc::new(StdMutex::new(false));
        let flag = Arc::clone(&completed);
        let handle = coordinator.begin(descriptor(), |_| {}, move |_| {
            *flag.lock().unwrap() = true;
        });
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!*completed.lock().unwrap());
        assert_eq!(coordinator.active_transfers(), 0);
    }
}
