//! Callback delivery context.
//!
//! Completion and progress callbacks are delivered on one dedicated
//! dispatch thread, in posting order, regardless of which worker performed
//! the I/O. This mirrors the main-queue delivery guarantee UI-bound
//! consumers rely on: two callbacks never run concurrently and never
//! reorder.

use std::sync::mpsc::{channel, Sender};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A handle to the callback dispatch thread.
///
/// Cloning is cheap and all clones share the same thread. The thread exits
/// once every handle has been dropped and the queue has drained.
#[derive(Clone)]
pub struct CallbackContext {
    tx: Sender<Job>,
}

impl CallbackContext {
    /// Creates a context with its own dispatch thread.
    pub fn new() -> Self {
        let (tx, rx) = channel::<Job>();
        thread::Builder::new()
            .name("classclap-callbacks".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .expect("failed to spawn callback dispatch thread");
        Self { tx }
    }

    /// Posts a job to run on the dispatch thread.
    ///
    /// Jobs run one at a time in FIFO order. Posting never blocks.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        // Send only fails when the dispatch thread is gone, which means the
        // process is tearing down; the job is dropped in that case.
        let _ = self.tx.send(Box::new(job));
    }
}

impl Default for CallbackContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackContext").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn jobs_run_in_posting_order() {
        let context = CallbackContext::new();
        let (tx, rx) = mpsc::channel();
        for i in 0..100 {
            let tx = tx.clone();
            context.post(move || {
                tx.send(i).unwrap();
            });
        }
        let received: Vec<i32> = rx.iter().take(100).collect();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn clones_share_one_dispatch_thread() {
        let context = CallbackContext::new();
        let clone = context.clone();
        let (tx, rx) = mpsc::channel();

        let tx_a = tx.clone();
        context.post(move || {
            tx_a.send(thread::current().id()).unwrap();
        });
        let tx_b = tx;
        clone.post(move || {
            tx_b.send(thread::current().id()).unwrap();
        });

        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(first, second);
    }
}
