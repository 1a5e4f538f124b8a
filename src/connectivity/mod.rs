//! Connectivity monitoring.
//!
//! A [`ConnectivityMonitor`] fans path updates from a single underlying
//! [`PathMonitor`] out to any number of subscribers. The underlying monitor
//! is started at most once, on the first subscription; subscriptions are
//! cancellable tokens, so a consumer that goes away stops receiving updates
//! without affecting the others.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Reachability of the network path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The path is usable.
    Available,
    /// No usable path.
    Unavailable,
}

impl ConnectionState {
    /// Whether the path is usable.
    pub fn is_available(&self) -> bool {
        matches!(self, ConnectionState::Available)
    }
}

/// Handler invoked on each path update.
pub type PathUpdateHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Source of path updates.
///
/// `start` must be idempotent: a second call neither restarts the monitor
/// nor registers a second handler.
pub trait PathMonitor: Send + Sync {
    /// Starts monitoring, delivering updates to `handler`.
    fn start(&self, handler: PathUpdateHandler);

    /// Current reachability, best effort.
    fn is_reachable(&self) -> bool;
}

/// Default probe target. Port 53 answers on any network with working DNS.
const DEFAULT_PROBE_TARGET: &str = "1.1.1.1:53";
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Path monitor probing reachability with periodic TCP connects.
pub struct SystemPathMonitor {
    target: String,
    interval: Duration,
    started: AtomicBool,
    reachable: Arc<AtomicBool>,
}

impl SystemPathMonitor {
    /// Creates a monitor against the default probe target.
    pub fn new() -> Self {
        Self::with_target(DEFAULT_PROBE_TARGET, DEFAULT_PROBE_INTERVAL)
    }

    /// Creates a monitor probing `target` every `interval`.
    pub fn with_target(target: impl Into<String>, interval: Duration) -> Self {
        Self {
            target: target.into(),
            interval,
            started: AtomicBool::new(false),
            reachable: Arc::new(AtomicBool::new(false)),
        }
    }

    fn probe(target: &str) -> bool {
        let addrs: Vec<SocketAddr> = match target.to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(_) => return false,
        };
        addrs
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, PROBE_TIMEOUT).is_ok())
    }
}

impl Default for SystemPathMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PathMonitor for SystemPathMonitor {
    fn start(&self, handler: PathUpdateHandler) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("path monitor already started");
            return;
        }

        let target = self.target.clone();
        let interval = self.interval;
        let reachable = Arc::clone(&self.reachable);
        let spawned = thread::Builder::new()
            .name("classclap-path-monitor".into())
            .spawn(move || {
                let mut last: Option<bool> = None;
                loop {
                    let up = Self::probe(&target);
                    reachable.store(up, Ordering::SeqCst);
                    // The first probe always reports; afterwards only
                    // transitions do.
                    if last != Some(up) {
                        last = Some(up);
                        let state = if up {
                            ConnectionState::Available
                        } else {
                            ConnectionState::Unavailable
                        };
                        debug!(?state, "path update");
                        handler(state);
                    }
                    thread::sleep(interval);
                }
            });
        if spawned.is_err() {
            warn!("failed to spawn path monitor thread");
            self.started.store(false, Ordering::SeqCst);
        }
    }

    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

/// One-shot reachability check against the default probe target, without
/// subscribing. Blocks for up to the probe timeout.
pub fn is_reachable() -> bool {
    SystemPathMonitor::probe(DEFAULT_PROBE_TARGET)
}

type SubscriberHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

struct Inner {
    source: Arc<dyn PathMonitor>,
    handlers: Mutex<Vec<(u64, SubscriberHandler)>>,
    started: AtomicBool,
    next_id: AtomicU64,
}

impl Inner {
    fn notify(&self, state: ConnectionState) {
        // Snapshot under the lock, invoke outside it: a handler may
        // subscribe or cancel without deadlocking.
        let snapshot: Vec<SubscriberHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in snapshot {
            handler(state);
        }
    }

    fn remove(&self, id: u64) {
        self.handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|(handler_id, _)| *handler_id != id);
    }
}

/// Fan-out over a single path monitor.
///
/// Subscribers are notified in subscription order on every path update.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// Creates a monitor over the system path monitor.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemPathMonitor::new()))
    }

    /// Creates a monitor over a custom path source.
    pub fn new(source: Arc<dyn PathMonitor>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                handlers: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribes to path updates.
    ///
    /// The first subscription starts the underlying monitor; later ones
    /// reuse it. Updates are delivered in subscription order. Dropping the
    /// returned [`Subscription`] does not cancel it; call
    /// [`Subscription::cancel`] to stop receiving updates.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((id, Arc::new(handler)));

        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let inner = Arc::clone(&self.inner);
            self.inner
                .source
                .start(Arc::new(move |state| inner.notify(state)));
        }

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Current reachability, best effort.
    pub fn is_reachable(&self) -> bool {
        self.inner.source.is_reachable()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("reachable", &self.is_reachable())
            .finish()
    }
}

/// Token for one connectivity subscription.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Cancels the subscription. Further updates skip its handler;
    /// cancelling twice is harmless.
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove(self.id);
        }
    }
}
