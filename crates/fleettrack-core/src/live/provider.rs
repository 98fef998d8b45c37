//! Device geolocation seam
//!
//! The platform offers a single-shot request and a continuous watch. Both are
//! modelled as channels so the tracker can bound them with tokio timers and
//! cancel a watch by dropping its receiver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

use super::error::GeoError;
use crate::geo::LatLng;

/// Buffered fixes per watch before new ones are dropped
const WATCH_BUFFER: usize = 16;

/// One reading from the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Reported coordinates
    pub position: LatLng,
    /// Accuracy radius in metres, when known
    pub accuracy: Option<f64>,
    /// When the device took the reading
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    /// A fix taken now with unknown accuracy
    pub fn now(position: LatLng) -> Self {
        Self {
            position,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }
}

/// Single-shot and continuous location primitives
pub trait GeolocationProvider: Send + Sync {
    /// Ask for one fix. A dropped sender means the platform gave up.
    fn request_fix(&self) -> oneshot::Receiver<Result<PositionFix, GeoError>>;

    /// Subscribe to continuous fixes. Dropping the receiver cancels the watch;
    /// the platform closing the sender ends it.
    fn watch(&self) -> mpsc::Receiver<Result<PositionFix, GeoError>>;
}

#[derive(Default)]
struct Inner {
    pending: Vec<oneshot::Sender<Result<PositionFix, GeoError>>>,
    watchers: Vec<mpsc::Sender<Result<PositionFix, GeoError>>>,
    revoked: bool,
}

/// Provider fed by hand, used as the bridge from a host platform's callbacks
/// (and by tests to script a device).
#[derive(Clone, Default)]
pub struct ChannelGeolocation {
    inner: Arc<Mutex<Inner>>,
}

impl ChannelGeolocation {
    /// Create a provider with permission granted
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every pending request and every open watch with `fix`.
    ///
    /// Returns how many receivers got it.
    pub fn deliver_fix(&self, fix: PositionFix) -> usize {
        self.deliver(Ok(fix))
    }

    /// Answer every pending request and every open watch with `error`
    pub fn deliver_error(&self, error: GeoError) -> usize {
        self.deliver(Err(error))
    }

    fn deliver(&self, result: Result<PositionFix, GeoError>) -> usize {
        let mut inner = self.lock();
        let mut delivered = 0;

        for tx in inner.pending.drain(..) {
            if tx.send(result).is_ok() {
                delivered += 1;
            }
        }

        inner.watchers.retain(|tx| !tx.is_closed());
        for tx in &inner.watchers {
            match tx.try_send(result) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("location watch backlog full, fix dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        delivered
    }

    /// Withdraw permission: pending requests fail with `PermissionDenied`,
    /// open watches close and new watches close immediately.
    pub fn revoke(&self) {
        let mut inner = self.lock();
        inner.revoked = true;
        for tx in inner.pending.drain(..) {
            let _ = tx.send(Err(GeoError::PermissionDenied));
        }
        inner.watchers.clear();
    }

    /// Restore permission after [`revoke`](Self::revoke)
    pub fn grant(&self) {
        self.lock().revoked = false;
    }

    /// Drop pending requests without answering them
    pub fn abandon_requests(&self) {
        self.lock().pending.clear();
    }

    /// Close every open watch from the platform side
    pub fn close_watches(&self) {
        self.lock().watchers.clear();
    }

    /// Watches whose receiver is still alive
    pub fn watcher_count(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|tx| !tx.is_closed());
        inner.watchers.len()
    }

    /// Requests still waiting for an answer
    pub fn pending_requests(&self) -> usize {
        let mut inner = self.lock();
        inner.pending.retain(|tx| !tx.is_closed());
        inner.pending.len()
    }
}

impl GeolocationProvider for ChannelGeolocation {
    fn request_fix(&self) -> oneshot::Receiver<Result<PositionFix, GeoError>> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.lock();
        if inner.revoked {
            let _ = tx.send(Err(GeoError::PermissionDenied));
        } else {
            inner.pending.push(tx);
        }
        rx
    }

    fn watch(&self) -> mpsc::Receiver<Result<PositionFix, GeoError>> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let mut inner = self.lock();
        if !inner.revoked {
            inner.watchers.push(tx);
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_answered_once() {
        let geo = ChannelGeolocation::new();
        let rx = geo.request_fix();
        assert_eq!(geo.pending_requests(), 1);

        let fix = PositionFix::now(LatLng::new(17.0, 82.0));
        assert_eq!(geo.deliver_fix(fix), 1);
        assert_eq!(rx.await.unwrap(), Ok(fix));
        assert_eq!(geo.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_revoked_provider_denies_and_closes() {
        let geo = ChannelGeolocation::new();
        let mut watch = geo.watch();
        geo.revoke();

        assert_eq!(geo.request_fix().await.unwrap(), Err(GeoError::PermissionDenied));
        assert!(watch.recv().await.is_none());
        assert!(geo.watch().recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_watch_is_pruned() {
        let geo = ChannelGeolocation::new();
        let watch = geo.watch();
        assert_eq!(geo.watcher_count(), 1);

        drop(watch);
        assert_eq!(geo.watcher_count(), 0);
        assert_eq!(geo.deliver_fix(PositionFix::now(LatLng::new(0.0, 0.0))), 0);
    }
}
