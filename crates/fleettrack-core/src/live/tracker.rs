//! Live session lifecycle
//!
//! The tracker never mutates vehicles from its own tasks. The watch forwarder
//! and the heartbeat timer only post [`FleetEvent`]s tagged with the session
//! id; the store owner hands them back through `handle_*`, where anything from
//! a stopped or replaced session is dropped.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{GeoError, TrackingError};
use super::provider::{GeolocationProvider, PositionFix};
use super::session::{LiveSession, SessionMarker};
use crate::broadcast::{UpdateSource, VehicleUpdate};
use crate::config::TrackingConfig;
use crate::fleet::VehicleId;
use crate::runtime::FleetEvent;
use crate::store::{keys, EntityStore, StoreError};

struct ActiveSession {
    session: LiveSession,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveSession {
    fn shutdown(self) -> LiveSession {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
        self.session
    }
}

/// Drives at most one live session
pub struct LiveTracker {
    provider: Arc<dyn GeolocationProvider>,
    config: TrackingConfig,
    inbox: mpsc::UnboundedSender<FleetEvent>,
    active: Option<ActiveSession>,
}

impl LiveTracker {
    /// Create an idle tracker posting its events to `inbox`
    pub fn new(
        provider: Arc<dyn GeolocationProvider>,
        config: TrackingConfig,
        inbox: mpsc::UnboundedSender<FleetEvent>,
    ) -> Self {
        Self {
            provider,
            config,
            inbox,
            active: None,
        }
    }

    /// The running session, if any
    pub fn session(&self) -> Option<&LiveSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Whether a session is running
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn is_current(&self, session: Uuid) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.session.id == session)
    }

    /// Start tracking `vehicle_id`.
    ///
    /// Waits for one fix, bounded by the initial-fix timeout. On any failure
    /// nothing changes, including a session that was already running; on
    /// success that session is stopped and replaced. Must run inside a Tokio
    /// runtime.
    pub async fn start(
        &mut self,
        store: &mut EntityStore,
        vehicle_id: VehicleId,
    ) -> Result<VehicleUpdate, TrackingError> {
        let route = store
            .vehicle(vehicle_id)
            .map(|v| v.route.clone())
            .ok_or(TrackingError::UnknownVehicle(vehicle_id))?;

        tracing::debug!(vehicle_id, "requesting initial location fix");
        let fix = self.first_fix().await.map_err(|e| {
            tracing::warn!(vehicle_id, "live tracking not started: {e}");
            e
        })?;

        let now = Utc::now();
        let mut session = LiveSession::new(vehicle_id, route, now);
        session.record(fix.position, now);

        store.write_json(keys::LIVE_SESSION, &session.marker())?;
        if let Some(previous) = self.active.take().map(ActiveSession::shutdown) {
            tracing::info!(
                vehicle_id = previous.vehicle_id,
                session = %previous.id,
                "live tracking replaced"
            );
        }

        let vehicle = store
            .apply_live_fix(vehicle_id, fix.position, now)
            .ok_or(TrackingError::UnknownVehicle(vehicle_id))?;
        let update = vehicle.snapshot(UpdateSource::SessionChange);

        tracing::info!(vehicle_id, session = %session.id, "live tracking started");
        self.launch(session);
        Ok(update)
    }

    async fn first_fix(&self) -> Result<PositionFix, GeoError> {
        let request = self.provider.request_fix();
        match tokio::time::timeout(self.config.initial_fix_timeout(), request).await {
            Err(_) => Err(GeoError::Timeout),
            Ok(Err(_)) => Err(GeoError::PositionUnavailable),
            Ok(Ok(Ok(fix))) if !fix.position.is_valid() => {
                tracing::warn!(position = %fix.position, "device reported an impossible position");
                Err(GeoError::PositionUnavailable)
            }
            Ok(Ok(result)) => result,
        }
    }

    /// End the running session.
    ///
    /// Cancels the watch and heartbeat, clears the live flag and deletes the
    /// marker. Safe to call when nothing is running; returns the update for
    /// the vehicle that stopped being live. If the marker cannot be deleted
    /// the session keeps running.
    pub fn stop(&mut self, store: &mut EntityStore) -> Result<Option<VehicleUpdate>, TrackingError> {
        store.remove_key(keys::LIVE_SESSION)?;
        let session = self.active.take().map(ActiveSession::shutdown);
        let cleared = store.clear_live();

        if let Some(session) = &session {
            tracing::info!(
                vehicle_id = session.vehicle_id,
                session = %session.id,
                "live tracking stopped"
            );
        }

        let vehicle_id = session.map(|s| s.vehicle_id).or(cleared);
        Ok(vehicle_id
            .and_then(|id| store.vehicle(id))
            .map(|v| v.snapshot(UpdateSource::SessionChange)))
    }

    /// Pick up a session persisted before a restart.
    ///
    /// Opens the watch and heartbeat directly, without the initial request.
    /// The vehicle becomes live on the first fix. A marker for an unknown bus
    /// or one that cannot be read is discarded. Must run inside a Tokio
    /// runtime.
    pub fn resume(&mut self, store: &mut EntityStore) -> Result<Option<LiveSession>, TrackingError> {
        if self.active.is_some() {
            tracing::debug!("resume skipped, a session is already running");
            return Ok(None);
        }

        let marker = match store.read_json::<SessionMarker>(keys::LIVE_SESSION) {
            Ok(Some(marker)) => marker,
            Ok(None) => return Ok(None),
            Err(StoreError::Serialization(e)) => {
                tracing::warn!("discarding unreadable live-session marker: {e}");
                store.remove_key(keys::LIVE_SESSION)?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if store.vehicle(marker.vehicle_id).is_none() {
            tracing::warn!(vehicle_id = marker.vehicle_id, "discarding marker for unknown bus");
            store.remove_key(keys::LIVE_SESSION)?;
            return Ok(None);
        }

        let session = LiveSession::from_marker(marker);
        tracing::info!(
            vehicle_id = session.vehicle_id,
            session = %session.id,
            "resuming live tracking"
        );
        self.launch(session.clone());
        Ok(Some(session))
    }

    fn launch(&mut self, session: LiveSession) {
        let cancel = CancellationToken::new();
        let watch = tokio::spawn(forward_watch(
            self.provider.watch(),
            session.id,
            self.inbox.clone(),
            cancel.clone(),
            self.config.watch_timeout(),
        ));
        let heartbeat = tokio::spawn(heartbeat(
            session.id,
            self.inbox.clone(),
            cancel.clone(),
            self.config.heartbeat_interval(),
        ));

        self.active = Some(ActiveSession {
            session,
            cancel,
            tasks: vec![watch, heartbeat],
        });
    }

    /// Apply a watch fix from `session`. Stale sessions are ignored.
    pub fn handle_fix(
        &mut self,
        store: &mut EntityStore,
        session: Uuid,
        fix: PositionFix,
    ) -> Option<VehicleUpdate> {
        if !self.is_current(session) {
            tracing::trace!(%session, "dropping fix from stale session");
            return None;
        }
        if !fix.position.is_valid() {
            tracing::warn!(%session, position = %fix.position, "ignoring impossible position");
            return None;
        }
        let active = self.active.as_mut()?;

        let now = Utc::now();
        let vehicle = store.apply_live_fix(active.session.vehicle_id, fix.position, now)?;
        active.session.record(fix.position, now);
        tracing::trace!(vehicle_id = vehicle.id, position = %fix.position, "live fix applied");
        Some(vehicle.snapshot(UpdateSource::LiveFix))
    }

    /// Re-broadcast the live vehicle. Nothing is sent before the first fix.
    pub fn handle_heartbeat(&self, store: &EntityStore, session: Uuid) -> Option<VehicleUpdate> {
        if !self.is_current(session) {
            tracing::trace!(%session, "dropping heartbeat from stale session");
            return None;
        }
        let active = self.active.as_ref()?;
        if !active.session.has_fix() {
            return None;
        }
        store
            .vehicle(active.session.vehicle_id)
            .map(|v| v.snapshot(UpdateSource::Heartbeat))
    }

    /// The platform ended the watch.
    ///
    /// A resumed session that never got a fix is abandoned quietly and its
    /// marker is left in place. Otherwise the heartbeat keeps the last
    /// position on display until `stop`.
    pub fn handle_watch_closed(&mut self, session: Uuid) {
        if !self.is_current(session) {
            return;
        }
        let Some(active) = self.active.take() else {
            return;
        };

        if active.session.has_fix() {
            tracing::warn!(
                vehicle_id = active.session.vehicle_id,
                "location watch closed, holding last position"
            );
            self.active = Some(active);
        } else {
            let session = active.shutdown();
            tracing::debug!(
                vehicle_id = session.vehicle_id,
                "resumed session got no location, abandoning"
            );
        }
    }
}

impl Drop for LiveTracker {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.shutdown();
        }
    }
}

async fn forward_watch(
    mut rx: mpsc::Receiver<Result<PositionFix, GeoError>>,
    session: Uuid,
    inbox: mpsc::UnboundedSender<FleetEvent>,
    cancel: CancellationToken,
    watch_timeout: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = tokio::time::timeout(watch_timeout, rx.recv()) => match next {
                Err(_) => tracing::warn!(%session, "no location update within {watch_timeout:?}"),
                Ok(Some(Ok(fix))) => {
                    if inbox.send(FleetEvent::LiveFix { session, fix }).is_err() {
                        break;
                    }
                }
                Ok(Some(Err(e))) => tracing::warn!(%session, "location watch error: {e}"),
                Ok(None) => {
                    let _ = inbox.send(FleetEvent::WatchClosed { session });
                    break;
                }
            },
        }
    }
}

async fn heartbeat(
    session: Uuid,
    inbox: mpsc::UnboundedSender<FleetEvent>,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if inbox.send(FleetEvent::Heartbeat { session }).is_err() {
                    break;
                }
            }
        }
    }
}
