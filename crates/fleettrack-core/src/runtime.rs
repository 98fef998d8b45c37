//! Fleet runtime
//!
//! Single owner of the store and every component that writes to it. Timers
//! and the location watch never touch state directly; they post
//! [`FleetEvent`]s into one inbox and the owner applies them in order, one at
//! a time, then pushes the resulting updates to the display surfaces.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::broadcast::{
    DisplayBroadcaster, DisplaySurface, PublishReport, SurfaceHandle, UpdateSource, VehicleUpdate,
};
use crate::config::FleetConfig;
use crate::error::{FleetError, Result};
use crate::fleet::{matches_search, FleetFilter, Vehicle, VehicleId};
use crate::live::{GeolocationProvider, LiveSession, LiveTracker, PositionFix};
use crate::profile::UserProfile;
use crate::roster::{
    CancelOutcome, EditorState, RosterDraft, RosterEditor, RosterEntry, RosterId,
};
use crate::simulation::SimulationClock;
use crate::store::{EntityStore, FileStore, StoreError};

/// A trigger posted to the runtime inbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FleetEvent {
    /// Advance the simulation one step
    SimulationTick,
    /// Reshuffle bus statuses
    StatusRefresh,
    /// A watch fix for a live session
    LiveFix {
        /// Session the watch was opened for
        session: Uuid,
        /// The reading
        fix: PositionFix,
    },
    /// Heartbeat for a live session
    Heartbeat {
        /// Session the timer was started for
        session: Uuid,
    },
    /// The platform ended a session's watch
    WatchClosed {
        /// Session the watch was opened for
        session: Uuid,
    },
}

/// Roster state for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterView {
    /// Entries in display order
    pub entries: Vec<RosterEntry>,
    /// Row open for editing, if any
    pub editing: Option<RosterId>,
}

/// Owner of the fleet state
pub struct FleetRuntime {
    config: FleetConfig,
    store: EntityStore,
    clock: SimulationClock,
    broadcaster: DisplayBroadcaster,
    tracker: LiveTracker,
    editor: RosterEditor,
    inbox_tx: mpsc::UnboundedSender<FleetEvent>,
    inbox_rx: mpsc::UnboundedReceiver<FleetEvent>,
    clock_cancel: Option<CancellationToken>,
}

impl FleetRuntime {
    /// Assemble a runtime over an opened store
    pub fn new(
        config: FleetConfig,
        store: EntityStore,
        provider: Arc<dyn GeolocationProvider>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let clock = SimulationClock::new(&config.simulation);
        let tracker = LiveTracker::new(provider, config.tracking.clone(), inbox_tx.clone());

        Self {
            config,
            store,
            clock,
            broadcaster: DisplayBroadcaster::new(),
            tracker,
            editor: RosterEditor::new(),
            inbox_tx,
            inbox_rx,
            clock_cancel: None,
        }
    }

    /// Open the file store named by the configuration (or the platform
    /// default) and assemble a runtime over it
    pub fn open(config: FleetConfig, provider: Arc<dyn GeolocationProvider>) -> Result<Self> {
        config.validate()?;
        let dir = match &config.storage.data_dir {
            Some(dir) => dir.clone(),
            None => FileStore::default_dir().map_err(StoreError::from)?,
        };
        tracing::info!(dir = %dir.display(), "opening fleet store");

        let store = EntityStore::open(Box::new(FileStore::open(dir)?))?;
        Ok(Self::new(config, store, provider))
    }

    /// Active configuration
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Read access to the store
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The simulation clock
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    // --- inbox ---

    /// Sender for posting events from outside the runtime
    pub fn inbox(&self) -> mpsc::UnboundedSender<FleetEvent> {
        self.inbox_tx.clone()
    }

    /// Events waiting in the inbox
    pub fn pending_events(&self) -> usize {
        self.inbox_rx.len()
    }

    /// Apply one event and publish what it changed
    pub fn handle(&mut self, event: FleetEvent) -> PublishReport {
        match event {
            FleetEvent::SimulationTick => self.tick(),
            FleetEvent::StatusRefresh => self.refresh_statuses(),
            FleetEvent::LiveFix { session, fix } => {
                let update = self.tracker.handle_fix(&mut self.store, session, fix);
                self.publish(update)
            }
            FleetEvent::Heartbeat { session } => {
                let update = self.tracker.handle_heartbeat(&self.store, session);
                self.publish(update)
            }
            FleetEvent::WatchClosed { session } => {
                self.tracker.handle_watch_closed(session);
                PublishReport::default()
            }
        }
    }

    /// Apply everything already queued, returning how many events ran
    pub fn drain_inbox(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event and apply it
    pub async fn process_next(&mut self) -> Option<PublishReport> {
        let event = self.inbox_rx.recv().await?;
        Some(self.handle(event))
    }

    fn publish(&mut self, update: Option<VehicleUpdate>) -> PublishReport {
        match update {
            Some(update) => self.broadcaster.publish(&update),
            None => PublishReport::default(),
        }
    }

    // --- simulation ---

    /// Start the tick and status timers. Replaces timers already running.
    pub fn spawn_clock(&mut self) -> CancellationToken {
        self.stop_clock();

        let cancel = CancellationToken::new();
        let sim = &self.config.simulation;
        tokio::spawn(post_periodically(
            sim.tick_interval(),
            FleetEvent::SimulationTick,
            self.inbox_tx.clone(),
            cancel.clone(),
        ));
        tokio::spawn(post_periodically(
            sim.status_refresh(),
            FleetEvent::StatusRefresh,
            self.inbox_tx.clone(),
            cancel.clone(),
        ));

        tracing::debug!(
            tick = ?sim.tick_interval(),
            status_refresh = ?sim.status_refresh(),
            "simulation timers started"
        );
        self.clock_cancel = Some(cancel.clone());
        cancel
    }

    /// Stop the timers started by [`spawn_clock`](Self::spawn_clock)
    pub fn stop_clock(&mut self) {
        if let Some(cancel) = self.clock_cancel.take() {
            cancel.cancel();
        }
    }

    /// Run one simulation step now
    pub fn tick(&mut self) -> PublishReport {
        let updates = self.clock.tick(&mut self.store);
        self.broadcaster.publish_all(&updates)
    }

    /// Reshuffle statuses now
    pub fn refresh_statuses(&mut self) -> PublishReport {
        let updates = self.clock.refresh_statuses(&mut self.store);
        self.broadcaster.publish_all(&updates)
    }

    /// The route view was shown or hidden
    pub fn set_route_view_active(&mut self, active: bool) {
        self.clock.set_active(active);
    }

    // --- live tracking ---

    /// Start a live session for `vehicle_id`, replacing any running one
    pub async fn start_tracking(&mut self, vehicle_id: VehicleId) -> Result<VehicleUpdate> {
        let previous = self.tracker.session().map(|s| s.vehicle_id);
        let update = self.tracker.start(&mut self.store, vehicle_id).await?;

        if let Some(previous) = previous.filter(|&p| p != vehicle_id) {
            let released = self
                .store
                .vehicle(previous)
                .map(|v| v.snapshot(UpdateSource::SessionChange));
            self.publish(released);
        }
        self.broadcaster.publish(&update);
        Ok(update)
    }

    /// Stop live tracking. Returns whether a vehicle stopped being live.
    pub fn stop_tracking(&mut self) -> Result<bool> {
        let update = self.tracker.stop(&mut self.store)?;
        let stopped = update.is_some();
        self.publish(update);
        Ok(stopped)
    }

    /// Resume a session persisted before a restart
    pub fn resume_tracking(&mut self) -> Result<Option<LiveSession>> {
        Ok(self.tracker.resume(&mut self.store)?)
    }

    /// The running live session
    pub fn live_session(&self) -> Option<&LiveSession> {
        self.tracker.session()
    }

    // --- display surfaces ---

    /// Mount a display surface for a vehicle
    pub fn register_surface(
        &mut self,
        vehicle_id: VehicleId,
        surface: Box<dyn DisplaySurface>,
    ) -> Result<SurfaceHandle> {
        if self.store.vehicle(vehicle_id).is_none() {
            return Err(FleetError::UnknownVehicle(vehicle_id));
        }
        Ok(self.broadcaster.register(vehicle_id, surface))
    }

    /// Unmount a display surface
    pub fn unregister_surface(&mut self, handle: SurfaceHandle) -> bool {
        self.broadcaster.unregister(handle).is_some()
    }

    /// Surfaces mounted for a vehicle
    pub fn surface_count(&self, vehicle_id: VehicleId) -> usize {
        self.broadcaster.surface_count(vehicle_id)
    }

    // --- fleet views ---

    /// Star or unstar a bus, returning the new state
    pub fn toggle_favorite(&mut self, vehicle_id: VehicleId) -> Result<bool> {
        let vehicle = self
            .store
            .vehicle_mut(vehicle_id)
            .ok_or(FleetError::UnknownVehicle(vehicle_id))?;
        vehicle.favorite = !vehicle.favorite;

        let favorite = vehicle.favorite;
        let update = vehicle.snapshot(UpdateSource::Operator);
        self.broadcaster.publish(&update);
        Ok(favorite)
    }

    /// Vehicles passing `filter` and matching `search`, by bus number
    pub fn vehicles(&self, filter: FleetFilter, search: &str) -> Vec<&Vehicle> {
        self.store
            .vehicles()
            .filter(|v| filter.matches(v) && matches_search(v, search))
            .collect()
    }

    // --- roster ---

    /// Entries plus the row being edited
    pub fn roster_view(&self) -> RosterView {
        RosterView {
            entries: self.store.roster().entries().to_vec(),
            editing: self.editor.editing(),
        }
    }

    /// Roster rows matching `term`
    pub fn search_roster(&self, term: &str) -> Vec<&RosterEntry> {
        self.store.roster().search(term)
    }

    /// Editor state
    pub fn editor_state(&self) -> EditorState {
        self.editor.state()
    }

    /// Open a roster row for editing
    pub fn begin_edit(&mut self, id: RosterId) -> Result<RosterDraft> {
        Ok(self.editor.begin_edit(&self.store, id)?)
    }

    /// Add a blank roster row and open it for editing
    pub fn add_roster_entry(&mut self) -> Result<RosterEntry> {
        Ok(self.editor.add_new(&mut self.store)?)
    }

    /// Save the row being edited
    pub fn save_roster_entry(&mut self, id: RosterId, draft: &RosterDraft) -> Result<RosterEntry> {
        Ok(self.editor.save(&mut self.store, id, draft)?)
    }

    /// Leave edit mode
    pub fn cancel_edit(&mut self) -> Result<CancelOutcome> {
        Ok(self.editor.cancel_edit(&mut self.store)?)
    }

    /// Delete a roster row after `confirm` approves it
    pub fn delete_roster_entry<F>(&mut self, id: RosterId, confirm: F) -> Result<RosterEntry>
    where
        F: FnOnce(&RosterEntry) -> bool,
    {
        Ok(self.editor.delete(&mut self.store, id, confirm)?)
    }

    // --- profile ---

    /// Load the operator profile
    pub fn profile(&self) -> Result<UserProfile> {
        Ok(UserProfile::load(&self.store)?)
    }

    /// Persist the operator profile
    pub fn save_profile(&mut self, profile: &UserProfile) -> Result<()> {
        Ok(profile.save(&mut self.store)?)
    }
}

impl Drop for FleetRuntime {
    fn drop(&mut self) {
        self.stop_clock();
    }
}

async fn post_periodically(
    period: Duration,
    event: FleetEvent,
    inbox: mpsc::UnboundedSender<FleetEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if inbox.send(event).is_err() {
                    break;
                }
            }
        }
    }
}
