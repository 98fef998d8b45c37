//! Display Broadcaster
//!
//! Fans vehicle updates out to every display surface currently mounted for a
//! vehicle. Surfaces register and unregister explicitly; the broadcaster keeps
//! only the registry and never owns rendering state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::fleet::{VehicleId, VehicleStatus};
use crate::geo::LatLng;

/// What produced an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateSource {
    /// Simulation clock tick
    Simulation,
    /// Periodic status reshuffle
    StatusRefresh,
    /// Live-position callback
    LiveFix,
    /// Live-session heartbeat re-broadcast
    Heartbeat,
    /// Session started or stopped
    SessionChange,
    /// Operator action (e.g. favourite toggled)
    Operator,
}

/// Structured update event pushed to display surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleUpdate {
    /// Bus the update is for
    pub vehicle_id: VehicleId,
    /// Position after the update
    pub position: LatLng,
    /// Speed after the update (km/h)
    pub speed: f64,
    /// Schedule status
    pub status: VehicleStatus,
    /// Whether a live session drives the position
    pub is_live: bool,
    /// Time of the last live fix
    pub last_update: Option<DateTime<Utc>>,
    /// What produced this update
    pub source: UpdateSource,
}

/// Kinds of independent display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    /// Marker on a map
    MapMarker,
    /// Entry in the route list
    ListItem,
    /// Dashboard card
    Card,
    /// Detail side panel
    SidePanel,
}

/// Failure applying an update to one surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// Drawing primitive not available
    #[error("Drawing primitive unavailable: {0}")]
    MissingPrimitive(String),

    /// Surface is no longer mounted
    #[error("Surface detached from its renderer")]
    Detached,

    /// Surface refused the update
    #[error("Surface rejected update: {0}")]
    Rejected(String),
}

/// Anything that renders a vehicle and wants its updates
pub trait DisplaySurface: Send {
    /// What kind of surface this is
    fn kind(&self) -> SurfaceKind;

    /// Apply an update to the rendered state
    fn apply(&mut self, update: &VehicleUpdate) -> Result<(), SurfaceError>;
}

/// Registration receipt; pass back to [`DisplayBroadcaster::unregister`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    vehicle_id: VehicleId,
    id: u64,
}

impl SurfaceHandle {
    /// Vehicle this surface renders
    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }
}

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Surfaces that applied the update
    pub delivered: usize,
    /// Surfaces whose update failed
    pub failed: usize,
}

struct Registered {
    id: u64,
    surface: Box<dyn DisplaySurface>,
}

/// Registry of mounted surfaces keyed by vehicle id
#[derive(Default)]
pub struct DisplayBroadcaster {
    next_id: u64,
    registry: HashMap<VehicleId, Vec<Registered>>,
}

impl DisplayBroadcaster {
    /// Create an empty broadcaster
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a surface for `vehicle_id`
    pub fn register(
        &mut self,
        vehicle_id: VehicleId,
        surface: Box<dyn DisplaySurface>,
    ) -> SurfaceHandle {
        self.next_id += 1;
        let id = self.next_id;
        tracing::debug!(vehicle_id, kind = ?surface.kind(), "surface registered");
        self.registry
            .entry(vehicle_id)
            .or_default()
            .push(Registered { id, surface });
        SurfaceHandle { vehicle_id, id }
    }

    /// Unmount a surface, handing it back for teardown
    pub fn unregister(&mut self, handle: SurfaceHandle) -> Option<Box<dyn DisplaySurface>> {
        let surfaces = self.registry.get_mut(&handle.vehicle_id)?;
        let index = surfaces.iter().position(|r| r.id == handle.id)?;
        let removed = surfaces.remove(index);
        if surfaces.is_empty() {
            self.registry.remove(&handle.vehicle_id);
        }
        Some(removed.surface)
    }

    /// Number of surfaces mounted for a vehicle
    pub fn surface_count(&self, vehicle_id: VehicleId) -> usize {
        self.registry.get(&vehicle_id).map_or(0, Vec::len)
    }

    /// Total number of mounted surfaces
    pub fn total_surfaces(&self) -> usize {
        self.registry.values().map(Vec::len).sum()
    }

    /// Apply `update` to every surface mounted for its vehicle.
    ///
    /// A failing surface is logged and skipped; delivery to the rest continues.
    pub fn publish(&mut self, update: &VehicleUpdate) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(surfaces) = self.registry.get_mut(&update.vehicle_id) else {
            return report;
        };

        for registered in surfaces.iter_mut() {
            match registered.surface.apply(update) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        vehicle_id = update.vehicle_id,
                        kind = ?registered.surface.kind(),
                        "surface update failed: {e}"
                    );
                }
            }
        }

        report
    }

    /// Publish a batch of updates, summing the reports
    pub fn publish_all<'a, I>(&mut self, updates: I) -> PublishReport
    where
        I: IntoIterator<Item = &'a VehicleUpdate>,
    {
        updates
            .into_iter()
            .fold(PublishReport::default(), |acc, update| {
                let report = self.publish(update);
                PublishReport {
                    delivered: acc.delivered + report.delivered,
                    failed: acc.failed + report.failed,
                }
            })
    }
}

/// Surface that forwards updates to the presentation layer over a channel
pub struct ChannelSurface {
    kind: SurfaceKind,
    tx: mpsc::UnboundedSender<VehicleUpdate>,
}

impl ChannelSurface {
    /// Create the surface and the receiving end for the renderer
    pub fn new(kind: SurfaceKind) -> (Self, mpsc::UnboundedReceiver<VehicleUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { kind, tx }, rx)
    }
}

impl DisplaySurface for ChannelSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn apply(&mut self, update: &VehicleUpdate) -> Result<(), SurfaceError> {
        self.tx
            .send(update.clone())
            .map_err(|_| SurfaceError::Detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(vehicle_id: VehicleId) -> VehicleUpdate {
        VehicleUpdate {
            vehicle_id,
            position: LatLng::new(17.0, 82.0),
            speed: 40.0,
            status: VehicleStatus::OnTime,
            is_live: false,
            last_update: None,
            source: UpdateSource::Simulation,
        }
    }

    #[test]
    fn test_publish_without_surfaces_is_noop() {
        let mut broadcaster = DisplayBroadcaster::new();
        assert_eq!(broadcaster.publish(&update(3)), PublishReport::default());
    }

    #[test]
    fn test_channel_surface_receives_updates() {
        let mut broadcaster = DisplayBroadcaster::new();
        let (surface, mut rx) = ChannelSurface::new(SurfaceKind::Card);
        broadcaster.register(3, Box::new(surface));

        let report = broadcaster.publish(&update(3));
        assert_eq!(report.delivered, 1);
        assert_eq!(rx.try_recv().unwrap().vehicle_id, 3);

        // Other vehicles do not leak into this surface
        broadcaster.publish(&update(4));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_counts_as_failure() {
        let mut broadcaster = DisplayBroadcaster::new();
        let (surface, rx) = ChannelSurface::new(SurfaceKind::MapMarker);
        broadcaster.register(1, Box::new(surface));
        drop(rx);

        let report = broadcaster.publish(&update(1));
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 0);
    }

    #[test]
    fn test_unregister_removes_only_that_surface() {
        let mut broadcaster = DisplayBroadcaster::new();
        let (a, _rx_a) = ChannelSurface::new(SurfaceKind::MapMarker);
        let (b, _rx_b) = ChannelSurface::new(SurfaceKind::ListItem);
        let handle_a = broadcaster.register(8, Box::new(a));
        broadcaster.register(8, Box::new(b));

        let removed = broadcaster.unregister(handle_a).unwrap();
        assert_eq!(removed.kind(), SurfaceKind::MapMarker);
        assert_eq!(broadcaster.surface_count(8), 1);
        assert!(broadcaster.unregister(handle_a).is_none());
    }
}
