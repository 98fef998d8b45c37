//! # FleetTrack Core Library
//!
//! Fleet position and live-tracking core for the campus bus tracker.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A simulated fleet that approaches the campus on a recurring tick
//! - Live tracking that overlays a device location feed onto one bus
//! - A broadcaster that fans updates out to every mounted display surface
//! - A single-row roster editor with validation and persistence
//! - Local key-value persistence (in-memory or one JSON file per key)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fleettrack_core::prelude::*;
//!
//! let geo = ChannelGeolocation::new();
//! let mut runtime = FleetRuntime::open(FleetConfig::default(), Arc::new(geo.clone()))?;
//!
//! let (card, mut updates) = ChannelSurface::new(SurfaceKind::Card);
//! runtime.register_surface(3, Box::new(card))?;
//! runtime.spawn_clock();
//!
//! while let Some(report) = runtime.process_next().await {
//!     println!("delivered to {} surfaces", report.delivered);
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod live;
pub mod profile;
pub mod roster;
pub mod runtime;
pub mod simulation;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::broadcast::{
        ChannelSurface, DisplayBroadcaster, DisplaySurface, SurfaceKind, VehicleUpdate,
    };
    pub use crate::config::FleetConfig;
    pub use crate::error::FleetError;
    pub use crate::fleet::{FleetFilter, Vehicle, VehicleId, VehicleStatus};
    pub use crate::geo::{Bounds, LatLng, CAMPUS};
    pub use crate::live::{ChannelGeolocation, GeoError, GeolocationProvider, PositionFix};
    pub use crate::profile::UserProfile;
    pub use crate::roster::{EditorState, RosterDraft, RosterEntry, ValidationError};
    pub use crate::runtime::{FleetEvent, FleetRuntime};
    pub use crate::store::{EntityStore, FileStore, KeyValueStore, MemoryStore};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
