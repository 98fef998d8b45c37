//! Live-Position Adapter
//!
//! Overlays a device location feed onto one vehicle. A session starts with a
//! bounded single-shot fix, then runs a continuous watch plus a heartbeat that
//! re-broadcasts the live vehicle even when the watch stalls. The session
//! marker is persisted so tracking resumes after a restart.

mod error;
mod provider;
mod session;
mod tracker;

pub use error::{GeoError, TrackingError};
pub use provider::{ChannelGeolocation, GeolocationProvider, PositionFix};
pub use session::{describe_age, LiveSession, SessionMarker};
pub use tracker::LiveTracker;
