//! Live tracking errors

use thiserror::Error;

use crate::fleet::VehicleId;
use crate::store::StoreError;

/// Failure reported by the device geolocation provider
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoError {
    /// User or platform refused location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// Device could not determine a position
    #[error("Location information unavailable")]
    PositionUnavailable,

    /// No fix within the allowed time
    #[error("Location request timed out")]
    Timeout,
}

/// Errors from starting, stopping or resuming a live session
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Device geolocation failure
    #[error(transparent)]
    Geolocation(#[from] GeoError),

    /// No vehicle with this id
    #[error("Unknown bus number: {0}")]
    UnknownVehicle(VehicleId),

    /// Session marker could not be stored
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}
