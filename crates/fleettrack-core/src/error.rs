//! Crate-level error

use thiserror::Error;

use crate::config::ConfigError;
use crate::fleet::VehicleId;
use crate::live::{GeoError, TrackingError};
use crate::profile::ProfileError;
use crate::roster::{RosterError, ValidationError};
use crate::store::StoreError;

/// Any failure surfaced by [`FleetRuntime`](crate::runtime::FleetRuntime)
#[derive(Error, Debug)]
pub enum FleetError {
    /// No vehicle with this id
    #[error("Unknown bus number: {0}")]
    UnknownVehicle(VehicleId),

    /// Roster editor failure
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// Live tracking failure
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Profile failure
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FleetError {
    /// The failed roster rule, if this is a validation failure
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Roster(RosterError::Validation(e)) => Some(e),
            _ => None,
        }
    }

    /// The geolocation cause, if live tracking failed to start
    pub fn geolocation(&self) -> Option<GeoError> {
        match self {
            Self::Tracking(TrackingError::Geolocation(e)) => Some(*e),
            _ => None,
        }
    }
}

/// Result alias over [`FleetError`]
pub type Result<T> = std::result::Result<T, FleetError>;
