//! Entity Store
//!
//! Authoritative in-memory tables for vehicles and the roster, plus the
//! key-value persistence they are snapshotted to. Every writer (simulation,
//! live tracking, roster editor) goes through this type.

mod error;
mod kv;

pub use error::StoreError;
pub use kv::{FileStore, KeyValueStore, MemoryStore};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::fleet::{default_fleet, Vehicle, VehicleId};
use crate::geo::LatLng;
use crate::roster::{sample_roster, RosterTable};

/// Persisted key names
pub mod keys {
    /// Roster table snapshot
    pub const ROSTER: &str = "roster";
    /// Live-session marker
    pub const LIVE_SESSION: &str = "live-session";
    /// Operator profile snapshot
    pub const USER_PROFILE: &str = "user-profile";
}

/// Owner of the vehicle and roster tables
pub struct EntityStore {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    roster: RosterTable,
    kv: Box<dyn KeyValueStore>,
}

impl EntityStore {
    /// Empty tables over the given persistence
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            roster: RosterTable::default(),
            kv,
        }
    }

    /// Seed the fleet and load the persisted roster.
    ///
    /// With no roster snapshot the sample roster is used and persisted.
    pub fn open(kv: Box<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let mut store = Self::new(kv);
        for vehicle in default_fleet() {
            store.insert_vehicle(vehicle);
        }

        match store.read_json::<RosterTable>(keys::ROSTER)? {
            Some(roster) => {
                tracing::debug!(entries = roster.len(), "roster loaded from storage");
                store.roster = roster;
            }
            None => {
                tracing::info!("no stored roster, seeding sample data");
                store.roster = sample_roster();
                store.persist_roster()?;
            }
        }

        Ok(store)
    }

    // --- vehicles ---

    /// Add or replace a vehicle, returning the previous one
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) -> Option<Vehicle> {
        self.vehicles.insert(vehicle.id, vehicle)
    }

    /// Look up a vehicle
    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Every vehicle, ordered by bus number
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Number of vehicles
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub(crate) fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub(crate) fn vehicles_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.values_mut()
    }

    /// The vehicle currently driven by a live session, if any
    pub fn live_vehicle(&self) -> Option<VehicleId> {
        self.vehicles.values().find(|v| v.is_live).map(|v| v.id)
    }

    /// Overwrite a vehicle's position from a live fix and mark it live.
    ///
    /// Any other live flag is cleared first so at most one vehicle is live.
    pub fn apply_live_fix(
        &mut self,
        id: VehicleId,
        position: LatLng,
        at: DateTime<Utc>,
    ) -> Option<&Vehicle> {
        if !self.vehicles.contains_key(&id) {
            return None;
        }
        for other in self.vehicles.values_mut().filter(|v| v.id != id) {
            other.is_live = false;
        }

        let vehicle = self.vehicles.get_mut(&id)?;
        vehicle.position = position;
        vehicle.is_live = true;
        vehicle.last_update = Some(at);
        Some(vehicle)
    }

    /// Clear every live flag, returning the vehicle that was live
    pub fn clear_live(&mut self) -> Option<VehicleId> {
        let mut previous = None;
        for vehicle in self.vehicles.values_mut().filter(|v| v.is_live) {
            vehicle.is_live = false;
            previous = Some(vehicle.id);
        }
        previous
    }

    // --- roster ---

    /// The roster table
    pub fn roster(&self) -> &RosterTable {
        &self.roster
    }

    pub(crate) fn roster_mut(&mut self) -> &mut RosterTable {
        &mut self.roster
    }

    /// Snapshot the roster to storage
    pub fn persist_roster(&mut self) -> Result<(), StoreError> {
        let json = serde_json::to_string(&self.roster)?;
        self.kv.set(keys::ROSTER, json)?;
        tracing::trace!(entries = self.roster.len(), "roster persisted");
        Ok(())
    }

    // --- raw persistence ---

    /// Read and decode the JSON stored under `key`
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Encode `value` as JSON under `key`
    pub fn write_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.kv.set(key, json)
    }

    /// Delete `key`
    pub fn remove_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.kv.remove(key)
    }
}
