//! Fleet Module
//!
//! Vehicle model, the built-in campus route table and the dashboard filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::broadcast::{UpdateSource, VehicleUpdate};
use crate::geo::{Bounds, LatLng, CAMPUS};

/// Bus number
pub type VehicleId = u32;

/// Lowest speed a simulated bus may report (km/h)
pub const SPEED_MIN: f64 = 20.0;

/// Highest speed a simulated bus may report (km/h)
pub const SPEED_MAX: f64 = 60.0;

/// Schedule status shown on cards and markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleStatus {
    /// Running to schedule
    OnTime,
    /// Running behind schedule
    Delayed,
    /// Running ahead of schedule
    Early,
}

impl VehicleStatus {
    /// Every status, in display order
    pub const ALL: [VehicleStatus; 3] = [Self::OnTime, Self::Delayed, Self::Early];

    /// Machine name, as used in persisted snapshots and filters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on-time",
            Self::Delayed => "delayed",
            Self::Early => "early",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::OnTime => "On-time",
            Self::Delayed => "Delayed",
            Self::Early => "Early",
        }
    }

    /// Parse a machine name. The legacy `online` status reads as on-time.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "on-time" | "ontime" | "online" => Some(Self::OnTime),
            "delayed" => Some(Self::Delayed),
            "early" => Some(Self::Early),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A simulated or live-tracked bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Bus number
    pub id: VehicleId,
    /// Display name, e.g. "Bus 3"
    pub name: String,
    /// Driver name
    pub driver: String,
    /// Route label, e.g. "Kakinada → Surampalem"
    pub route: String,
    /// Marker colour (CSS hex)
    pub color: String,
    /// Where the route starts
    pub origin: LatLng,
    /// Current position
    pub position: LatLng,
    destination: LatLng,
    /// Speed in km/h, always within [`SPEED_MIN`, `SPEED_MAX`]
    pub speed: f64,
    /// Schedule status
    pub status: VehicleStatus,
    /// Whether a live-position session currently drives `position`
    pub is_live: bool,
    /// Starred on the dashboard
    pub favorite: bool,
    /// Time of the last live fix, if any
    pub last_update: Option<DateTime<Utc>>,
}

impl Vehicle {
    /// Create a vehicle parked at `origin` and heading for `destination`
    pub fn new(
        id: VehicleId,
        driver: impl Into<String>,
        route: impl Into<String>,
        origin: LatLng,
        destination: LatLng,
        speed: f64,
        status: VehicleStatus,
    ) -> Self {
        Self {
            id,
            name: format!("Bus {}", id),
            driver: driver.into(),
            route: route.into(),
            color: "#667eea".to_string(),
            origin,
            position: origin,
            destination,
            speed: clamp_speed(speed),
            status,
            is_live: false,
            favorite: false,
            last_update: None,
        }
    }

    /// Set the marker colour
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Fixed destination of the route
    pub fn destination(&self) -> LatLng {
        self.destination
    }

    /// Box covering the route start and the destination
    pub fn route_bounds(&self) -> Bounds {
        let mut bounds = Bounds::from_point(self.origin);
        bounds.extend(self.destination);
        bounds
    }

    /// Current state as a display update
    pub fn snapshot(&self, source: UpdateSource) -> VehicleUpdate {
        VehicleUpdate {
            vehicle_id: self.id,
            position: self.position,
            speed: self.speed,
            status: self.status,
            is_live: self.is_live,
            last_update: self.last_update,
            source,
        }
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.id,
            self.name,
            self.route,
            self.driver,
            self.status.as_str()
        )
        .to_lowercase()
    }
}

/// Clamp a speed into the simulated range
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return SPEED_MIN;
    }
    speed.clamp(SPEED_MIN, SPEED_MAX)
}

/// Dashboard filter pills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FleetFilter {
    /// Every bus
    #[default]
    All,
    /// Only on-time buses
    OnTime,
    /// Only delayed buses
    Delayed,
    /// Only early buses
    Early,
    /// Only starred buses
    Favorites,
}

impl FleetFilter {
    /// Whether `vehicle` passes the filter
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        match self {
            Self::All => true,
            Self::OnTime => vehicle.status == VehicleStatus::OnTime,
            Self::Delayed => vehicle.status == VehicleStatus::Delayed,
            Self::Early => vehicle.status == VehicleStatus::Early,
            Self::Favorites => vehicle.favorite,
        }
    }
}

/// Case-insensitive free-text match over number, name, route, driver and status.
/// An empty term matches every vehicle.
pub fn matches_search(vehicle: &Vehicle, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty() || vehicle.search_text().contains(&term)
}

/// The campus route table
pub fn default_fleet() -> Vec<Vehicle> {
    use VehicleStatus::*;

    let routes: [(VehicleId, &str, &str, f64, f64, f64, VehicleStatus, &str); 12] = [
        (1, "Ramesh Babu", "Rajahmundry", 17.0005, 81.8040, 45.0, OnTime, "#667eea"),
        (3, "Srinivas Reddy", "Kakinada", 16.9891, 82.2711, 38.0, Delayed, "#dc2626"),
        (4, "Venkata Rao", "Pithapuram", 17.1167, 82.2500, 52.0, OnTime, "#16a34a"),
        (8, "Prasad Raju", "Peddapuram", 17.0833, 82.1333, 41.0, Early, "#fbbf24"),
        (90, "Kiran Kumar", "Samalkot", 17.0500, 82.1667, 47.0, OnTime, "#8b5cf6"),
        (12, "Suresh Babu", "Amalapuram", 16.5833, 82.0167, 43.0, Early, "#f59e0b"),
        (15, "Ravi Teja", "Mandapeta", 16.8667, 81.9333, 39.0, OnTime, "#06b6d4"),
        (22, "Mahesh Kumar", "Tuni", 17.3500, 82.5500, 35.0, Delayed, "#ef4444"),
        (25, "Naresh Reddy", "Yanam", 16.7333, 82.2167, 48.0, OnTime, "#10b981"),
        (30, "Vijay Krishna", "Ramachandrapuram", 16.8333, 82.3000, 44.0, Early, "#f97316"),
        (35, "Srinivas Rao", "Kotananduru", 16.7833, 81.8833, 32.0, Delayed, "#ec4899"),
        (40, "Rajesh Kumar", "Uppada", 17.0833, 82.3500, 41.0, OnTime, "#14b8a6"),
    ];

    routes
        .into_iter()
        .map(|(id, driver, town, lat, lng, speed, status, color)| {
            Vehicle::new(
                id,
                driver,
                format!("{} → Surampalem", town),
                LatLng::new(lat, lng),
                CAMPUS,
                speed,
                status,
            )
            .with_color(color)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fleet_converges_on_campus() {
        let fleet = default_fleet();
        assert_eq!(fleet.len(), 12);
        assert!(fleet.iter().all(|v| v.destination() == CAMPUS));
        assert!(fleet.iter().all(|v| !v.is_live));
    }

    #[test]
    fn test_speed_is_clamped_on_creation() {
        let v = Vehicle::new(7, "D", "R", CAMPUS, CAMPUS, 95.0, VehicleStatus::OnTime);
        assert_eq!(v.speed, SPEED_MAX);
        assert_eq!(clamp_speed(5.0), SPEED_MIN);
        assert_eq!(clamp_speed(f64::NAN), SPEED_MIN);
    }

    #[test]
    fn test_status_parse_accepts_legacy_online() {
        assert_eq!(VehicleStatus::parse("online"), Some(VehicleStatus::OnTime));
        assert_eq!(VehicleStatus::parse("Delayed"), Some(VehicleStatus::Delayed));
        assert_eq!(VehicleStatus::parse("lost"), None);
    }

    #[test]
    fn test_filter_and_search() {
        let mut fleet = default_fleet();
        fleet[0].favorite = true;

        let delayed = fleet.iter().filter(|v| FleetFilter::Delayed.matches(v)).count();
        assert_eq!(delayed, 3);

        let favorites: Vec<_> = fleet
            .iter()
            .filter(|v| FleetFilter::Favorites.matches(v))
            .map(|v| v.id)
            .collect();
        assert_eq!(favorites, vec![1]);

        let hits: Vec<_> = fleet
            .iter()
            .filter(|v| matches_search(v, "kakinada"))
            .map(|v| v.id)
            .collect();
        assert_eq!(hits, vec![3]);
        assert!(fleet.iter().all(|v| matches_search(v, "  ")));
    }
}
