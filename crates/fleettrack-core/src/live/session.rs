//! Live session state and its persisted marker

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fleet::VehicleId;
use crate::geo::LatLng;

/// What survives a restart, stored under
/// [`keys::LIVE_SESSION`](crate::store::keys::LIVE_SESSION)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMarker {
    /// Tracked bus
    pub vehicle_id: VehicleId,
    /// Route label at the time tracking started
    pub route: String,
    /// When tracking started
    pub start_time: DateTime<Utc>,
}

/// A running live session
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSession {
    /// Liveness token; callbacks carrying any other id are stale
    pub id: Uuid,
    /// Tracked bus
    pub vehicle_id: VehicleId,
    /// Route label
    pub route: String,
    /// When tracking started
    pub start_time: DateTime<Utc>,
    /// Latest device position, `None` until the first fix after a resume
    pub last_position: Option<LatLng>,
    /// When `last_position` was applied
    pub last_update: Option<DateTime<Utc>>,
}

impl LiveSession {
    pub(crate) fn new(vehicle_id: VehicleId, route: String, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            route,
            start_time,
            last_position: None,
            last_update: None,
        }
    }

    pub(crate) fn from_marker(marker: SessionMarker) -> Self {
        Self::new(marker.vehicle_id, marker.route, marker.start_time)
    }

    /// The marker persisted for this session
    pub fn marker(&self) -> SessionMarker {
        SessionMarker {
            vehicle_id: self.vehicle_id,
            route: self.route.clone(),
            start_time: self.start_time,
        }
    }

    pub(crate) fn record(&mut self, position: LatLng, at: DateTime<Utc>) {
        self.last_position = Some(position);
        self.last_update = Some(at);
    }

    /// Whether any device position has been applied yet
    pub fn has_fix(&self) -> bool {
        self.last_position.is_some()
    }

    /// "Last updated" text relative to `now`
    pub fn last_update_text(&self, now: DateTime<Utc>) -> Option<String> {
        self.last_update.map(|at| describe_age(now - at))
    }
}

/// Human-readable age: "Just now", "N seconds ago", "N minutes ago", "N hours ago"
pub fn describe_age(age: Duration) -> String {
    let seconds = age.num_seconds().max(0);
    if seconds < 10 {
        return "Just now".to_string();
    }
    if seconds < 60 {
        return format!("{} seconds ago", seconds);
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} minute{} ago", minutes, plural(minutes));
    }

    let hours = minutes / 60;
    format!("{} hour{} ago", hours, plural(hours))
}

fn plural(n: i64) -> &'static str {
    if n > 1 {
        "s"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_age() {
        assert_eq!(describe_age(Duration::seconds(3)), "Just now");
        assert_eq!(describe_age(Duration::seconds(-5)), "Just now");
        assert_eq!(describe_age(Duration::seconds(42)), "42 seconds ago");
        assert_eq!(describe_age(Duration::seconds(60)), "1 minute ago");
        assert_eq!(describe_age(Duration::seconds(125)), "2 minutes ago");
        assert_eq!(describe_age(Duration::minutes(60)), "1 hour ago");
        assert_eq!(describe_age(Duration::hours(5)), "5 hours ago");
    }

    #[test]
    fn test_marker_json_shape() {
        let start = DateTime::parse_from_rfc3339("2026-03-01T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let session = LiveSession::new(3, "Kakinada → Surampalem".to_string(), start);

        let json = serde_json::to_value(session.marker()).unwrap();
        assert_eq!(json["vehicleId"], 3);
        assert_eq!(json["route"], "Kakinada → Surampalem");
        assert_eq!(json["startTime"], "2026-03-01T08:30:00Z");
        assert!(!session.has_fix());
    }
}
