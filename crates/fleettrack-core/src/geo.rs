//! Geographic primitives
//!
//! Coordinates, straight-line fractional approach and bounding boxes.
//! Routes are straight lines from a start point to the campus; there is no
//! path-finding and no great-circle maths here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pragati Engineering College, Surampalem. Every seeded route ends here.
pub const CAMPUS: LatLng = LatLng {
    lat: 17.083056007230727,
    lng: 82.05445438182011,
};

/// A WGS84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, -90..=90
    pub lat: f64,
    /// Longitude in degrees, -180..=180
    pub lng: f64,
}

impl LatLng {
    /// Create a coordinate pair
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Move `fraction` of the remaining delta toward `target`.
    ///
    /// Repeated application approaches `target` exponentially and never lands
    /// on it exactly.
    pub fn step_toward(self, target: LatLng, fraction: f64) -> LatLng {
        LatLng {
            lat: self.lat + (target.lat - self.lat) * fraction,
            lng: self.lng + (target.lng - self.lng) * fraction,
        }
    }

    /// Planar distance in degrees. Only meaningful for comparisons.
    pub fn degrees_to(&self, other: &LatLng) -> f64 {
        (other.lat - self.lat).hypot(other.lng - self.lng)
    }

    /// Whether both components are finite and inside their ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Axis-aligned bounding box used by map surfaces to fit a route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// South-west corner
    pub south_west: LatLng,
    /// North-east corner
    pub north_east: LatLng,
}

impl Bounds {
    /// Box containing a single point
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Smallest box containing every point, or `None` for an empty input
    pub fn around<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grow the box to include `point`
    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Whether `point` lies inside or on the edge of the box
    pub fn contains(&self, point: &LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    /// Centre of the box
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_moves_one_percent_of_delta() {
        let start = LatLng::new(16.9891, 82.2711);
        let next = start.step_toward(LatLng::new(17.0831, 82.0545), 0.01);

        assert!((next.lat - 16.990040).abs() < 1e-6, "lat was {}", next.lat);
        assert!((next.lng - 82.268934).abs() < 1e-6, "lng was {}", next.lng);
    }

    #[test]
    fn test_step_never_reaches_target() {
        let mut pos = LatLng::new(17.0005, 81.8040);
        for _ in 0..1000 {
            pos = pos.step_toward(CAMPUS, 0.01);
        }
        assert!(pos.degrees_to(&CAMPUS) > 0.0);
    }

    #[test]
    fn test_display_six_decimals() {
        assert_eq!(LatLng::new(17.5, 82.25).to_string(), "17.500000, 82.250000");
    }

    #[test]
    fn test_validity() {
        assert!(CAMPUS.is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_bounds_around_route() {
        let start = LatLng::new(16.5833, 82.0167);
        let bounds = Bounds::around([start, CAMPUS]).unwrap();

        assert!(bounds.contains(&start));
        assert!(bounds.contains(&CAMPUS));
        assert_eq!(bounds.south_west.lat, 16.5833);
        assert_eq!(bounds.north_east.lng, CAMPUS.lng);
        assert!(Bounds::around(std::iter::empty()).is_none());
    }
}
