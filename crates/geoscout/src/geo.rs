//! Coordinate primitives shared by configuration, validation and querying.
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine distance, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Rectangular latitude/longitude region, usually the visible map viewport.
///
/// A box whose `west` edge lies east of its `east` edge crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    #[must_use]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        let in_lat = latitude >= self.south && latitude <= self.north;
        let in_lng = if self.crosses_antimeridian() {
            longitude >= self.west || longitude <= self.east
        } else {
            longitude >= self.west && longitude <= self.east
        };
        in_lat && in_lng
    }

    /// Smallest box holding every point, or `None` for an empty set.
    ///
    /// Never produces an antimeridian-crossing box.
    pub fn enclosing(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (lat, lng)| {
            Some(match acc {
                None => Self::new(lat, lat, lng, lng),
                Some(b) => Self::new(
                    b.north.max(lat),
                    b.south.min(lat),
                    b.east.max(lng),
                    b.west.min(lng),
                ),
            })
        })
    }

    /// Box around `(latitude, longitude)` guaranteed to hold every point within `radius_m`.
    ///
    /// Edges are derived from the angular radius on a sphere of [`EARTH_RADIUS_M`]. A circle
    /// reaching either pole covers every longitude.
    #[must_use]
    pub fn around(latitude: f64, longitude: f64, radius_m: f64) -> Self {
        let delta = radius_m.max(0.0) / EARTH_RADIUS_M;
        let phi = latitude.to_radians();
        let north = (phi + delta).to_degrees();
        let south = (phi - delta).to_degrees();
        if north >= 90.0 || south <= -90.0 {
            return Self::new(north.min(90.0), south.max(-90.0), 180.0, -180.0);
        }

        let lng_delta = (delta.sin() / phi.cos()).min(1.0).asin().to_degrees();
        let mut west = longitude - lng_delta;
        let mut east = longitude + lng_delta;
        if west < -180.0 {
            west += 360.0;
        }
        if east > 180.0 {
            east -= 360.0;
        }
        Self::new(north, south, east, west)
    }
}

/// The legal coordinate range for filters and places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateEnvelope {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl Default for CoordinateEnvelope {
    fn default() -> Self {
        Self {
            lat_min: -90.0,
            lat_max: 90.0,
            lng_min: -180.0,
            lng_max: 180.0,
        }
    }
}

impl CoordinateEnvelope {
    #[must_use]
    pub fn contains_latitude(&self, latitude: f64) -> bool {
        latitude.is_finite() && latitude >= self.lat_min && latitude <= self.lat_max
    }

    #[must_use]
    pub fn contains_longitude(&self, longitude: f64) -> bool {
        longitude.is_finite() && longitude >= self.lng_min && longitude <= self.lng_max
    }

    #[must_use]
    pub fn as_bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.lat_max, self.lat_min, self.lng_max, self.lng_min)
    }
}

/// Great-circle distance between two points in metres.
#[must_use]
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}
