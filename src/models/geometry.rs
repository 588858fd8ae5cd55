//! GeoJSON point geometry stored on each listing.

use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Coordinate used when a location cannot be geocoded and nothing better is
/// stored (New Delhi). Longitude first, GeoJSON order.
pub const FALLBACK_COORDINATE: Coord<f64> = Coord {
    x: 77.209,
    y: 28.6139,
};

/// Geometry type tag. Only points are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    #[default]
    Point,
}

/// GeoJSON-style point: `{"type": "Point", "coordinates": [lon, lat]}`.
///
/// `coordinates` is kept as a plain array because legacy documents may carry
/// an empty or malformed array, which the reconciler has to detect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default)]
    pub kind: GeometryKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coordinates: Vec<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<f64>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Geometry {
    /// Build a point from a coordinate where `x` is longitude and `y` latitude.
    pub fn point(coord: Coord<f64>) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates: vec![coord.x, coord.y],
        }
    }

    pub fn fallback() -> Self {
        Self::point(FALLBACK_COORDINATE)
    }

    /// The coordinate pair, if the array holds exactly two finite numbers.
    pub fn coord(&self) -> Option<Coord<f64>> {
        match self.coordinates.as_slice() {
            [lon, lat] if lon.is_finite() && lat.is_finite() => Some(Coord { x: *lon, y: *lat }),
            _ => None,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        !self.coordinates.is_empty()
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::fallback()
    }
}

/// True when a geometry is present and sits exactly on the fallback sentinel.
pub fn is_fallback(geometry: Option<&Geometry>) -> bool {
    geometry.and_then(Geometry::coord) == Some(FALLBACK_COORDINATE)
}

/// True when the geometry is missing, has no coordinates, or does not hold
/// exactly two components.
pub fn is_incomplete(geometry: Option<&Geometry>) -> bool {
    match geometry {
        None => true,
        Some(g) => g.coordinates.len() != 2,
    }
}
