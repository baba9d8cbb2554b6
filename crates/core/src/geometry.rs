//! Typed GeoJSON geometry model and tolerant equality.
//!
//! All validation, diffing, and publishing operate on canonical GeoJSON
//! in EPSG:4326, so geometries are parsed once into this typed enum and
//! compared with a fixed coordinate tolerance rather than bitwise.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Coordinate tolerance for geometry comparison, in degrees.
///
/// Roughly one metre at the equator. Two geometries whose coordinates
/// differ by no more than this per axis are considered equal, which
/// absorbs re-projection and serialization noise between GIS exports.
pub const GEOMETRY_TOLERANCE: f64 = 1e-5;

/// A single GeoJSON position: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// A GeoJSON geometry, tagged on the `type` member.
///
/// `GeometryCollection` is deliberately unsupported: road features are
/// line-based and collections are rejected at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    /// Parse a geometry from its raw GeoJSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Validation(format!("Malformed geometry: {e}")))
    }

    /// The GeoJSON `type` member.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point { .. } => "Point",
            Self::MultiPoint { .. } => "MultiPoint",
            Self::LineString { .. } => "LineString",
            Self::MultiLineString { .. } => "MultiLineString",
            Self::Polygon { .. } => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
        }
    }

    /// Whether this is a road-shaped geometry (LineString or MultiLineString).
    pub fn is_line_based(&self) -> bool {
        matches!(
            self,
            Self::LineString { .. } | Self::MultiLineString { .. }
        )
    }
}

// ── Tolerant equality ────────────────────────────────────────────────

/// Compare two geometries with [`GEOMETRY_TOLERANCE`].
///
/// A `LineString` and a single-component `MultiLineString` holding the
/// same coordinates compare equal: GIS exports flip between the two
/// representations freely. True multi-component `MultiLineString`s are
/// compared structurally in original component order. Any other type
/// pairing falls back to exact structural equality.
pub fn tolerant_eq(a: &Geometry, b: &Geometry) -> bool {
    if is_simple_line(a) || is_simple_line(b) {
        match (flat_coords(a), flat_coords(b)) {
            (Some(fa), Some(fb)) => sequence_eq(&fa, &fb),
            _ => a == b,
        }
    } else if let (
        Geometry::MultiLineString { coordinates: ca },
        Geometry::MultiLineString { coordinates: cb },
    ) = (a, b)
    {
        ca.len() == cb.len()
            && ca.iter().zip(cb).all(|(la, lb)| {
                sequence_eq(
                    &la.iter().collect::<Vec<_>>(),
                    &lb.iter().collect::<Vec<_>>(),
                )
            })
    } else {
        a == b
    }
}

/// A LineString, or a MultiLineString with exactly one component.
fn is_simple_line(g: &Geometry) -> bool {
    match g {
        Geometry::LineString { .. } => true,
        Geometry::MultiLineString { coordinates } => coordinates.len() == 1,
        _ => false,
    }
}

/// Flatten a line-based geometry to one ordered coordinate sequence.
fn flat_coords(g: &Geometry) -> Option<Vec<&Position>> {
    match g {
        Geometry::LineString { coordinates } => Some(coordinates.iter().collect()),
        Geometry::MultiLineString { coordinates } => {
            Some(coordinates.iter().flatten().collect())
        }
        _ => None,
    }
}

/// Pairwise, per-axis comparison of two coordinate sequences.
fn sequence_eq(a: &[&Position], b: &[&Position]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).all(|(pa, pb)| {
        pa.len() == pb.len()
            && pa
                .iter()
                .zip(pb.iter())
                .all(|(xa, xb)| (xa - xb).abs() <= GEOMETRY_TOLERANCE)
    })
}
