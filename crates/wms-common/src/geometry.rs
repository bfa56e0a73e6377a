//! GeoJSON geometry model used for spatial filter predicates.
//!
//! Coordinates are kept as plain vectors so that both 2D and 3D vertices
//! survive untouched; no validation (ring closure, winding) is performed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{WmsError, WmsResult};

/// A single vertex: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// GeoJSON geometry, optionally wrapped in a Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum GeometryObject {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeometryObject>,
    },
    Feature {
        geometry: Box<GeometryObject>,
    },
}

const KNOWN_KINDS: &[&str] = &[
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "GeometryCollection",
    "Feature",
];

impl GeometryObject {
    /// Build a point geometry.
    pub fn point(coordinates: Position) -> Self {
        GeometryObject::Point { coordinates }
    }

    /// Decode an untyped GeoJSON value.
    ///
    /// Any `type` tag outside the supported set (including a missing tag)
    /// yields `UnsupportedGeometryKind`, recursing into collections and
    /// feature wrappers so nested unknown kinds are reported by name.
    pub fn from_value(value: &Value) -> WmsResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>");
        if !KNOWN_KINDS.contains(&kind) {
            return Err(WmsError::UnsupportedGeometryKind(kind.to_string()));
        }
        match kind {
            "Feature" => {
                let inner = value.get("geometry").unwrap_or(&Value::Null);
                Ok(GeometryObject::Feature {
                    geometry: Box::new(Self::from_value(inner)?),
                })
            }
            "GeometryCollection" => {
                let members = value
                    .get("geometries")
                    .and_then(Value::as_array)
                    .map(|members| members.iter().map(Self::from_value).collect())
                    .unwrap_or_else(|| Ok(Vec::new()))?;
                Ok(GeometryObject::GeometryCollection {
                    geometries: members,
                })
            }
            _ => serde_json::from_value(value.clone()).map_err(|e| WmsError::InvalidParameter {
                param: "geometry".to_string(),
                message: format!("{} coordinates: {}", kind, e),
            }),
        }
    }

    /// The GeoJSON type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            GeometryObject::Point { .. } => "Point",
            GeometryObject::LineString { .. } => "LineString",
            GeometryObject::Polygon { .. } => "Polygon",
            GeometryObject::MultiPoint { .. } => "MultiPoint",
            GeometryObject::MultiLineString { .. } => "MultiLineString",
            GeometryObject::MultiPolygon { .. } => "MultiPolygon",
            GeometryObject::GeometryCollection { .. } => "GeometryCollection",
            GeometryObject::Feature { .. } => "Feature",
        }
    }

    /// Strip a Feature wrapper, returning the bare geometry.
    pub fn unwrap_feature(&self) -> &GeometryObject {
        match self {
            GeometryObject::Feature { geometry } => geometry.unwrap_feature(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_polygon() {
        let value = json!({
            "type": "Polygon",
            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
        });
        let geometry = GeometryObject::from_value(&value).unwrap();
        assert_eq!(geometry.kind(), "Polygon");
    }

    #[test]
    fn test_decode_feature_unwraps() {
        let value = json!({
            "type": "Feature",
            "properties": {"name": "x"},
            "geometry": {"type": "Point", "coordinates": [1.5, 2.5, 3.0]}
        });
        let geometry = GeometryObject::from_value(&value).unwrap();
        assert_eq!(
            geometry.unwrap_feature(),
            &GeometryObject::point(vec![1.5, 2.5, 3.0])
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let value = json!({"type": "Circle", "coordinates": [0, 0], "radius": "5km"});
        let err = GeometryObject::from_value(&value).unwrap_err();
        assert!(matches!(err, WmsError::UnsupportedGeometryKind(kind) if kind == "Circle"));
    }

    #[test]
    fn test_unknown_kind_inside_collection() {
        let value = json!({
            "type": "GeometryCollection",
            "geometries": [{"type": "Point", "coordinates": [0, 0]}, {"type": "Envelope"}]
        });
        let err = GeometryObject::from_value(&value).unwrap_err();
        assert!(matches!(err, WmsError::UnsupportedGeometryKind(kind) if kind == "Envelope"));
    }
}
