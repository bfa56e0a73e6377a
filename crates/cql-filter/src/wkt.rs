//! GeoJSON to Well-Known-Text encoding.
//!
//! Dimensionality is decided from the first vertex only; a 3-component
//! vertex switches the whole geometry to the `Z` form.

use serde_json::Value;
use wms_common::{GeometryObject, Position, WmsResult};

/// Encode a geometry as WKT. Feature wrappers are unwrapped first.
pub fn to_wkt(geometry: &GeometryObject) -> String {
    match geometry.unwrap_feature() {
        GeometryObject::Point { coordinates } => {
            tagged("POINT", is_3d(Some(coordinates)), pair(coordinates))
        }
        GeometryObject::LineString { coordinates } => {
            tagged("LINESTRING", is_3d(coordinates.first()), ring(coordinates))
        }
        GeometryObject::MultiPoint { coordinates } => {
            tagged("MULTIPOINT", is_3d(coordinates.first()), ring(coordinates))
        }
        GeometryObject::Polygon { coordinates } => tagged(
            "POLYGON",
            is_3d(coordinates.first().and_then(|r| r.first())),
            rings(coordinates),
        ),
        GeometryObject::MultiLineString { coordinates } => tagged(
            "MULTILINESTRING",
            is_3d(coordinates.first().and_then(|r| r.first())),
            rings(coordinates),
        ),
        GeometryObject::MultiPolygon { coordinates } => tagged(
            "MULTIPOLYGON",
            is_3d(
                coordinates
                    .first()
                    .and_then(|p| p.first())
                    .and_then(|r| r.first()),
            ),
            multi_rings(coordinates),
        ),
        GeometryObject::GeometryCollection { geometries } => {
            let members: Vec<String> = geometries.iter().map(to_wkt).collect();
            format!("GEOMETRYCOLLECTION ({})", members.join(", "))
        }
        // unwrap_feature never returns a Feature
        GeometryObject::Feature { geometry } => to_wkt(geometry),
    }
}

/// Decode untyped GeoJSON and encode it as WKT.
///
/// Fails with `UnsupportedGeometryKind` for any unknown type tag.
pub fn value_to_wkt(value: &Value) -> WmsResult<String> {
    Ok(to_wkt(&GeometryObject::from_value(value)?))
}

fn tagged(kind: &str, three_d: bool, body: String) -> String {
    if three_d {
        format!("{} Z ({})", kind, body)
    } else {
        format!("{} ({})", kind, body)
    }
}

fn is_3d(first: Option<&Position>) -> bool {
    first.map_or(false, |p| p.len() == 3)
}

fn number(n: f64) -> String {
    if n == 0.0 {
        // avoid "-0"
        "0".to_string()
    } else {
        n.to_string()
    }
}

fn pair(position: &Position) -> String {
    position
        .iter()
        .map(|n| number(*n))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ring(positions: &[Position]) -> String {
    positions.iter().map(pair).collect::<Vec<_>>().join(", ")
}

fn rings(rs: &[Vec<Position>]) -> String {
    rs.iter()
        .map(|r| format!("({})", ring(r)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn multi_rings(polygons: &[Vec<Vec<Position>>]) -> String {
    polygons
        .iter()
        .map(|p| format!("({})", rings(p)))
        .collect::<Vec<_>>()
        .join(", ")
}
