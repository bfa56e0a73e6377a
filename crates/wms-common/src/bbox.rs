//! Bounding box types and viewport geometry.

use serde::{Deserialize, Serialize};

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing every corner of a flattened `[x0, y0, x1, y1, ...]` ring.
    pub fn enclosing(flat_coords: &[f64]) -> Option<Self> {
        if flat_coords.len() < 2 {
            return None;
        }
        let mut bbox = Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for pair in flat_coords.chunks_exact(2) {
            bbox.min_x = bbox.min_x.min(pair[0]);
            bbox.min_y = bbox.min_y.min(pair[1]);
            bbox.max_x = bbox.max_x.max(pair[0]);
            bbox.max_y = bbox.max_y.max(pair[1]);
        }
        Some(bbox)
    }

    /// Format as a WMS 1.1.1 BBOX value (x/y axis order).
    pub fn to_wms_string(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Format as a WMS 1.3.0 EPSG:4326 BBOX value, which uses lat/lon axis order.
    pub fn to_wms13_geographic_string(&self) -> String {
        format!("{},{},{},{}", self.min_y, self.min_x, self.max_y, self.max_x)
    }

}

/// Corners of a rotated viewport as a closed ring `[x0, y0, ..., x3, y3, x0, y0]`.
///
/// `resolution` is map units per pixel, `rotation` is in radians and `size`
/// is the viewport size in pixels.
pub fn rotated_viewport(
    center: [f64; 2],
    resolution: f64,
    rotation: f64,
    size: [f64; 2],
) -> [f64; 10] {
    let dx = (resolution * size[0]) / 2.0;
    let dy = (resolution * size[1]) / 2.0;
    let (sin_rotation, cos_rotation) = rotation.sin_cos();
    let x_cos = dx * cos_rotation;
    let x_sin = dx * sin_rotation;
    let y_cos = dy * cos_rotation;
    let y_sin = dy * sin_rotation;
    let [x, y] = center;
    [
        x - x_cos + y_sin,
        y - x_sin - y_cos,
        x - x_cos - y_sin,
        y - x_sin + y_cos,
        x + x_cos - y_sin,
        y + x_sin + y_cos,
        x + x_cos + y_sin,
        y + x_sin - y_cos,
        x - x_cos + y_sin,
        y - x_sin - y_cos,
    ]
}
