//! The persisted configuration of one WMS map layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Style;

/// Type tag written into every descriptor.
pub const SOURCE_TYPE: &str = "WMS_LAYER_SOURCE";

/// WFS `localType` values that can back a time filter.
pub const TIME_COLUMN_TYPES: &[&str] = &["date", "dateTime", "date-time"];

/// WFS `localType` values that can back a spatial filter.
pub const GEO_COLUMN_TYPES: &[&str] = &[
    "PointPropertyType",
    "MultiCurvePropertyType",
    "MultiSurfacePropertyType",
    "MultiPolygon",
    "Point",
    "MultiLineString",
    "Geometry",
    "Polygon",
    "LineString",
    "MultiPoint",
];

pub const POINT_TYPES: &[&str] = &["PointPropertyType", "Point", "MultiPoint"];

pub const POLYGON_TYPES: &[&str] = &[
    "MultiCurvePropertyType",
    "MultiSurfacePropertyType",
    "MultiPolygon",
    "Geometry",
    "Polygon",
];

/// Column metadata reported by WFS `DescribeFeatureType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WfsColumn {
    pub name: String,
    #[serde(default)]
    pub local_type: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default)]
    pub nillable: bool,
    #[serde(default)]
    pub min_occurs: u32,
    #[serde(default = "default_max_occurs")]
    pub max_occurs: u32,
}

fn default_max_occurs() -> u32 {
    1
}

impl WfsColumn {
    pub fn is_time(&self) -> bool {
        TIME_COLUMN_TYPES.contains(&self.local_type.as_str())
    }

    pub fn is_geometry(&self) -> bool {
        GEO_COLUMN_TYPES.contains(&self.local_type.as_str())
    }

    pub fn is_point(&self) -> bool {
        POINT_TYPES.contains(&self.local_type.as_str())
    }

    pub fn is_polygon(&self) -> bool {
        POLYGON_TYPES.contains(&self.local_type.as_str())
    }
}

/// Persisted layer settings.
///
/// Field names follow the host's camelCase persistence format. Unknown
/// fields written by the host are kept in `extra` so a load/save cycle
/// is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: String,
    pub base_url: String,
    pub layer: String,
    pub name: String,
    #[serde(default)]
    pub time_column: String,
    #[serde(default)]
    pub geo_column: String,
    #[serde(default)]
    pub nrt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sld_body: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip_properties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wfs_columns: Option<Vec<WfsColumn>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_source_type() -> String {
    SOURCE_TYPE.to_string()
}

impl SourceDescriptor {
    /// A fresh descriptor for a layer picked in the wizard: no time or
    /// geometry column, not near-real-time.
    pub fn create(
        base_url: impl Into<String>,
        layer: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            source_type: default_source_type(),
            base_url: base_url.into(),
            layer: layer.into(),
            name: name.into(),
            time_column: String::new(),
            geo_column: String::new(),
            nrt: false,
            sld_body: None,
            tooltip_properties: None,
            wfs_columns: None,
            extra: Map::new(),
        }
    }

    /// Point the descriptor at another service or layer.
    ///
    /// Column selections and cached columns belong to the old layer, so
    /// they are cleared together with the near-real-time flag.
    pub fn relocate(&mut self, base_url: impl Into<String>, layer: impl Into<String>) {
        let base_url = base_url.into();
        let layer = layer.into();
        if base_url == self.base_url && layer == self.layer {
            return;
        }
        self.base_url = base_url;
        self.layer = layer;
        self.time_column.clear();
        self.geo_column.clear();
        self.nrt = false;
        self.wfs_columns = None;
    }

    /// Time-aware sources get the host's time slider.
    pub fn is_time_aware(&self) -> bool {
        !self.time_column.is_empty()
    }

    /// Geometry-aware sources accept bounding-box and shape filters.
    pub fn is_geo_aware(&self) -> bool {
        !self.geo_column.is_empty()
    }

    /// Cached columns usable as time columns.
    pub fn time_columns(&self) -> Vec<&WfsColumn> {
        self.columns().filter(|c| c.is_time()).collect()
    }

    /// Cached columns usable as geometry columns.
    pub fn geo_columns(&self) -> Vec<&WfsColumn> {
        self.columns().filter(|c| c.is_geometry()).collect()
    }

    /// `(name, localType)` pairs for every cached column, the host's field list.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        self.columns()
            .map(|c| (c.name.as_str(), c.local_type.as_str()))
            .collect()
    }

    fn columns(&self) -> impl Iterator<Item = &WfsColumn> {
        self.wfs_columns.iter().flatten()
    }
}
