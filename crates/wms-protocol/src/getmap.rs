//! WMS 1.1.1 GetMap tile URL templates.

use wms_common::{BoundingBox, WmsResult};

use crate::request::build_url;

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

/// Placeholder the host tiling engine replaces with each tile's extent.
pub const BBOX_TEMPLATE: &str = "{bbox-epsg-3857}";

/// Style name that tells the server to use the inline `sld_body`.
pub const SLD_STYLE_NAME: &str = "style_sld_body";

/// Parameters of a GetMap tile request.
#[derive(Debug, Clone, Default)]
pub struct GetMapRequest {
    pub layer: String,
    pub cql_filter: Option<String>,
    pub sld_body: Option<String>,
}

impl GetMapRequest {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            ..Default::default()
        }
    }

    pub fn with_cql_filter(mut self, cql_filter: Option<String>) -> Self {
        self.cql_filter = cql_filter;
        self
    }

    pub fn with_sld_body(mut self, sld_body: Option<String>) -> Self {
        self.sld_body = sld_body;
        self
    }

    /// Query parameters, excluding the bbox.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "image/png".to_string()),
            ("service", "WMS".to_string()),
            ("version", "1.1.1".to_string()),
            ("request", "GetMap".to_string()),
            ("srs", "EPSG:3857".to_string()),
            ("transparent", "true".to_string()),
            ("width", TILE_SIZE.to_string()),
            ("height", TILE_SIZE.to_string()),
            ("layers", self.layer.clone()),
        ];
        if let Some(sld) = &self.sld_body {
            params.push(("style", SLD_STYLE_NAME.to_string()));
            params.push(("sld_body", sld.clone()));
        }
        if let Some(cql) = self.cql_filter.as_ref().filter(|c| !c.is_empty()) {
            params.push(("cql_filter", cql.clone()));
        }
        params
    }

    /// Tile URL with the bbox left as [`BBOX_TEMPLATE`]. The placeholder is
    /// appended verbatim so it survives query encoding.
    pub fn tile_url_template(&self, base_url: &str) -> WmsResult<String> {
        let url = build_url(base_url, &self.params())?;
        Ok(format!("{}&bbox={}", url, BBOX_TEMPLATE))
    }
}

/// Fill the bbox placeholder of a tile template with a concrete extent.
pub fn substitute_bbox(template: &str, bbox: &BoundingBox) -> String {
    template.replace(BBOX_TEMPLATE, &bbox.to_wms_string())
}
