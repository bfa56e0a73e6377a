//! WMS GetFeatureInfo handling
//!
//! Builds WMS 1.3.0 GetFeatureInfo requests for map clicks and parses the
//! plain-text response format into attribute groups, one per feature.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wms_common::{rotated_viewport, BoundingBox, WmsResult};

use crate::request::build_url;

/// Width and height of the virtual map a click query is made against.
pub const CLICK_SIZE: u32 = 101;

/// Pixel position of the click inside the virtual map (its center).
pub const CLICK_PIXEL: u32 = 50;

/// Search tolerance around the click pixel, in pixels.
pub const CLICK_RADIUS: u32 = 10;

/// Response format requested from the server: GeoServer's `key = value`
/// listing, the one `parse_feature_info_text` reads.
pub const INFO_FORMAT: &str = "text/plain";

/// Click query against one layer.
#[derive(Debug, Clone)]
pub struct FeatureInfoRequest {
    pub layer: String,
    /// Extent of the virtual map in EPSG:4326.
    pub bbox: BoundingBox,
    /// Filter of the tiles currently displayed, so the query only hits
    /// visible features.
    pub cql_filter: Option<String>,
}

impl FeatureInfoRequest {
    pub fn new(layer: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            layer: layer.into(),
            bbox,
            cql_filter: None,
        }
    }

    pub fn with_cql_filter(mut self, cql_filter: Option<String>) -> Self {
        self.cql_filter = cql_filter.filter(|c| !c.is_empty());
        self
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "image/png".to_string()),
            ("service", "WMS".to_string()),
            ("version", "1.3.0".to_string()),
            ("request", "GetFeatureInfo".to_string()),
            ("crs", "EPSG:4326".to_string()),
            ("transparent", "true".to_string()),
            ("width", CLICK_SIZE.to_string()),
            ("height", CLICK_SIZE.to_string()),
            ("info_format", INFO_FORMAT.to_string()),
            ("i", CLICK_PIXEL.to_string()),
            ("j", CLICK_PIXEL.to_string()),
            ("radius", CLICK_RADIUS.to_string()),
            ("buffer", CLICK_RADIUS.to_string()),
            ("layers", self.layer.clone()),
            ("query_layers", self.layer.clone()),
            // WMS 1.3.0 with EPSG:4326 uses lat/lon axis order
            ("bbox", self.bbox.to_wms13_geographic_string()),
        ];
        if let Some(cql) = &self.cql_filter {
            params.push(("cql_filter", cql.clone()));
        }
        params
    }

    pub fn url(&self, base_url: &str) -> WmsResult<String> {
        Ok(build_url(base_url, &self.params())?.to_string())
    }
}

/// Extent of a `CLICK_SIZE` pixel square centred on a click.
///
/// `resolution` is degrees per pixel at the click, i.e. the longitude
/// difference between the click and the pixel to its left.
pub fn click_bbox(lng: f64, lat: f64, resolution: f64) -> BoundingBox {
    let size = CLICK_SIZE as f64;
    let ring = rotated_viewport([lng, lat], resolution.abs(), 0.0, [size, size]);
    BoundingBox::enclosing(&ring).unwrap_or_else(|| BoundingBox::new(lng, lat, lng, lat))
}

/// One `key = value` line of a feature-info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub key: String,
    pub value: String,
}

impl KeyPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Attributes of one feature, in response order.
pub type FeatureGroup = Vec<KeyPair>;

fn key_pair_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\w+)\s*=\s*(.*)").expect("key pair pattern is valid"))
}

/// Parse GeoServer's plain-text feature-info output.
///
/// Lines before the first `key = value` line are a header and ignored.
/// After that, any line without `=` closes the current group. A final
/// group without a closing line is kept, and empty groups are dropped.
pub fn parse_feature_info_text(text: &str) -> Vec<FeatureGroup> {
    let mut groups = Vec::new();
    let mut current = FeatureGroup::new();
    let mut in_body = false;

    for line in text.lines() {
        if line.contains('=') {
            in_body = true;
            if let Some(caps) = key_pair_pattern().captures(line) {
                current.push(KeyPair::new(caps[1].trim(), unquote(caps[2].trim())));
            }
        } else if in_body && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    debug!(groups = groups.len(), "Parsed feature info");
    groups
}

fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::query_params;
    use test_utils::assert_approx_eq;
    use test_utils::fixtures::FEATURE_INFO_TEXT;

    #[test]
    fn test_click_bbox() {
        let bbox = click_bbox(10.0, 20.0, 0.01);
        assert_approx_eq!(bbox.min_x, 9.495, 1e-9);
        assert_approx_eq!(bbox.max_x, 10.505, 1e-9);
        assert_approx_eq!(bbox.min_y, 19.495, 1e-9);
        assert_approx_eq!(bbox.max_y, 20.505, 1e-9);
    }

    #[test]
    fn test_request_params() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let url = FeatureInfoRequest::new("mineplant", bbox)
            .with_cql_filter(Some("(a='1')".into()))
            .url("https://x/wms")
            .unwrap();
        let params = query_params(&url).unwrap();
        assert_eq!(params["request"], "GetFeatureInfo");
        assert_eq!(params["version"], "1.3.0");
        assert_eq!(params["bbox"], "2,1,4,3");
        assert_eq!(params["query_layers"], "mineplant");
        assert_eq!(params["i"], "50");
        assert_eq!(params["info_format"], "text/plain");
        assert_eq!(params["cql_filter"], "(a='1')");
    }

    #[test]
    fn test_empty_filter_not_sent() {
        let request = FeatureInfoRequest::new("a", BoundingBox::new(0.0, 0.0, 1.0, 1.0))
            .with_cql_filter(Some(String::new()));
        assert!(request.params().iter().all(|(k, _)| *k != "cql_filter"));
    }

    #[test]
    fn test_parse_groups() {
        let groups = parse_feature_info_text(FEATURE_INFO_TEXT);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][1], KeyPair::new("site_name", "Eagle Mine"));
        assert_eq!(groups[0][2], KeyPair::new("commodity", "Nickel"));
        assert_eq!(groups[1][1], KeyPair::new("site_name", "Red Dog"));
    }

    #[test]
    fn test_parse_without_closing_line() {
        let groups = parse_feature_info_text("header\na = 1\nb = \"two\"");
        assert_eq!(
            groups,
            vec![vec![KeyPair::new("a", "1"), KeyPair::new("b", "two")]]
        );
    }

    #[test]
    fn test_parse_no_features() {
        assert!(parse_feature_info_text("no features were found\n").is_empty());
        assert!(parse_feature_info_text("").is_empty());
    }
}
