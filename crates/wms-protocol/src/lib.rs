//! OGC WMS/WFS protocol support for the WMS layer source.
//!
//! Supports:
//! - WMS 1.1.1 `GetMap` tile templates and WMS 1.3.0 `GetFeatureInfo` click queries
//! - `GetCapabilities` and `DescribeLayer` discovery (XML)
//! - WFS 2.0.0 `DescribeFeatureType` column discovery (JSON)
//! - SLD 1.0 serialization of client-side styles

pub mod capabilities;
pub mod describe;
pub mod getfeatureinfo;
pub mod getmap;
pub mod request;
pub mod sld;

pub use capabilities::{parse_capabilities, LayerInfo, ServiceCapabilities};
pub use describe::{parse_describe_layer, parse_feature_type};
pub use getfeatureinfo::{
    click_bbox, parse_feature_info_text, FeatureGroup, FeatureInfoRequest, KeyPair, INFO_FORMAT,
};
pub use getmap::{substitute_bbox, GetMapRequest, BBOX_TEMPLATE, TILE_SIZE};
pub use request::{build_url, query_params};
pub use sld::write_sld;
