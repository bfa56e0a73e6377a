//! WMS map-layer source.
//!
//! Ties the filter synthesis and protocol crates into a layer source a map
//! host can drive:
//! - tile URL templates with CQL filters, time bounds and inline SLD
//! - staleness checks and near-real-time refresh per map instance
//! - service, layer and column discovery over HTTP
//! - click queries rendered as tooltips

pub mod catalog;
pub mod client;
pub mod config;
pub mod context;
pub mod metrics;
pub mod source;
pub mod staleness;
pub mod tooltip;

pub use catalog::{discover_layer_schema, discover_services, LayerSchema, ServiceEntry};
pub use client::OgcClient;
pub use config::{ClientConfig, PluginConfig, RefreshPolicy};
pub use context::{ClickEvent, ClickHandler, MapContext, MapHandle};
pub use source::{build_tile_url, WmsSource};
pub use staleness::{can_skip_source_update, check_staleness, DataRequestMeta, StaleCheck};
pub use tooltip::Tooltip;
