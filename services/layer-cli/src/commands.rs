//! Subcommand implementations. Results go to stdout as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use cql_filter::SourceQuery;
use layer_source::{
    build_tile_url, discover_layer_schema, discover_services, DataRequestMeta, OgcClient,
    PluginConfig, Tooltip,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use wms_common::{SourceDescriptor, Style, TimeRange, WmsError};
use wms_protocol::{click_bbox, FeatureInfoRequest};

#[derive(Args, Debug)]
pub struct TileUrlArgs {
    /// Saved source descriptor (JSON). Overrides --url and --layer.
    #[arg(long)]
    pub descriptor: Option<PathBuf>,
    #[arg(long, required_unless_present = "descriptor")]
    pub url: Option<String>,
    #[arg(long, required_unless_present = "descriptor")]
    pub layer: Option<String>,
    #[arg(long)]
    pub geo_column: Option<String>,
    #[arg(long)]
    pub time_column: Option<String>,
    /// Request metadata (JSON): filters, sourceQuery, timeslice, timeFilters
    #[arg(long)]
    pub meta: Option<PathBuf>,
    /// Free-text query, replacing any in --meta
    #[arg(long)]
    pub query: Option<String>,
    /// Time range start, absolute or date math (`now-1d`)
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Style (JSON) sent as `sld_body`
    #[arg(long)]
    pub style: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FeatureInfoArgs {
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub layer: String,
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    /// Degrees per pixel at the click
    #[arg(long, default_value = "0.001")]
    pub resolution: f64,
    /// Filter of the displayed tiles
    #[arg(long)]
    pub cql: Option<String>,
    /// Properties to show, in order; repeat for several
    #[arg(long = "field")]
    pub fields: Vec<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a user-facing error as a `notification` object on stdout, the
/// way a map host shows a toast. Anything else fails the command.
fn notify_or_fail(err: WmsError) -> Result<()> {
    if !err.is_user_facing() {
        return Err(err.into());
    }
    warn!(error = %err, "Request failed");
    print_json(&json!({ "notification": err.to_string() }))
}

pub async fn discover(client: &OgcClient, config: &PluginConfig, urls: Vec<String>) -> Result<()> {
    let urls = if urls.is_empty() {
        config.urls.clone()
    } else {
        urls
    };

    let mut output = Vec::new();
    for (url, result) in discover_services(client, &urls).await {
        output.push(match result {
            Ok(entry) => serde_json::to_value(entry)?,
            Err(e) if e.is_user_facing() => {
                warn!(url = %url, error = %e, "Service skipped");
                json!({ "baseUrl": url, "error": e.to_string() })
            }
            Err(e) => return Err(e.into()),
        });
    }
    print_json(&output)
}

pub async fn columns(client: &OgcClient, url: &str, layer: &str) -> Result<()> {
    let schema = discover_layer_schema(client, url, layer).await?;
    let names = |columns: Vec<&wms_common::WfsColumn>| -> Vec<String> {
        columns.into_iter().map(|c| c.name.clone()).collect()
    };
    let time_columns = names(schema.time_columns());
    let geo_columns = names(schema.geo_columns());
    print_json(&json!({
        "wfsUrl": schema.wfs_url,
        "timeColumns": time_columns,
        "geoColumns": geo_columns,
        "columns": schema.columns,
    }))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn descriptor_from_args(args: &TileUrlArgs) -> Result<SourceDescriptor> {
    let mut descriptor = match &args.descriptor {
        Some(path) => read_json(path)?,
        None => {
            let url = args.url.as_deref().context("--url is required")?;
            let layer = args.layer.as_deref().context("--layer is required")?;
            SourceDescriptor::create(url, layer, layer)
        }
    };
    if let Some(geo_column) = &args.geo_column {
        descriptor.geo_column = geo_column.clone();
    }
    if let Some(time_column) = &args.time_column {
        descriptor.time_column = time_column.clone();
    }
    if let Some(path) = &args.style {
        let style: Style = read_json(path)?;
        style.validate()?;
        descriptor.sld_body = Some(style);
    }
    Ok(descriptor)
}

pub fn tile_url(args: &TileUrlArgs) -> Result<()> {
    let descriptor = descriptor_from_args(args)?;
    let mut meta: DataRequestMeta = match &args.meta {
        Some(path) => read_json(path)?,
        None => DataRequestMeta::default(),
    };
    if let Some(query) = &args.query {
        meta.source_query = Some(SourceQuery::kuery(query.as_str()));
    }
    if let (Some(from), Some(to)) = (&args.from, &args.to) {
        meta.time_filters = Some(TimeRange::new(from.as_str(), to.as_str()));
    }

    let url = build_tile_url(&descriptor, &meta, chrono::Utc::now())?;
    println!("{}", url);
    Ok(())
}

pub async fn feature_info(client: &OgcClient, args: &FeatureInfoArgs) -> Result<()> {
    let bbox = click_bbox(args.lng, args.lat, args.resolution);
    let request = FeatureInfoRequest::new(args.layer.as_str(), bbox).with_cql_filter(args.cql.clone());
    let groups = match client.feature_info(&args.url, &request).await {
        Ok(groups) => groups,
        Err(e) => return notify_or_fail(e),
    };
    info!(features = groups.len(), "Feature info received");

    let Some(group) = groups.first() else {
        return notify_or_fail(WmsError::NoDataFound(format!(
            "No features of {} at point",
            args.layer
        )));
    };
    print_json(&Tooltip::from_group(&args.layer, group, Some(args.fields.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use layer_source::ClientConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tile_args() -> TileUrlArgs {
        TileUrlArgs {
            descriptor: None,
            url: Some("https://x/wms".into()),
            layer: Some("mineplant".into()),
            geo_column: None,
            time_column: None,
            meta: None,
            query: None,
            from: None,
            to: None,
            style: None,
        }
    }

    #[test]
    fn test_descriptor_from_flags() {
        let mut args = tile_args();
        args.geo_column = Some("geom".into());
        let descriptor = descriptor_from_args(&args).unwrap();
        assert_eq!(descriptor.layer, "mineplant");
        assert_eq!(descriptor.geo_column, "geom");
        assert!(!descriptor.nrt);
    }

    #[test]
    fn test_descriptor_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "WMS_LAYER_SOURCE", "baseUrl": "https://y/wms", "layer": "roads", "name": "Roads", "timeColumn": "t", "id": "abc"}}"#
        )
        .unwrap();
        let mut args = tile_args();
        args.descriptor = Some(file.path().to_path_buf());

        let descriptor = descriptor_from_args(&args).unwrap();
        assert_eq!(descriptor.base_url, "https://y/wms");
        assert_eq!(descriptor.time_column, "t");
        assert_eq!(descriptor.extra.get("id"), Some(&json!("abc")));
    }

    #[test]
    fn test_user_facing_errors_become_notifications() {
        assert!(notify_or_fail(WmsError::NoDataFound("nothing here".into())).is_ok());
        assert!(notify_or_fail(WmsError::unreachable("https://x/wms", "HTTP 503")).is_ok());
        assert!(notify_or_fail(WmsError::UnsupportedGeometryKind("Circle".into())).is_err());
    }

    #[test]
    fn test_unreachable_feature_info_is_notified() {
        let client = OgcClient::new(&ClientConfig {
            request_timeout: std::time::Duration::from_secs(2),
            ..ClientConfig::default()
        })
        .unwrap();
        let args = FeatureInfoArgs {
            url: "http://127.0.0.1:1/wms".into(),
            layer: "mineplant".into(),
            lng: -91.0,
            lat: 37.0,
            resolution: 0.001,
            cql: None,
            fields: vec![],
        };
        assert!(tokio_test::block_on(feature_info(&client, &args)).is_ok());
    }

    #[test]
    fn test_bad_discover_url_fails_command() {
        let client = OgcClient::new(&ClientConfig::default()).unwrap();
        let config = PluginConfig::default();
        let result = tokio_test::block_on(discover(&client, &config, vec!["not a url".into()]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_style_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "s", "rules": [{{"name": "r", "symbolizers": [{{"kind": "Fill", "color": "red"}}]}}]}}"#
        )
        .unwrap();
        let mut args = tile_args();
        args.style = Some(file.path().to_path_buf());
        assert!(descriptor_from_args(&args).is_err());
    }
}
