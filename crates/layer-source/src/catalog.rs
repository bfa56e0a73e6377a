//! Service, layer and column discovery for the layer wizard.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};
use wms_common::{SourceDescriptor, WfsColumn, WmsResult};
use wms_protocol::LayerInfo;

use crate::client::OgcClient;

/// A WMS service and the layers it offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub title: String,
    pub base_url: String,
    /// WFS endpoint paired with the service's first layer.
    pub wfs_url: String,
    pub layers: Vec<LayerInfo>,
}

/// Columns of one layer, as described by its WFS endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSchema {
    pub wfs_url: String,
    pub columns: Vec<WfsColumn>,
}

impl LayerSchema {
    /// Columns usable as the time column.
    pub fn time_columns(&self) -> Vec<&WfsColumn> {
        self.columns.iter().filter(|c| c.is_time()).collect()
    }

    /// Columns usable as the geometry column.
    pub fn geo_columns(&self) -> Vec<&WfsColumn> {
        self.columns.iter().filter(|c| c.is_geometry()).collect()
    }

    /// Cache the columns on `descriptor`.
    pub fn apply(&self, descriptor: &mut SourceDescriptor) {
        descriptor.wfs_columns = Some(self.columns.clone());
    }
}

/// Discover one service: capabilities, then the WFS pairing of its first
/// layer. The title falls back to `base_url`.
#[instrument(skip(client))]
pub async fn discover_service(client: &OgcClient, base_url: &str) -> WmsResult<ServiceEntry> {
    let capabilities = client.capabilities(base_url).await?;
    let wfs_url = match capabilities.layers.first() {
        Some(layer) => client.wfs_url(base_url, &layer.name).await?,
        None => base_url.to_string(),
    };

    let entry = ServiceEntry {
        title: capabilities.title_or(base_url).to_string(),
        base_url: base_url.to_string(),
        wfs_url,
        layers: capabilities.layers,
    };
    info!(
        title = %entry.title,
        layers = entry.layers.len(),
        "Discovered service"
    );
    Ok(entry)
}

/// Discover every service in `urls` concurrently.
///
/// Results keep the order of `urls`. An unreachable service only fails its
/// own entry.
pub async fn discover_services(
    client: &OgcClient,
    urls: &[String],
) -> Vec<(String, WmsResult<ServiceEntry>)> {
    let results = join_all(urls.iter().map(|url| discover_service(client, url))).await;
    urls.iter()
        .cloned()
        .zip(results)
        .inspect(|(url, result)| {
            if let Err(e) = result {
                warn!(url = %url, error = %e, "Service discovery failed");
            }
        })
        .collect()
}

/// Resolve the WFS endpoint of `layer` and describe its columns.
#[instrument(skip(client))]
pub async fn discover_layer_schema(
    client: &OgcClient,
    base_url: &str,
    layer: &str,
) -> WmsResult<LayerSchema> {
    let wfs_url = client.wfs_url(base_url, layer).await?;
    let columns = client.describe_feature_type(&wfs_url, layer).await?;
    Ok(LayerSchema { wfs_url, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use mockito::{Matcher, Server};
    use test_utils::fixtures::{
        CAPABILITIES_UNTITLED_XML, CAPABILITIES_XML, DESCRIBE_FEATURE_TYPE_JSON,
        DESCRIBE_LAYER_NO_WFS_XML,
    };

    fn client() -> OgcClient {
        OgcClient::new(&ClientConfig::default()).unwrap()
    }

    fn request(name: &str) -> Matcher {
        Matcher::AnyOf(vec![
            Matcher::UrlEncoded("request".into(), name.into()),
            Matcher::UrlEncoded("REQUEST".into(), name.into()),
        ])
    }

    #[tokio::test]
    async fn test_discover_service() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wms")
            .match_query(request("GetCapabilities"))
            .with_body(CAPABILITIES_XML)
            .create_async()
            .await;
        let describe = server
            .mock("GET", "/wms")
            .match_query(Matcher::AllOf(vec![
                request("DescribeLayer"),
                Matcher::UrlEncoded("LAYERS".into(), "mineplant".into()),
            ]))
            .with_body(DESCRIBE_LAYER_NO_WFS_XML)
            .create_async()
            .await;

        let base = format!("{}/wms", server.url());
        let entry = discover_service(&client(), &base).await.unwrap();
        assert_eq!(entry.title, "Active Mines");
        assert_eq!(entry.wfs_url, base);
        let names: Vec<&str> = entry.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["mineplant", "smelter"]);
        describe.assert_async().await;
    }

    #[tokio::test]
    async fn test_one_failing_service() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/good")
            .match_query(request("GetCapabilities"))
            .with_body(CAPABILITIES_UNTITLED_XML)
            .create_async()
            .await;
        server
            .mock("GET", "/good")
            .match_query(request("DescribeLayer"))
            .with_body(DESCRIBE_LAYER_NO_WFS_XML)
            .create_async()
            .await;
        server
            .mock("GET", "/bad")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let good = format!("{}/good", server.url());
        let bad = format!("{}/bad", server.url());
        let results = discover_services(&client(), &[bad.clone(), good.clone()]).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, bad);
        assert!(results[0].1.is_err());
        let entry = results[1].1.as_ref().unwrap();
        assert_eq!(entry.title, good);
        assert_eq!(entry.layers[0].title, "Roads");
    }

    #[tokio::test]
    async fn test_layer_schema() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wms")
            .match_query(request("DescribeLayer"))
            .with_body(DESCRIBE_LAYER_NO_WFS_XML)
            .create_async()
            .await;
        server
            .mock("GET", "/wms")
            .match_query(Matcher::AllOf(vec![
                request("DescribeFeatureType"),
                Matcher::UrlEncoded("typeName".into(), "mineplant".into()),
            ]))
            .with_body(DESCRIBE_FEATURE_TYPE_JSON)
            .create_async()
            .await;

        let base = format!("{}/wms", server.url());
        let schema = discover_layer_schema(&client(), &base, "mineplant")
            .await
            .unwrap();
        assert_eq!(schema.wfs_url, base);
        assert!(!schema.time_columns().is_empty());
        assert!(!schema.geo_columns().is_empty());

        let mut descriptor = SourceDescriptor::create(&base, "mineplant", "Mines");
        schema.apply(&mut descriptor);
        assert_eq!(descriptor.wfs_columns.as_ref().map(Vec::len), Some(schema.columns.len()));
    }
}
