//! HTTP client for OGC discovery and click queries.
//!
//! Every request is a single GET. There are no retries: a transport
//! failure or an HTTP status of 400 and above becomes
//! `WmsError::ServiceUnreachable`, for the caller to surface.

use reqwest::Client;
use tracing::{debug, instrument, warn};
use wms_common::{WfsColumn, WmsError, WmsResult};
use wms_protocol::capabilities::capabilities_params;
use wms_protocol::describe::{describe_feature_type_params, describe_layer_params};
use wms_protocol::{
    build_url, parse_capabilities, parse_describe_layer, parse_feature_info_text,
    parse_feature_type, FeatureGroup, FeatureInfoRequest, ServiceCapabilities,
};

use crate::config::ClientConfig;
use crate::metrics;

#[derive(Debug, Clone)]
pub struct OgcClient {
    client: Client,
}

impl OgcClient {
    pub fn new(config: &ClientConfig) -> WmsResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| WmsError::InternalError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn get_text(
        &self,
        operation: &'static str,
        base_url: &str,
        params: &[(&str, String)],
    ) -> WmsResult<String> {
        let url = build_url(base_url, params)?;
        metrics::record_ogc_request(operation);
        debug!(operation, url = %url, "Sending OGC request");

        let response = self.client.get(url).send().await.map_err(|e| {
            metrics::record_ogc_error(operation);
            warn!(operation, error = %e, "OGC request failed");
            WmsError::unreachable(base_url, e)
        })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            metrics::record_ogc_error(operation);
            warn!(operation, status = status.as_u16(), "OGC request rejected");
            return Err(WmsError::unreachable(base_url, format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| {
            metrics::record_ogc_error(operation);
            WmsError::unreachable(base_url, e)
        })
    }

    /// Fetch and parse the WMS capabilities of `base_url`.
    #[instrument(skip(self))]
    pub async fn capabilities(&self, base_url: &str) -> WmsResult<ServiceCapabilities> {
        let xml = self
            .get_text("GetCapabilities", base_url, &capabilities_params())
            .await?;
        parse_capabilities(&xml)
    }

    /// WFS endpoint paired with `layer`, falling back to `base_url` when the
    /// server does not name one.
    #[instrument(skip(self))]
    pub async fn wfs_url(&self, base_url: &str, layer: &str) -> WmsResult<String> {
        let xml = self
            .get_text("DescribeLayer", base_url, &describe_layer_params(layer))
            .await?;
        Ok(parse_describe_layer(&xml)?.unwrap_or_else(|| base_url.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn describe_feature_type(
        &self,
        wfs_url: &str,
        layer: &str,
    ) -> WmsResult<Vec<WfsColumn>> {
        let json = self
            .get_text(
                "DescribeFeatureType",
                wfs_url,
                &describe_feature_type_params(layer),
            )
            .await?;
        parse_feature_type(&json)
    }

    /// Run a click query and parse the plain-text response.
    #[instrument(skip(self, request), fields(layer = %request.layer))]
    pub async fn feature_info(
        &self,
        base_url: &str,
        request: &FeatureInfoRequest,
    ) -> WmsResult<Vec<FeatureGroup>> {
        let text = self
            .get_text("GetFeatureInfo", base_url, &request.params())
            .await?;
        Ok(parse_feature_info_text(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use test_utils::fixtures::{CAPABILITIES_XML, DESCRIBE_LAYER_NO_WFS_XML};

    fn client() -> OgcClient {
        OgcClient::new(&ClientConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_capabilities_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/wms")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("request".into(), "GetCapabilities".into()),
                mockito::Matcher::UrlEncoded("version".into(), "1.3.1".into()),
            ]))
            .with_status(200)
            .with_body(CAPABILITIES_XML)
            .create_async()
            .await;

        let caps = client()
            .capabilities(&format!("{}/wms", server.url()))
            .await
            .unwrap();
        assert_eq!(caps.title.as_deref(), Some("Active Mines"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_unreachable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wms")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let base = format!("{}/wms", server.url());
        let err = client().capabilities(&base).await.unwrap_err();
        match err {
            WmsError::ServiceUnreachable { url, reason } => {
                assert_eq!(url, base);
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wfs_url_fallback() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/wms")
            .match_query(mockito::Matcher::UrlEncoded(
                "REQUEST".into(),
                "DescribeLayer".into(),
            ))
            .with_body(DESCRIBE_LAYER_NO_WFS_XML)
            .create_async()
            .await;

        let base = format!("{}/wms", server.url());
        assert_eq!(client().wfs_url(&base, "mineplant").await.unwrap(), base);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Port 9 (discard) is not expected to be listening
        let err = client()
            .capabilities("http://127.0.0.1:9/wms")
            .await
            .unwrap_err();
        assert!(matches!(err, WmsError::ServiceUnreachable { .. }));
        assert!(err.is_user_facing());
    }
}
