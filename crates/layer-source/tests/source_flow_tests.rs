//! A source on a map: tile URL, staleness, then a click answered by the
//! server with the filter of the tiles on screen.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use layer_source::{
    build_tile_url, ClickEvent, ClientConfig, DataRequestMeta, MapContext, MapHandle, OgcClient,
    RefreshPolicy, WmsSource,
};
use mockito::{Matcher, Server};
use test_utils::fixtures::FEATURE_INFO_TEXT;
use wms_common::{SourceDescriptor, WmsError};

#[derive(Default)]
struct TestMap {
    hidden: Mutex<Vec<String>>,
    resets: AtomicUsize,
}

impl MapHandle for TestMap {
    fn has_source(&self, _source_id: &str) -> bool {
        true
    }

    fn layer_visibility(&self, source_id: &str) -> Option<bool> {
        Some(!self.hidden.lock().unwrap().iter().any(|id| id == source_id))
    }

    fn is_drawing(&self) -> bool {
        false
    }

    fn unproject(&self, point: [f64; 2]) -> [f64; 2] {
        [point[0] * 0.001, point[1] * 0.001]
    }

    fn reset_bearing(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn reload_tile_cache(&self, _source_id: &str) {}
}

fn descriptor(base_url: &str) -> SourceDescriptor {
    let mut descriptor = SourceDescriptor::create(base_url, "mineplant", "Mines");
    descriptor.tooltip_properties = Some(vec!["commodity".into(), "site_name".into()]);
    descriptor
}

fn click() -> ClickEvent {
    ClickEvent {
        lng_lat: [-91.1, 37.7],
        point: [400.0, 300.0],
    }
}

#[tokio::test]
async fn test_click_uses_displayed_filter() {
    let mut server = Server::new_async().await;
    let info = server
        .mock("GET", "/wms")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("request".into(), "GetFeatureInfo".into()),
            Matcher::UrlEncoded("query_layers".into(), "mineplant".into()),
            Matcher::UrlEncoded("cql_filter".into(), "(status='open')".into()),
        ]))
        .with_body(FEATURE_INFO_TEXT)
        .create_async()
        .await;

    let base = format!("{}/wms", server.url());
    let map = Arc::new(TestMap::default());
    let ctx = MapContext::new(map.clone(), RefreshPolicy::default());
    let client = OgcClient::new(&ClientConfig::default()).unwrap();
    let source = Arc::new(WmsSource::with_id("mines", descriptor(&base), client));

    let meta: DataRequestMeta = serde_json::from_value(serde_json::json!({
        "sourceQuery": {"query": "status:open", "language": "kuery"}
    }))
    .unwrap();
    let previous = source.tile_url_template(&DataRequestMeta::default()).unwrap();
    let current = build_tile_url(source.descriptor(), &meta, chrono::Utc::now()).unwrap();

    assert!(source.is_stale(&ctx, Some(&previous), &current, true).unwrap());
    assert_eq!(source.last_cql_filter().as_deref(), Some("(status='open')"));

    let results = ctx.dispatch_click(&click()).await;
    assert_eq!(results.len(), 1);
    let tooltip = results[0].as_ref().unwrap();
    assert_eq!(tooltip.name, "Mines");
    let keys: Vec<&str> = tooltip.properties.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["commodity", "site_name"]);
    assert_eq!(tooltip.get("commodity"), Some("Nickel"));
    info.assert_async().await;
}

#[tokio::test]
async fn test_empty_click_response_is_no_data() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/wms")
        .match_query(Matcher::UrlEncoded("request".into(), "GetFeatureInfo".into()))
        .with_body("no features were found\n")
        .create_async()
        .await;

    let base = format!("{}/wms", server.url());
    let ctx = MapContext::new(Arc::new(TestMap::default()), RefreshPolicy::default());
    let client = OgcClient::new(&ClientConfig::default()).unwrap();
    let source = Arc::new(WmsSource::with_id("mines", descriptor(&base), client));
    let url = source.tile_url_template(&DataRequestMeta::default()).unwrap();
    assert!(!source.is_stale(&ctx, Some(&url), &url, true).unwrap());

    let results = ctx.dispatch_click(&click()).await;
    assert!(matches!(results[0], Err(WmsError::NoDataFound(_))));
}

#[tokio::test]
async fn test_unreachable_click_is_user_facing() {
    let ctx = MapContext::new(Arc::new(TestMap::default()), RefreshPolicy::default());
    let client = OgcClient::new(&ClientConfig::default()).unwrap();
    let source = Arc::new(WmsSource::with_id("mines", descriptor("http://127.0.0.1:9/wms"), client));
    let url = source.tile_url_template(&DataRequestMeta::default()).unwrap();
    source.is_stale(&ctx, None, &url, true).unwrap();

    let results = ctx.dispatch_click(&click()).await;
    let err = results[0].as_ref().unwrap_err();
    assert!(matches!(err, WmsError::ServiceUnreachable { .. }));
    assert!(err.is_user_facing());
}

#[tokio::test]
async fn test_hidden_source_gets_no_click() {
    let map = Arc::new(TestMap::default());
    map.hidden.lock().unwrap().push("mines".into());
    let ctx = MapContext::new(map.clone(), RefreshPolicy::default());
    let client = OgcClient::new(&ClientConfig::default()).unwrap();
    let source = Arc::new(WmsSource::with_id("mines", descriptor("http://127.0.0.1:9/wms"), client));
    let url = source.tile_url_template(&DataRequestMeta::default()).unwrap();
    source.is_stale(&ctx, None, &url, true).unwrap();

    assert!(ctx.dispatch_click(&click()).await.is_empty());
    assert!(ctx.is_registered("mines"));
}
