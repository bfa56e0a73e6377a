//! The WMS layer source.
//!
//! [`build_tile_url`] turns a descriptor and the host's request metadata
//! into a GetMap tile template. [`WmsSource`] wraps one descriptor for the
//! lifetime of a source on a map: it answers staleness checks, remembers the
//! filter of the tiles on screen and answers clicks with tooltips.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cql_filter::{
    extract_geo_cql, extract_kuery_cql, extract_time_cql, join_fragments, parse_cql, CqlFragment,
};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;
use wms_common::time::resolve_time_bounds;
use wms_common::{SourceDescriptor, WmsError, WmsResult};
use wms_protocol::{click_bbox, query_params, write_sld, FeatureInfoRequest, GetMapRequest};

use crate::client::OgcClient;
use crate::context::{ClickEvent, ClickHandler, MapContext, MapHandle};
use crate::metrics;
use crate::staleness::{self, DataRequestMeta};
use crate::tooltip::Tooltip;

/// Build the GetMap tile URL template for `descriptor` under `meta`.
///
/// Fragments are joined in a fixed order: spatial filters, the time window,
/// then the free-text query. `now` anchors relative time ranges.
pub fn build_tile_url(
    descriptor: &SourceDescriptor,
    meta: &DataRequestMeta,
    now: DateTime<Utc>,
) -> WmsResult<String> {
    let mut fragments = extract_geo_cql(&meta.filters, &descriptor.geo_column)?;

    let (start, stop) =
        resolve_time_bounds(meta.timeslice.as_ref(), meta.time_filters.as_ref(), now);
    fragments.extend(extract_time_cql(
        &descriptor.time_column,
        start.as_deref(),
        stop.as_deref(),
    ));

    if let Some(query) = &meta.source_query {
        fragments.extend(extract_kuery_cql(query)?);
    }

    let sld_body = descriptor
        .sld_body
        .as_ref()
        .map(|style| write_sld(&descriptor.layer, style))
        .transpose()?;

    let cql_filter = join_fragments(&fragments);
    debug!(
        layer = %descriptor.layer,
        fragments = fragments.len(),
        styled = sld_body.is_some(),
        "Built tile URL"
    );

    GetMapRequest::new(descriptor.layer.as_str())
        .with_cql_filter(cql_filter)
        .with_sld_body(sld_body)
        .tile_url_template(&descriptor.base_url)
}

/// One WMS source on one map.
pub struct WmsSource {
    id: String,
    descriptor: SourceDescriptor,
    client: OgcClient,
    /// `cql_filter` of the tiles currently displayed.
    cql_filter: Mutex<Option<String>>,
}

impl WmsSource {
    /// The source id is taken from the descriptor's `id` field when the host
    /// saved one, otherwise a new one is generated.
    pub fn new(descriptor: SourceDescriptor, client: OgcClient) -> Self {
        let id = descriptor
            .extra
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self::with_id(id, descriptor, client)
    }

    pub fn with_id(id: impl Into<String>, descriptor: SourceDescriptor, client: OgcClient) -> Self {
        Self {
            id: id.into(),
            descriptor,
            client,
            cql_filter: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// Last non-empty `cql_filter` seen on a compared tile URL.
    pub fn last_cql_filter(&self) -> Option<String> {
        self.cql_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn tile_url_template(&self, meta: &DataRequestMeta) -> WmsResult<String> {
        build_tile_url(&self.descriptor, meta, Utc::now())
    }

    /// Whether the tiles on the map must be re-requested.
    ///
    /// Also registers the source for click queries on `ctx`, since the
    /// host runs this check as soon as the source is on the map.
    pub fn is_stale(
        self: &Arc<Self>,
        ctx: &MapContext,
        previous_url: Option<&str>,
        current_url: &str,
        tiles_loaded: bool,
    ) -> WmsResult<bool> {
        if !ctx.is_registered(&self.id) {
            ctx.register_click_handler(&self.id, Arc::clone(self) as Arc<dyn ClickHandler>);
        }

        let check = staleness::check_staleness(
            ctx,
            &self.id,
            &self.descriptor,
            previous_url,
            current_url,
            tiles_loaded,
            Instant::now(),
        )?;
        if let Some(cql) = check.cql_filter {
            *self
                .cql_filter
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(cql);
        }
        if check.stale {
            metrics::record_refetch(&self.id);
        }
        Ok(check.stale)
    }

    /// Whether the tile URL built for `previous` can be reused for `next`.
    /// The stored fragments are recovered from `previous_url`.
    pub fn can_skip_source_update(
        &self,
        previous: Option<&DataRequestMeta>,
        next: &DataRequestMeta,
        previous_url: Option<&str>,
    ) -> WmsResult<bool> {
        let fragments: Vec<CqlFragment> = match previous_url {
            Some(url) => query_params(url)?
                .get("cql_filter")
                .map(|cql| parse_cql(cql))
                .unwrap_or_default(),
            None => Vec::new(),
        };
        staleness::can_skip_source_update(&self.descriptor, previous, next, &fragments)
    }
}

#[async_trait]
impl ClickHandler for WmsSource {
    #[instrument(skip(self, map), fields(source_id = %self.id, layer = %self.descriptor.layer))]
    async fn on_click(&self, map: &dyn MapHandle, click: &ClickEvent) -> WmsResult<Tooltip> {
        let [lng, lat] = click.lng_lat;
        let bbox = click_bbox(lng, lat, click.resolution(map));
        let request = FeatureInfoRequest::new(self.descriptor.layer.as_str(), bbox)
            .with_cql_filter(self.last_cql_filter());

        let groups = self
            .client
            .feature_info(&self.descriptor.base_url, &request)
            .await?;
        let group = groups.first().ok_or_else(|| {
            WmsError::NoDataFound(format!("No features of {} at click", self.descriptor.layer))
        })?;

        Ok(Tooltip::from_group(
            &self.descriptor.name,
            group,
            self.descriptor.tooltip_properties.as_deref(),
        ))
    }

    fn on_remove(&self) {
        debug!(source_id = %self.id, "Source unregistered");
        *self
            .cql_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
