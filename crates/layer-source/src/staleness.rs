//! Deciding when a rendered tile source must be rebuilt.
//!
//! Two checks run against every host update:
//! - [`check_staleness`] compares the tile URL on the map with the freshly
//!   built one, and drives the refresh cycle of near-real-time sources.
//! - [`can_skip_source_update`] compares request metadata and the spatial
//!   fragments of the previous filter to avoid rebuilding the URL at all.

use std::time::Instant;

use cql_filter::{extract_geo_cql, CqlFragment, FilterDescriptor, SourceQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wms_common::{SourceDescriptor, TimeRange, Timeslice, WmsResult};
use wms_protocol::query_params;

use crate::context::MapContext;
use crate::metrics;

/// The host state a tile URL is derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataRequestMeta {
    pub filters: Vec<FilterDescriptor>,
    pub source_query: Option<SourceQuery>,
    pub timeslice: Option<Timeslice>,
    pub time_filters: Option<TimeRange>,
}

/// Outcome of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleCheck {
    pub stale: bool,
    /// Non-empty `cql_filter` of the current URL, when the URLs were compared.
    pub cql_filter: Option<String>,
}

impl StaleCheck {
    fn verdict(stale: bool) -> Self {
        Self {
            stale,
            cql_filter: None,
        }
    }
}

/// Whether the source's tiles must be re-requested.
///
/// Near-real-time sources refresh on the context's interval once all tiles
/// have loaded, and arm the map nudge that brings the next check around.
/// Other sources are stale exactly when the query parameters of the two
/// URLs differ.
pub fn check_staleness(
    ctx: &MapContext,
    source_id: &str,
    descriptor: &SourceDescriptor,
    previous_url: Option<&str>,
    current_url: &str,
    tiles_loaded: bool,
    now: Instant,
) -> WmsResult<StaleCheck> {
    metrics::record_stale_check(source_id);

    if descriptor.nrt {
        ctx.arm_nudge();
        if !tiles_loaded {
            return Ok(StaleCheck::verdict(false));
        }
        return Ok(match ctx.last_refresh(source_id) {
            None => {
                ctx.record_refresh(source_id, now);
                debug!(source_id = %source_id, "First live refresh");
                StaleCheck::verdict(true)
            }
            Some(last) if now.saturating_duration_since(last) >= ctx.policy().refresh_interval => {
                ctx.record_refresh(source_id, now);
                ctx.map().reload_tile_cache(source_id);
                metrics::record_refresh(source_id);
                info!(source_id = %source_id, "Live refresh");
                StaleCheck::verdict(true)
            }
            Some(_) => StaleCheck::verdict(false),
        });
    }

    let Some(previous_url) = previous_url else {
        return Ok(StaleCheck::verdict(false));
    };

    let current = query_params(current_url)?;
    let previous = query_params(previous_url)?;
    let cql_filter = current
        .get("cql_filter")
        .filter(|cql| !cql.is_empty())
        .cloned();
    let stale = current != previous;
    if stale {
        debug!(source_id = %source_id, "Stale, rebuilding URL template");
    }
    Ok(StaleCheck { stale, cql_filter })
}

/// Whether the tile URL built for `previous` still holds for `next`.
///
/// `previous_fragments` are the fragments recovered from the previous
/// `cql_filter`; only their spatial subset is compared against the
/// fragments `next.filters` would produce.
pub fn can_skip_source_update(
    descriptor: &SourceDescriptor,
    previous: Option<&DataRequestMeta>,
    next: &DataRequestMeta,
    previous_fragments: &[CqlFragment],
) -> WmsResult<bool> {
    let Some(previous) = previous else {
        return Ok(false);
    };

    match (&previous.source_query, &next.source_query) {
        (None, Some(_)) => return Ok(false),
        (Some(prev), Some(next)) if prev != next => {
            debug!("Source query changed");
            return Ok(false);
        }
        _ => {}
    }

    if descriptor.nrt {
        return Ok(false);
    }

    if descriptor.is_time_aware()
        && (previous.timeslice != next.timeslice || previous.time_filters != next.time_filters)
    {
        debug!("Time filter changed");
        return Ok(false);
    }

    let next_spatial = extract_geo_cql(&next.filters, &descriptor.geo_column)?;
    let previous_spatial: Vec<&CqlFragment> =
        previous_fragments.iter().filter(|f| f.is_spatial).collect();
    if previous_spatial.len() != next_spatial.len() {
        debug!(
            previous = previous_spatial.len(),
            next = next_spatial.len(),
            "Spatial filter count changed"
        );
        return Ok(false);
    }
    if previous_spatial
        .iter()
        .zip(&next_spatial)
        .any(|(prev, next)| prev.cql != next.cql)
    {
        debug!("Spatial filter changed");
        return Ok(false);
    }

    if !descriptor.is_time_aware() && previous_fragments.iter().any(CqlFragment::is_time_range) {
        debug!("Time column removed");
        return Ok(false);
    }

    Ok(true)
}
