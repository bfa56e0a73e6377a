//! Filter state to CQL fragments.

use serde_json::Value;
use tracing::{debug, warn};
use wms_common::WmsResult;

use crate::filter::{FilterDescriptor, SourceQuery, SpatialPredicate, KUERY_LANGUAGE};
use crate::fragment::CqlFragment;
use crate::kuery;
use crate::wkt::to_wkt;

/// Translate the spatial filters that constrain `geo_column` into CQL.
///
/// Fragments follow filter order, then clause order within a filter, then
/// predicate order within each clause's `bool.must` list. Disabled filters
/// and predicates of any other kind contribute nothing.
pub fn extract_geo_cql(
    filters: &[FilterDescriptor],
    geo_column: &str,
) -> WmsResult<Vec<CqlFragment>> {
    let mut fragments = Vec::new();

    for filter in filters.iter().filter(|f| f.targets_geometry(geo_column)) {
        if filter.meta.disabled {
            continue;
        }
        let negate = if filter.meta.negate { "NOT " } else { "" };

        for clause in filter.clauses() {
            let must = clause
                .pointer("/bool/must")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for statement in must {
                let text = match SpatialPredicate::classify(statement, geo_column)? {
                    SpatialPredicate::GeoShape { relation, shape } => format!(
                        "({}{}({}, {}))",
                        negate,
                        relation,
                        geo_column,
                        to_wkt(&shape)
                    ),
                    SpatialPredicate::GeoDistance {
                        shape,
                        distance,
                        units,
                    } => format!(
                        "({}DWITHIN({}, {},{},{}))",
                        negate,
                        geo_column,
                        to_wkt(&shape),
                        distance,
                        units
                    ),
                    SpatialPredicate::Other => continue,
                };
                fragments.push(CqlFragment::spatial(text, geo_column, filter.meta.negate));
            }
        }
    }

    debug!(
        geo_column = %geo_column,
        count = fragments.len(),
        "Extracted spatial CQL"
    );
    Ok(fragments)
}

/// Temporal predicate over `time_column`. Nothing is emitted when the
/// column is unset or either bound is missing.
pub fn extract_time_cql(
    time_column: &str,
    start: Option<&str>,
    stop: Option<&str>,
) -> Option<CqlFragment> {
    if time_column.is_empty() {
        return None;
    }
    let (start, stop) = (start?, stop?);
    Some(CqlFragment::plain(format!(
        "({} BETWEEN {} AND {})",
        time_column, start, stop
    )))
}

/// Translate a free-text source query.
///
/// Only the `kuery` language is understood; other languages are skipped
/// with a warning. A blank query yields no fragment.
pub fn extract_kuery_cql(source_query: &SourceQuery) -> WmsResult<Option<CqlFragment>> {
    if source_query.language != KUERY_LANGUAGE {
        warn!(
            language = %source_query.language,
            "Ignoring source query in unsupported language"
        );
        return Ok(None);
    }

    let text = source_query.text();
    let Some(node) = kuery::parse(&text)? else {
        return Ok(None);
    };
    let cql = kuery::to_cql(&node)?;
    Ok(Some(CqlFragment::plain(format!("({})", cql))))
}
