//! CQL fragments and their joined form.

use serde::{Deserialize, Serialize};

/// One parenthesised CQL clause, as emitted into or recovered from a
/// `cql_filter` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CqlFragment {
    /// Exact clause text, including its outer parentheses.
    pub cql: String,
    pub is_spatial: bool,
    pub is_negated: bool,
    /// Geometry column named by a spatial clause; empty otherwise.
    pub field_key: String,
}

impl CqlFragment {
    pub fn spatial(cql: String, field_key: &str, is_negated: bool) -> Self {
        Self {
            cql,
            is_spatial: true,
            is_negated,
            field_key: field_key.to_string(),
        }
    }

    pub fn plain(cql: String) -> Self {
        Self {
            cql,
            is_spatial: false,
            is_negated: false,
            field_key: String::new(),
        }
    }

    /// Whether this is a temporal `BETWEEN` clause.
    pub fn is_time_range(&self) -> bool {
        !self.is_spatial && self.cql.contains(" BETWEEN ")
    }
}

/// Join fragments into a `cql_filter` value. `None` when there is nothing
/// to filter on, so the parameter can be omitted entirely.
pub fn join_fragments(fragments: &[CqlFragment]) -> Option<String> {
    if fragments.is_empty() {
        return None;
    }
    Some(
        fragments
            .iter()
            .map(|f| f.cql.as_str())
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}
