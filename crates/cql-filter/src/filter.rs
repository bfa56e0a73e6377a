//! Host filter descriptors and the predicates extracted from them.
//!
//! Filters arrive as loosely structured JSON (a query DSL with `bool`,
//! `must`, `should`, `geo_shape` and `geo_distance` clauses). Only the
//! metadata is given a fixed shape; the query body is walked on demand and
//! classified into [`SpatialPredicate`] values.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wms_common::{GeometryObject, WmsError, WmsResult};

/// Query language tag for free-text expression queries.
pub const KUERY_LANGUAGE: &str = "kuery";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterMeta {
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub negate: bool,
    pub disabled: bool,
    pub is_multi_index: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    #[serde(default)]
    pub meta: FilterMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
}

impl FilterDescriptor {
    /// Whether the filter can constrain `geo_column`.
    pub fn targets_geometry(&self, geo_column: &str) -> bool {
        self.meta.key.as_deref() == Some(geo_column)
            || self.meta.is_multi_index
            || self.meta.kind.as_deref() == Some("custom")
    }

    /// The query bodies this filter applies: each `bool.should` entry when
    /// present, otherwise the query itself.
    pub fn clauses(&self) -> Vec<&Value> {
        let Some(query) = &self.query else {
            return Vec::new();
        };
        match query.pointer("/bool/should").and_then(Value::as_array) {
            Some(should) => should.iter().collect(),
            None => vec![query],
        }
    }
}

/// Free-text query attached to the whole source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceQuery {
    pub query: Value,
    pub language: String,
}

impl SourceQuery {
    pub fn kuery(text: impl Into<String>) -> Self {
        Self {
            query: Value::String(text.into()),
            language: KUERY_LANGUAGE.to_string(),
        }
    }

    /// The query as text. Non-string queries are rendered as JSON.
    pub fn text(&self) -> String {
        match &self.query {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Leaf predicate of a `bool.must` list, resolved against one geometry column.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialPredicate {
    GeoShape {
        relation: String,
        shape: GeometryObject,
    },
    GeoDistance {
        shape: GeometryObject,
        distance: String,
        units: &'static str,
    },
    Other,
}

impl SpatialPredicate {
    /// Classify one `must` entry. Entries that do not constrain
    /// `geo_column` resolve to [`SpatialPredicate::Other`].
    pub fn classify(statement: &Value, geo_column: &str) -> WmsResult<Self> {
        if let Some(spec) = statement.get("geo_shape").and_then(|g| g.get(geo_column)) {
            let relation = spec
                .get("relation")
                .and_then(Value::as_str)
                .unwrap_or("INTERSECTS")
                .to_uppercase();
            let shape = spec.get("shape").ok_or_else(|| missing_shape(geo_column))?;
            return Ok(SpatialPredicate::GeoShape {
                relation,
                shape: GeometryObject::from_value(shape)?,
            });
        }

        if let Some(distance_spec) = statement.get("geo_distance") {
            if let Some(target) = distance_spec.get(geo_column) {
                let shape = match target {
                    Value::Array(pair) if pair.len() == 2 => {
                        GeometryObject::from_value(&serde_json::json!({
                            "type": "Point",
                            "coordinates": pair,
                        }))?
                    }
                    other => GeometryObject::from_value(
                        other.get("shape").ok_or_else(|| missing_shape(geo_column))?,
                    )?,
                };
                let raw = distance_spec
                    .get("distance")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let (distance, units) = parse_distance(raw)?;
                return Ok(SpatialPredicate::GeoDistance {
                    shape,
                    distance,
                    units,
                });
            }
        }

        Ok(SpatialPredicate::Other)
    }
}

fn missing_shape(geo_column: &str) -> WmsError {
    WmsError::InvalidParameter {
        param: geo_column.to_string(),
        message: "spatial predicate has no shape".to_string(),
    }
}

fn distance_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([\d.]+)(\w+)").expect("distance pattern is valid"))
}

/// Split a distance such as `"320km"` into its number and CQL unit name.
pub fn parse_distance(raw: &str) -> WmsResult<(String, &'static str)> {
    let caps = distance_pattern()
        .captures(raw)
        .ok_or_else(|| WmsError::InvalidParameter {
            param: "distance".to_string(),
            message: format!("cannot parse '{}'", raw),
        })?;
    let units = if &caps[2] == "km" { "kilometers" } else { "meters" };
    Ok((caps[1].to_string(), units))
}
