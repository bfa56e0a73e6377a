//! CQL filter synthesis for WMS/WFS layers.
//!
//! Translates the host's structured filters, time bounds and free-text
//! queries into Common Query Language fragments, and parses previously
//! emitted `cql_filter` strings back into fragments so that derived filter
//! state can be compared without keeping the original filter objects.
//!
//! # Example
//!
//! ```rust
//! use cql_filter::{extract_time_cql, join_fragments};
//!
//! let time = extract_time_cql("obs_time", Some("2024-01-01T00:00:00.000Z"), Some("2024-01-02T00:00:00.000Z"));
//! let cql = join_fragments(time.as_slice());
//! assert_eq!(
//!     cql.as_deref(),
//!     Some("(obs_time BETWEEN 2024-01-01T00:00:00.000Z AND 2024-01-02T00:00:00.000Z)")
//! );
//! ```

pub mod extract;
pub mod filter;
pub mod fragment;
pub mod kuery;
pub mod parse;
pub mod wkt;

pub use extract::{extract_geo_cql, extract_kuery_cql, extract_time_cql};
pub use filter::{FilterDescriptor, FilterMeta, SourceQuery, SpatialPredicate};
pub use fragment::{join_fragments, CqlFragment};
pub use kuery::{to_cql, QueryExpressionNode};
pub use parse::parse_cql;
pub use wkt::{to_wkt, value_to_wkt};

/// Spatial predicate names recognised when parsing CQL fragments.
pub const SPATIAL_PREDICATES: &[&str] = &["BBOX", "INTERSECTS", "DWITHIN", "WITHIN", "CONTAINS"];
