//! Common types and utilities shared across the WMS layer source crates.

pub mod bbox;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod style;
pub mod time;

pub use bbox::{rotated_viewport, BoundingBox};
pub use error::{WmsError, WmsResult};
pub use geometry::{GeometryObject, Position};
pub use layer::{SourceDescriptor, WfsColumn};
pub use style::{Style, StyleRule, Symbolizer};
pub use time::{TimeBounds, TimeRange, Timeslice};
