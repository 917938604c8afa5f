//! Ritual ranges: shapes and resize limits.
//!
//! ## Key Types
//!
//! - `AreaDescriptor`: rectangle or hemisphere relative to an anchor
//! - `RangeLimits`: maximum volume and radii for a resizable range
//! - `RangeCheck`: tri-state outcome of a resize request

mod descriptor;
mod limits;

pub use descriptor::AreaDescriptor;
pub use limits::{RangeCheck, RangeLimits};
