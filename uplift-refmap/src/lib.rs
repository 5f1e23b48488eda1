//! Reference map: an ordered, immutable table of old-to-new dependency mappings.
//!
//! The map is loaded once per run and then shared read-only (typically behind an `Arc`).
//! Lookup is first-match-wins in declared order.

mod error;
mod load;
mod map;
mod pattern;
mod version;

pub use error::RefMapError;
pub use load::{MapFormat, load, parse};
pub use map::{MappingEntry, MatchRule, ReferenceMap};
pub use pattern::NamePattern;
pub use version::{Version, VersionRange, VersionRangeError};
