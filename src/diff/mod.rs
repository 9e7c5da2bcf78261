//! Compliance-aware catalog delta engine.
//!
//! Two catalogs of the same host are indexed by `(type, title)`; every
//! resource, attribute and edge is then classified as equal, added, missing
//! or conflicting. Conflicts additionally carry a compliance verdict: the
//! preview may add to what the baseline asks for, but must not take anything
//! away.
//!
//! # Architecture
//!
//! - [`ValueComparator`]: equality and compliance of attribute values
//! - [`ExclusionFilter`]: user rules suppressing findings
//! - [`ChangeComputer`](traits::ChangeComputer): one implementation per
//!   category of findings, in the [`changes`] module
//! - [`DeltaEngine`]: wires the above together into a [`CatalogDelta`]
//!
//! # Example
//!
//! ```ignore
//! use catalog_delta::diff::{DeltaContext, DeltaEngine, DeltaOptions};
//!
//! let engine = DeltaEngine::new()
//!     .with_options(DeltaOptions::default())
//!     .with_excludes(&Exclude::parse_file(path)?)?;
//! let delta = engine.compare(&baseline, &preview, &DeltaContext::new("web01"))?;
//! println!("compliant: {}", delta.preview_compliant);
//! ```

pub mod changes;
mod compare;
mod engine;
mod engine_config;
mod excludes;
mod result;
pub mod traits;

pub use compare::{is_set_attribute, parse_number, Numeric, ValueComparator, SET_ATTRIBUTES};
pub use engine::DeltaEngine;
pub use engine_config::{DeltaContext, DeltaOptions};
pub use excludes::{Exclude, ExclusionFilter};
pub use result::{
    format_timestamp, Attribute, AttributeConflict, CatalogDelta, DeltaSummary, Edge, Location,
    Resource, ResourceConflict, PRODUCED_BY,
};
pub use traits::{ChangeComputer, EdgeChangeSet, ResourceChangeSet};
