//! **Compliance-aware comparison of configuration catalogs across a fleet.**
//!
//! `catalog-delta` compares two compiled catalogs of the same host, one from
//! the current configuration source (the *baseline*) and one from a candidate
//! source (the *preview*), and classifies every resource, attribute and edge
//! as equal, added, missing or conflicting. A preview is *compliant* when it
//! satisfies everything the baseline requires without being identical.
//!
//! Many such per-host deltas, together with compile failures, are merged into
//! a deduplicated cross-fleet overview that can be navigated and summarized.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: the [`Catalog`] document and `Type[title]` references.
//! - **[`diff`]**: the [`DeltaEngine`], value comparison and exclusion rules,
//!   producing a [`CatalogDelta`] per host.
//! - **[`overview`]**: the [`Factory`] entity store and immutable [`Overview`]
//!   snapshots with their JSON wire format.
//! - **[`query`]**: relationship navigation over an overview and per-node
//!   extraction.
//! - **[`reports`]**: fleet reports and renderings of single deltas.
//! - **[`pipeline`]**: file loading and parallel fleet comparison.
//! - **[`config`]**: YAML configuration with discovery and presets.
//!
//! ## Comparing two catalogs
//!
//! ```no_run
//! use std::path::Path;
//! use catalog_delta::{pipeline, DeltaContext, DeltaEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let baseline = pipeline::load_catalog(Path::new("baseline.json"))?;
//!     let preview = pipeline::load_catalog(Path::new("preview.json"))?;
//!
//!     let delta = DeltaEngine::new().compare(&baseline, &preview, &DeltaContext::new("web01"))?;
//!     println!(
//!         "{} conflicting resources, compliant: {}",
//!         delta.summary.conflicting_resource_count, delta.preview_compliant
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Building a fleet overview
//!
//! ```no_run
//! use catalog_delta::{Factory, Report};
//! # fn deltas() -> Vec<catalog_delta::CatalogDelta> { Vec::new() }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut factory = Factory::new();
//!     for delta in deltas() {
//!         factory.merge(&delta)?;
//!     }
//!     let overview = factory.create_overview();
//!     println!("{}", Report::new(&overview).to_text()?);
//!     Ok(())
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
// Pedantic lints: allow categories that are design choices for this codebase
#![allow(
    // Percentages are computed from node counts, which are far below f64 precision limits
    clippy::cast_precision_loss,
    // Doc completeness: # Errors / # Panics sections are aspirational
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // Option structs legitimately use many bools for toggle flags
    clippy::struct_excessive_bools,
    // Variable names like `baseline`/`preview` pairs are clear in context
    clippy::similar_names
)]

pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod overview;
pub mod pipeline;
pub mod query;
pub mod reports;

// Re-export main types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError, ConfigPreset, Validatable};
pub use diff::{
    CatalogDelta, DeltaContext, DeltaEngine, DeltaOptions, DeltaSummary, Exclude, ExclusionFilter,
};
pub use error::{ErrorContext, OptionContext, PreviewError, Result};
pub use model::{Catalog, CatalogEdge, CatalogIndex, CatalogResource, ResourceRef};
pub use overview::{CompileLogEntry, Entity, EntityKind, Factory, Id, Overview, Severity};
pub use query::{EntityRef, EntitySet, NodeExtractor, Query};
pub use reports::{create_reporter, DeltaReporter, Report, ReportData, ReportFormat};
