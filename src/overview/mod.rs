//! Cross-fleet overview graph.
//!
//! Deltas and compile failures of many hosts are merged into a [`Factory`],
//! which deduplicates every entity by its natural key. An [`Overview`] is an
//! immutable snapshot of that graph, serializable to and from the wire format
//! and navigable through the [`query`](crate::query) layer.
//!
//! ```ignore
//! let mut factory = Factory::new();
//! for delta in &deltas {
//!     factory.merge(delta)?;
//! }
//! factory.merge_failure("db01", "future", Utc::now(), 3, &log)?;
//! let overview = factory.create_overview();
//! std::fs::write("overview.json", overview.to_json()?)?;
//! ```

pub mod entity;
mod factory;
mod snapshot;

pub use entity::{Entity, EntityKind, ForeignKey, Id, Severity};
pub use factory::{CompileLogEntry, Factory};
pub use snapshot::Overview;
pub(crate) use snapshot::Referrer;
