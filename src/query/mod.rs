//! Relationship navigation over overview snapshots.
//!
//! ```ignore
//! let query = Query::new(&overview);
//! let node = query.latest_node("web01").ok_or(...)?;
//! for issue in node.many("issues").iter() {
//!     println!("{} on {:?}", issue.kind(), issue.one("resource").and_then(|r| r.label()));
//! }
//! ```

mod extractor;
mod relationships;
mod wrapper;

pub use extractor::NodeExtractor;
pub use relationships::{relationship, relationships, Traversal};
pub use wrapper::{EntityRef, EntitySet, Navigation, Query};
