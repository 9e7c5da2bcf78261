//! Input document model.
//!
//! [`Catalog`] is the JSON document produced by the external compiler for one
//! host and one environment. [`ResourceRef`] parses the `Type[title]`
//! references used by edges, and [`CatalogIndex`] keys a catalog's resources
//! for comparison:
//!
//! ```ignore
//! let catalog = Catalog::from_json_str(&content)?;
//! let index = CatalogIndex::build(&catalog, false)?;
//! ```

mod catalog;
mod index;
mod reference;

pub use catalog::*;
pub use index::*;
pub use reference::*;
