//! Change computer implementations.
//!
//! Concrete implementations of the `ChangeComputer` trait for each category of
//! findings: resources (with their attributes) and edges.

mod edges;
mod resources;

pub use edges::EdgeChangeComputer;
pub use resources::ResourceChangeComputer;
