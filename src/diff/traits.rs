//! Trait definitions for delta computation strategies.
//!
//! Resource and edge findings are produced by separate computers so each can
//! be exercised on its own.

use super::excludes::ExclusionFilter;
use super::result::{Edge, Resource, ResourceConflict};
use crate::model::CatalogIndex;

/// Trait for computing one category of findings between two catalogs.
pub trait ChangeComputer: Send + Sync {
    /// The type of findings this computer produces.
    type ChangeSet;

    /// Compute findings between the indexed baseline and preview catalogs.
    fn compute(
        &self,
        baseline: &CatalogIndex,
        preview: &CatalogIndex,
        filter: &ExclusionFilter,
    ) -> Self::ChangeSet;

    /// Get the name of this change computer for logging/debugging.
    fn name(&self) -> &str;
}

/// Resource findings after exclusions.
#[derive(Debug, Clone, Default)]
pub struct ResourceChangeSet {
    pub added: Vec<Resource>,
    pub missing: Vec<Resource>,
    pub conflicting: Vec<ResourceConflict>,
    /// Shared resources without remaining findings
    pub equal: usize,
}

impl ResourceChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.missing.is_empty() && self.conflicting.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.added.len() + self.missing.len() + self.conflicting.len()
    }
}

/// Edge findings after exclusions.
#[derive(Debug, Clone, Default)]
pub struct EdgeChangeSet {
    pub added: Vec<Edge>,
    pub missing: Vec<Edge>,
    pub equal: usize,
}

impl EdgeChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.missing.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.added.len() + self.missing.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_change_set_empty() {
        let set = ResourceChangeSet::new();
        assert!(set.is_empty());
        assert_eq!(set.total(), 0);
    }

    #[test]
    fn test_edge_change_set_total() {
        let mut set = EdgeChangeSet::new();
        set.added.push(Edge::new("Class[main]", "File[/tmp/x]"));
        assert!(!set.is_empty());
        assert_eq!(set.total(), 1);
    }
}
