//! Edge change computer implementation.

use crate::diff::excludes::ExclusionFilter;
use crate::diff::result::Edge;
use crate::diff::traits::{ChangeComputer, EdgeChangeSet};
use crate::model::CatalogIndex;

/// Computes edge-level findings between catalogs.
///
/// Edges compare structurally on their raw `(source, target)` strings.
pub struct EdgeChangeComputer;

impl EdgeChangeComputer {
    /// Create a new edge change computer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for EdgeChangeComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeComputer for EdgeChangeComputer {
    type ChangeSet = EdgeChangeSet;

    fn compute(
        &self,
        baseline: &CatalogIndex,
        preview: &CatalogIndex,
        filter: &ExclusionFilter,
    ) -> EdgeChangeSet {
        let mut result = EdgeChangeSet::new();
        let old = baseline.edges();
        let new = preview.edges();

        for (source, target) in new {
            if filter.excludes_edge(source, target) {
                continue;
            }
            if old.contains(&(source.clone(), target.clone())) {
                result.equal += 1;
            } else {
                result.added.push(Edge::new(source.as_str(), target.as_str()));
            }
        }

        for (source, target) in old {
            if !filter.excludes_edge(source, target)
                && !new.contains(&(source.clone(), target.clone()))
            {
                result.missing.push(Edge::new(source.as_str(), target.as_str()));
            }
        }

        result
    }

    fn name(&self) -> &str {
        "EdgeChangeComputer"
    }
}
