//! Catalog delta engine implementation.

use super::changes::{EdgeChangeComputer, ResourceChangeComputer};
use super::compare::ValueComparator;
use super::engine_config::{DeltaContext, DeltaOptions};
use super::excludes::{Exclude, ExclusionFilter};
use super::result::{CatalogDelta, DeltaSummary, PRODUCED_BY};
use super::traits::{ChangeComputer, EdgeChangeSet, ResourceChangeSet};
use crate::error::{ErrorContext, Result};
use crate::model::{Catalog, CatalogIndex};

/// Compares a baseline and a preview catalog of the same host.
#[derive(Debug, Clone, Default)]
pub struct DeltaEngine {
    options: DeltaOptions,
    filter: ExclusionFilter,
}

impl DeltaEngine {
    /// Create a new delta engine with default (lenient) settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set comparison options
    #[must_use]
    pub const fn with_options(mut self, options: DeltaOptions) -> Self {
        self.options = options;
        self
    }

    /// Suppress findings matching the given rules
    pub fn with_excludes(mut self, rules: &[Exclude]) -> Result<Self> {
        self.filter = ExclusionFilter::new(rules)?;
        Ok(self)
    }

    /// Get the comparison options.
    pub const fn options(&self) -> &DeltaOptions {
        &self.options
    }

    /// Check if exclusion rules are configured
    pub fn has_excludes(&self) -> bool {
        !self.filter.is_empty()
    }

    /// Compare two catalogs and return the delta.
    ///
    /// Fails with a reference error when an edge end is not a `Type[title]`
    /// reference; nothing else about the catalogs can fail at this point.
    pub fn compare(
        &self,
        baseline: &Catalog,
        preview: &Catalog,
        context: &DeltaContext,
    ) -> Result<CatalogDelta> {
        let node = context.node_name.as_str();
        let baseline_index = CatalogIndex::build(baseline, self.options.skip_tags)
            .with_context(|| format!("indexing baseline catalog for {node}"))?;
        let preview_index = CatalogIndex::build(preview, self.options.skip_tags)
            .with_context(|| format!("indexing preview catalog for {node}"))?;

        let resource_computer =
            ResourceChangeComputer::new(ValueComparator::from_options(&self.options));
        let resources = resource_computer.compute(&baseline_index, &preview_index, &self.filter);
        let edge_computer = EdgeChangeComputer::new();
        let edges = edge_computer.compute(&baseline_index, &preview_index, &self.filter);

        tracing::debug!(
            node,
            computer = resource_computer.name(),
            added = resources.added.len(),
            missing = resources.missing.len(),
            conflicting = resources.conflicting.len(),
            "resource findings computed"
        );
        tracing::debug!(
            node,
            computer = edge_computer.name(),
            added = edges.added.len(),
            missing = edges.missing.len(),
            "edge findings computed"
        );

        let summary = summarize(&baseline_index, &preview_index, &resources, &edges);
        let mut delta = CatalogDelta {
            produced_by: PRODUCED_BY.to_string(),
            timestamp: context.timestamp,
            baseline_env: baseline.environment.clone(),
            preview_env: preview.environment.clone(),
            baseline_catalog: context.baseline_catalog.clone(),
            preview_catalog: context.preview_catalog.clone(),
            node_name: context.node_name.clone(),
            version_equal: baseline.version == preview.version,
            preview_compliant: false,
            preview_equal: false,
            summary,
            added_resources: resources.added,
            missing_resources: resources.missing,
            conflicting_resources: resources.conflicting,
            added_edges: edges.added,
            missing_edges: edges.missing,
        };

        delta.derive_compliance();
        delta.assign_ids(1);
        if !self.options.verbose_diff {
            delta.clear_resource_attributes();
        }

        tracing::debug!(
            node,
            compliant = delta.preview_compliant,
            equal = delta.preview_equal,
            "catalog comparison finished"
        );
        Ok(delta)
    }
}

fn summarize(
    baseline: &CatalogIndex,
    preview: &CatalogIndex,
    resources: &ResourceChangeSet,
    edges: &EdgeChangeSet,
) -> DeltaSummary {
    let one_sided_attributes = |list: &[super::Resource]| -> usize {
        list.iter()
            .map(|r| r.attributes.as_ref().map_or(0, Vec::len))
            .sum()
    };
    let conflicts = &resources.conflicting;

    DeltaSummary {
        baseline_resource_count: baseline.resource_count(),
        preview_resource_count: preview.resource_count(),
        added_resource_count: resources.added.len(),
        missing_resource_count: resources.missing.len(),
        conflicting_resource_count: conflicts.len(),
        equal_resource_count: resources.equal,
        added_attribute_count: one_sided_attributes(&resources.added)
            + conflicts.iter().map(|c| c.added_attribute_count).sum::<usize>(),
        missing_attribute_count: one_sided_attributes(&resources.missing)
            + conflicts.iter().map(|c| c.missing_attribute_count).sum::<usize>(),
        conflicting_attribute_count: conflicts.iter().map(|c| c.conflicting_attribute_count).sum(),
        equal_attribute_count: conflicts.iter().map(|c| c.equal_attribute_count).sum(),
        baseline_edge_count: baseline.edge_count(),
        preview_edge_count: preview.edge_count(),
        added_edge_count: edges.added.len(),
        missing_edge_count: edges.missing.len(),
        equal_edge_count: edges.equal,
    }
}
