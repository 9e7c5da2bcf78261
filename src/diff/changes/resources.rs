//! Resource change computer implementation.

use crate::diff::compare::ValueComparator;
use crate::diff::excludes::ExclusionFilter;
use crate::diff::result::{Attribute, AttributeConflict, Resource, ResourceConflict};
use crate::diff::traits::{ChangeComputer, ResourceChangeSet};
use crate::model::{CatalogIndex, IndexedResource, ResourceKey};

/// Computes resource-level findings between catalogs.
pub struct ResourceChangeComputer {
    comparator: ValueComparator,
}

impl ResourceChangeComputer {
    /// Create a resource change computer using `comparator` for attribute values.
    #[must_use]
    pub const fn new(comparator: ValueComparator) -> Self {
        Self { comparator }
    }

    fn conflict(
        &self,
        key: &ResourceKey,
        baseline: &IndexedResource,
        preview: &IndexedResource,
        filter: &ExclusionFilter,
    ) -> Option<ResourceConflict> {
        let excluded = filter.excluded_attributes(&key.type_name, &key.title);
        let mut added = Vec::new();
        let mut missing = Vec::new();
        let mut conflicting = Vec::new();
        let mut equal = 0;

        for (name, value) in &baseline.attributes {
            if excluded.contains(name.as_str()) {
                continue;
            }
            match preview.attributes.get(name) {
                None => missing.push(Attribute::new(name.clone(), value.clone())),
                Some(other) if self.comparator.attribute_equal(name, value, other) => equal += 1,
                Some(other) => conflicting.push(AttributeConflict {
                    id: None,
                    name: name.clone(),
                    baseline_value: value.clone(),
                    preview_value: other.clone(),
                    compliant: self.comparator.attribute_compliant(name, value, other),
                }),
            }
        }
        for (name, value) in &preview.attributes {
            if !excluded.contains(name.as_str()) && !baseline.attributes.contains_key(name) {
                added.push(Attribute::new(name.clone(), value.clone()));
            }
        }

        if added.is_empty() && missing.is_empty() && conflicting.is_empty() {
            return None;
        }

        let mut conflict = ResourceConflict {
            id: None,
            baseline_location: baseline.location.clone(),
            preview_location: preview.location.clone(),
            type_name: key.type_name.clone(),
            title: key.title.clone(),
            equal_attribute_count: equal,
            added_attribute_count: 0,
            missing_attribute_count: 0,
            conflicting_attribute_count: 0,
            added_attributes: added,
            missing_attributes: missing,
            conflicting_attributes: conflicting,
            compliant: false,
        };
        conflict.refresh();
        Some(conflict)
    }
}

impl Default for ResourceChangeComputer {
    fn default() -> Self {
        Self::new(ValueComparator::new())
    }
}

fn one_sided(key: &ResourceKey, resource: &IndexedResource) -> Resource {
    Resource {
        id: None,
        location: resource.location.clone(),
        type_name: key.type_name.clone(),
        title: key.title.clone(),
        attributes: Some(
            resource
                .attributes
                .iter()
                .map(|(name, value)| Attribute::new(name.clone(), value.clone()))
                .collect(),
        ),
    }
}

impl ChangeComputer for ResourceChangeComputer {
    type ChangeSet = ResourceChangeSet;

    fn compute(
        &self,
        baseline: &CatalogIndex,
        preview: &CatalogIndex,
        filter: &ExclusionFilter,
    ) -> ResourceChangeSet {
        let mut result = ResourceChangeSet::new();

        for (key, resource) in preview.resources() {
            if !baseline.contains(key) && !filter.excludes_resource(&key.type_name, &key.title) {
                result.added.push(one_sided(key, resource));
            }
        }

        for (key, resource) in baseline.resources() {
            let fully_excluded = filter.excludes_resource(&key.type_name, &key.title);
            match preview.get(key) {
                None if !fully_excluded => result.missing.push(one_sided(key, resource)),
                None => {}
                // Suppressed resources count as neither equal nor conflicting
                Some(_) if fully_excluded => {}
                Some(other) => match self.conflict(key, resource, other, filter) {
                    Some(conflict) => result.conflicting.push(conflict),
                    None => result.equal += 1,
                },
            }
        }

        result
    }

    fn name(&self) -> &str {
        "ResourceChangeComputer"
    }
}
