//! Index structures for comparing catalogs.
//!
//! A [`CatalogIndex`] is built once per catalog and keys every resource by
//! `(type, title)` so the delta engine can compute added, missing and shared
//! resources with map lookups instead of repeated scans.

use super::{Catalog, ResourceRef};
use crate::diff::Location;
use crate::error::{ErrorContext, Result};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// Name of the synthesized tag attribute.
pub const TAGS_ATTRIBUTE: &str = "tags";
/// Name of the synthesized exported-flag attribute.
pub const EXPORTED_ATTRIBUTE: &str = "exported";

/// Key of a resource within one catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub type_name: String,
    pub title: String,
}

impl From<ResourceRef> for ResourceKey {
    fn from(r: ResourceRef) -> Self {
        Self {
            type_name: r.type_name,
            title: r.title,
        }
    }
}

/// A resource as seen by the comparison: its position and full attribute set.
#[derive(Debug, Clone)]
pub struct IndexedResource {
    pub location: Option<Location>,
    pub attributes: IndexMap<String, Value>,
}

/// Precomputed index of one catalog.
#[derive(Debug, Clone)]
#[must_use]
pub struct CatalogIndex {
    resources: IndexMap<ResourceKey, IndexedResource>,
    edges: IndexSet<(String, String)>,
}

impl CatalogIndex {
    /// Build an index from a catalog.
    ///
    /// Declared parameters come first, followed by the synthesized `tags`
    /// (omitted when `skip_tags` is set) and `exported` attributes. Every edge
    /// end must parse as a `Type[title]` reference.
    pub fn build(catalog: &Catalog, skip_tags: bool) -> Result<Self> {
        let mut resources = IndexMap::with_capacity(catalog.resources.len());

        for resource in &catalog.resources {
            let key: ResourceKey = ResourceRef::new(&resource.type_name, &resource.title).into();

            let mut attributes = resource.parameters.clone();
            if !skip_tags {
                attributes.insert(
                    TAGS_ATTRIBUTE.to_string(),
                    Value::Array(resource.tags.iter().cloned().map(Value::String).collect()),
                );
            }
            attributes.insert(
                EXPORTED_ATTRIBUTE.to_string(),
                Value::Bool(resource.exported),
            );

            let location = resource.file.as_ref().map(|file| Location {
                file: file.clone(),
                line: resource.line.unwrap_or(0),
            });

            if resources
                .insert(key.clone(), IndexedResource { location, attributes })
                .is_some()
            {
                tracing::debug!(
                    resource = %format!("{}[{}]", key.type_name, key.title),
                    "duplicate resource in catalog, keeping the last declaration"
                );
            }
        }

        let mut edges = IndexSet::with_capacity(catalog.edges.len());
        for edge in &catalog.edges {
            ResourceRef::parse(&edge.source).context("edge source")?;
            ResourceRef::parse(&edge.target).context("edge target")?;
            edges.insert((edge.source.clone(), edge.target.clone()));
        }

        Ok(Self { resources, edges })
    }

    /// Look up a resource by key.
    #[must_use]
    pub fn get(&self, key: &ResourceKey) -> Option<&IndexedResource> {
        self.resources.get(key)
    }

    /// Whether the catalog contains a resource with this key.
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = (&ResourceKey, &IndexedResource)> {
        self.resources.iter()
    }

    /// Distinct edges in declaration order.
    #[must_use]
    pub const fn edges(&self) -> &IndexSet<(String, String)> {
        &self.edges
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogEdge, CatalogResource};
    use serde_json::json;

    fn catalog(resources: Vec<CatalogResource>, edges: Vec<CatalogEdge>) -> Catalog {
        Catalog {
            name: None,
            environment: "production".to_string(),
            version: json!(1),
            resources,
            edges,
        }
    }

    #[test]
    fn test_synthesized_attributes() {
        let c = catalog(
            vec![CatalogResource::new("file", "/tmp/x")
                .with_parameter("ensure", json!("present"))
                .with_tags(["file", "class"])],
            vec![],
        );
        let index = CatalogIndex::build(&c, false).unwrap();
        let key = ResourceKey {
            type_name: "File".to_string(),
            title: "/tmp/x".to_string(),
        };
        let resource = index.get(&key).expect("type is normalized");
        let names: Vec<_> = resource.attributes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ensure", "tags", "exported"]);
        assert_eq!(resource.attributes["tags"], json!(["file", "class"]));
        assert!(resource.location.is_none());

        let skipped = CatalogIndex::build(&c, true).unwrap();
        assert!(!skipped.get(&key).unwrap().attributes.contains_key("tags"));
    }

    #[test]
    fn test_location_defaults_line() {
        let mut resource = CatalogResource::new("File", "/tmp/x");
        resource.file = Some("site.pp".to_string());
        let index = CatalogIndex::build(&catalog(vec![resource], vec![]), false).unwrap();
        let (_, indexed) = index.resources().next().unwrap();
        assert_eq!(
            indexed.location,
            Some(Location {
                file: "site.pp".to_string(),
                line: 0
            })
        );
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let edge = CatalogEdge::new("Class[main]", "File[/tmp/x]");
        let index =
            CatalogIndex::build(&catalog(vec![], vec![edge.clone(), edge]), false).unwrap();
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn test_malformed_edge_is_reference_error() {
        let err = CatalogIndex::build(
            &catalog(vec![], vec![CatalogEdge::new("Class[main]", "not a ref")]),
            false,
        )
        .expect_err("bad edge");
        assert!(err.is_reference());
        assert!(err.to_string().contains("edge target"));
    }
}
