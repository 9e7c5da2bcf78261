//! Extraction of self-contained per-node overviews.

use super::wrapper::Query;
use crate::error::{PreviewError, ReferenceErrorKind, Result};
use crate::overview::{EntityKind, Id, Overview};
use std::collections::BTreeSet;

/// Collects the closure of one or more nodes into a minimal overview.
///
/// For each node this takes its compilations, their environments and log
/// entries (with levels, issues, messages, locations and files), the node's
/// issue joins and issues, the resources, types and locations those issues
/// mention, and for conflicts their attribute issues and attributes.
#[derive(Debug, Clone)]
pub struct NodeExtractor<'a> {
    overview: &'a Overview,
    ids: BTreeSet<Id>,
}

impl<'a> NodeExtractor<'a> {
    pub fn new(overview: &'a Overview) -> Self {
        Self {
            overview,
            ids: BTreeSet::new(),
        }
    }

    /// Add the node `id` and everything it reaches.
    pub fn add_node(&mut self, id: Id) -> Result<&mut Self> {
        let node = Query::new(self.overview).find(id)?;
        if node.kind() != EntityKind::Node {
            return Err(PreviewError::reference(
                "extracting node",
                ReferenceErrorKind::WrongKind {
                    id,
                    expected: EntityKind::Node.name(),
                    actual: node.kind().name(),
                },
            ));
        }

        let compilations = node.many("compilations");
        let joins = node.many("issue_on_nodes");
        let issues = joins.navigate("issue");

        let mut seeds: Vec<Id> = vec![id];
        seeds.extend_from_slice(compilations.ids());
        seeds.extend_from_slice(compilations.navigate("log_entries").ids());
        seeds.extend_from_slice(joins.ids());
        seeds.extend_from_slice(issues.navigate("attribute_issues").ids());

        // Everything else is reachable through foreign keys
        let mut pending = seeds;
        while let Some(next) = pending.pop() {
            if !self.ids.insert(next) {
                continue;
            }
            if let Some(entity) = self.overview.get(next) {
                pending.extend(entity.references().iter().map(|key| key.target));
            }
        }

        tracing::debug!(node_id = id, entities = self.ids.len(), "extracted node closure");
        Ok(self)
    }

    /// Ids collected so far.
    #[must_use]
    pub const fn ids(&self) -> &BTreeSet<Id> {
        &self.ids
    }

    /// The minimal overview holding every collected entity.
    pub fn overview(&self) -> Overview {
        self.overview.subset(self.ids.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DeltaContext, DeltaEngine};
    use crate::model::{Catalog, CatalogEdge, CatalogResource};
    use crate::overview::{CompileLogEntry, Factory};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn factory() -> (Factory, Id, Id, Id) {
        let baseline = Catalog {
            name: None,
            environment: "production".to_string(),
            version: json!(1),
            resources: vec![CatalogResource::new("File", "/tmp/x")
                .with_parameter("mode", json!("0644"))
                .at("site.pp", 4)],
            edges: vec![CatalogEdge::new("File[/tmp/x]", "Package[nginx]")],
        };
        let mut preview = baseline.clone();
        preview.environment = "future".to_string();
        preview.resources[0] = CatalogResource::new("File", "/tmp/x")
            .with_parameter("mode", json!("0600"))
            .at("site.pp", 4);
        preview.edges.clear();

        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut factory = Factory::new();
        let web01 = factory
            .merge(
                &DeltaEngine::new()
                    .compare(&baseline, &preview, &DeltaContext::new("web01").at(ts))
                    .unwrap(),
            )
            .unwrap();
        let web02 = factory
            .merge(
                &DeltaEngine::new()
                    .compare(&baseline, &baseline, &DeltaContext::new("web02").at(ts))
                    .unwrap(),
            )
            .unwrap();
        let db01 = factory
            .merge_failure(
                "db01",
                "future",
                ts,
                3,
                &[CompileLogEntry::new("err", "boom").with_issue("E1").at("other.pp", 2)],
            )
            .unwrap();
        (factory, web01, web02, db01)
    }

    #[test]
    fn test_extracted_overview_is_self_contained() {
        let (factory, web01, _, _) = factory();
        let overview = factory.create_overview();
        let mut extractor = NodeExtractor::new(&overview);
        extractor.add_node(web01).unwrap();
        let extracted = extractor.overview();

        assert_eq!(extracted.count_of(EntityKind::Node), 1);
        assert_eq!(extracted.count_of(EntityKind::ResourceConflict), 1);
        assert_eq!(extracted.count_of(EntityKind::AttributeConflict), 1);
        assert_eq!(extracted.count_of(EntityKind::EdgeMissing), 1);
        assert_eq!(extracted.count_of(EntityKind::LogEntry), 0);
        // File and Package resources with their types
        assert_eq!(extracted.count_of(EntityKind::Resource), 2);
        assert_eq!(extracted.count_of(EntityKind::ResourceType), 2);

        // Closed under references: survives the wire-format check
        let reparsed = Overview::from_value(extracted.to_value().unwrap()).unwrap();
        assert_eq!(reparsed, extracted);
    }

    #[test]
    fn test_failed_node_brings_its_log() {
        let (factory, _, web02, db01) = factory();
        let overview = factory.create_overview();
        let mut extractor = NodeExtractor::new(&overview);
        extractor.add_node(db01).unwrap().add_node(web02).unwrap();
        let extracted = extractor.overview();

        assert_eq!(extracted.count_of(EntityKind::Node), 2);
        assert_eq!(extracted.count_of(EntityKind::LogEntry), 1);
        assert_eq!(extracted.count_of(EntityKind::LogIssue), 1);
        assert_eq!(extracted.count_of(EntityKind::SourceFile), 1);
        assert_eq!(extracted.count_of(EntityKind::IssueOnNode), 0);
        assert!(Overview::from_value(extracted.to_value().unwrap()).is_ok());
    }

    #[test]
    fn test_rejects_non_nodes() {
        let (factory, ..) = factory();
        let overview = factory.create_overview();
        let environment = overview.of_kind(EntityKind::Environment).next().unwrap().id();
        let mut extractor = NodeExtractor::new(&overview);
        assert!(extractor.add_node(environment).unwrap_err().is_reference());
        assert!(extractor.add_node(424_242).unwrap_err().is_reference());
    }
}
