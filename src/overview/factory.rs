//! Deduplicating entity store.
//!
//! The factory is the only mutable part of the overview model. Every entity
//! is created through find-or-create on its natural key, so merging the same
//! delta or failure twice leaves the graph unchanged.

use super::entity::{
    Attribute, AttributeAdded, AttributeConflict, AttributeMissing, Compilation, EdgeAdded,
    EdgeMissing, Entity, EntityKind, Environment, Id, IssueOnNode, Location, LogEntry, LogIssue,
    LogLevel, LogMessage, Node, Resource, ResourceAdded, ResourceConflict, ResourceMissing,
    ResourceType, Severity, SourceFile,
};
use super::snapshot::Overview;
use crate::diff::{self, format_timestamp, CatalogDelta};
use crate::error::{ErrorContext, PreviewError, Result, ValidationErrorKind};
use crate::model::{normalize_type_name, ResourceRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One line of compiler output recorded for a failed compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileLogEntry {
    pub level: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl CompileLogEntry {
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            issue_code: None,
            file: None,
            line: None,
        }
    }

    #[must_use]
    pub fn with_issue(mut self, code: impl Into<String>) -> Self {
        self.issue_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u64) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Parse a JSON array of log entries.
    pub fn parse_json(content: &str) -> Result<Vec<Self>> {
        serde_json::from_str(content).context("parsing compile log")
    }

    /// Read a JSON array of log entries from a file.
    pub fn parse_file(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path).map_err(|e| PreviewError::io(path, e))?;
        Self::parse_json(&content).with_context(|| format!("reading compile log {}", path.display()))
    }
}

/// Natural identity of an entity: its kind plus the canonical JSON text of
/// its key fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey(EntityKind, String);

impl EntityKey {
    fn of(entity: &Entity) -> Result<Self> {
        let mut fields = entity.fields()?;
        if let Value::Object(map) = &mut fields {
            map.remove("id");
            if entity.kind() == EntityKind::Node {
                map.retain(|name, _| name == "name" || name == "timestamp");
            }
        }
        // Object keys serialize in sorted order, so equal records give equal text
        let text = serde_json::to_string(&fields).context("computing entity key")?;
        Ok(Self(entity.kind(), text))
    }
}

/// Mutable, deduplicating store that builds overviews.
#[derive(Debug, Clone)]
pub struct Factory {
    entities: BTreeMap<Id, Entity>,
    keys: HashMap<EntityKey, Id>,
    next_id: Id,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    /// Create an empty factory; the first entity gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            keys: HashMap::new(),
            next_id: 1,
        }
    }

    /// Seed a factory with the entities of an existing overview so merging can
    /// continue across runs. Existing ids are kept.
    pub fn from_overview(overview: &Overview) -> Result<Self> {
        let mut factory = Self::new();
        for (id, entity) in overview.entities() {
            factory.keys.insert(EntityKey::of(entity)?, *id);
            factory.entities.insert(*id, entity.clone());
            factory.next_id = factory.next_id.max(id + 1);
        }
        Ok(factory)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Take an immutable snapshot of the current graph.
    pub fn create_overview(&self) -> Overview {
        Overview::from_entities(self.entities.clone())
    }

    /// Find the entity with the same natural key, or store this one under a
    /// fresh id.
    fn intern(&mut self, entity: impl Into<Entity>) -> Result<Id> {
        let mut entity = entity.into();
        let key = EntityKey::of(&entity)?;
        if let Some(id) = self.keys.get(&key) {
            return Ok(*id);
        }
        let id = self.next_id;
        self.next_id += 1;
        entity.set_id(id);
        self.keys.insert(key, id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Merge one host's delta. Returns the id of its node.
    ///
    /// Edge references are validated before anything is stored, so a failed
    /// merge leaves the factory untouched.
    pub fn merge(&mut self, delta: &CatalogDelta) -> Result<Id> {
        let node_name = delta.node_name.as_str();
        let added_edges = parse_edges(&delta.added_edges)
            .with_context(|| format!("merging delta for {node_name}"))?;
        let missing_edges = parse_edges(&delta.missing_edges)
            .with_context(|| format!("merging delta for {node_name}"))?;

        let baseline_env = self.intern(Environment {
            id: 0,
            name: delta.baseline_env.clone(),
        })?;
        let preview_env = self.intern(Environment {
            id: 0,
            name: delta.preview_env.clone(),
        })?;

        let severity = Severity::of_delta(delta);
        let node_id = self.intern(Node {
            id: 0,
            name: delta.node_name.clone(),
            timestamp: format_timestamp(&delta.timestamp),
            severity,
            exit_code: severity.exit_code(),
        })?;
        self.intern(Compilation {
            id: 0,
            node_id,
            environment_id: baseline_env,
            baseline: true,
        })?;
        self.intern(Compilation {
            id: 0,
            node_id,
            environment_id: preview_env,
            baseline: false,
        })?;

        for resource in &delta.added_resources {
            let resource_id = self.resource(&resource.type_name, &resource.title)?;
            let location_id = self.location(resource.location.as_ref())?;
            let issue_id = self.intern(ResourceAdded {
                id: 0,
                resource_id,
                location_id,
            })?;
            self.issue_on_node(node_id, issue_id)?;
        }

        for resource in &delta.missing_resources {
            let resource_id = self.resource(&resource.type_name, &resource.title)?;
            let location_id = self.location(resource.location.as_ref())?;
            let issue_id = self.intern(ResourceMissing {
                id: 0,
                resource_id,
                location_id,
            })?;
            self.issue_on_node(node_id, issue_id)?;
        }

        for conflict in &delta.conflicting_resources {
            self.merge_conflict(node_id, conflict)?;
        }

        for (source, target) in added_edges {
            let source_id = self.resource(&source.type_name, &source.title)?;
            let target_id = self.resource(&target.type_name, &target.title)?;
            let issue_id = self.intern(EdgeAdded {
                id: 0,
                source_id,
                target_id,
            })?;
            self.issue_on_node(node_id, issue_id)?;
        }

        for (source, target) in missing_edges {
            let source_id = self.resource(&source.type_name, &source.title)?;
            let target_id = self.resource(&target.type_name, &target.title)?;
            let issue_id = self.intern(EdgeMissing {
                id: 0,
                source_id,
                target_id,
            })?;
            self.issue_on_node(node_id, issue_id)?;
        }

        tracing::debug!(
            node = node_name,
            node_id,
            %severity,
            entities = self.entities.len(),
            "merged catalog delta"
        );
        Ok(node_id)
    }

    /// Record a failed compilation of `node` against `environment`.
    ///
    /// `exit_code` selects the failing side: 2 for the baseline, 3 for the
    /// preview. Returns the id of the node.
    pub fn merge_failure(
        &mut self,
        node: &str,
        environment: &str,
        timestamp: DateTime<Utc>,
        exit_code: i32,
        log_entries: &[CompileLogEntry],
    ) -> Result<Id> {
        let (severity, baseline) = match Severity::from_exit_code(exit_code) {
            Some(Severity::BaselineFailed) => (Severity::BaselineFailed, true),
            Some(Severity::PreviewFailed) => (Severity::PreviewFailed, false),
            _ => {
                return Err(PreviewError::validation(
                    format!("recording failure for {node}"),
                    ValidationErrorKind::NotAFailure(exit_code),
                ))
            }
        };

        let environment_id = self.intern(Environment {
            id: 0,
            name: environment.to_string(),
        })?;
        let node_id = self.intern(Node {
            id: 0,
            name: node.to_string(),
            timestamp: format_timestamp(&timestamp),
            severity,
            exit_code,
        })?;
        let compilation_id = self.intern(Compilation {
            id: 0,
            node_id,
            environment_id,
            baseline,
        })?;

        for entry in log_entries {
            let level_id = self.intern(LogLevel {
                id: 0,
                name: entry.level.clone(),
            })?;
            let issue_id = match &entry.issue_code {
                Some(code) => Some(self.intern(LogIssue {
                    id: 0,
                    name: code.clone(),
                })?),
                None => None,
            };
            let message_id = self.intern(LogMessage {
                id: 0,
                message: entry.message.clone(),
            })?;
            let location_id = self.log_location(entry.file.as_deref(), entry.line)?;
            self.intern(LogEntry {
                id: 0,
                compilation_id,
                level_id,
                issue_id,
                message_id,
                location_id,
            })?;
        }

        tracing::debug!(
            node,
            node_id,
            %severity,
            log_entries = log_entries.len(),
            "merged compilation failure"
        );
        Ok(node_id)
    }

    fn merge_conflict(&mut self, node_id: Id, conflict: &diff::ResourceConflict) -> Result<()> {
        let resource_id = self.resource(&conflict.type_name, &conflict.title)?;
        let baseline_location_id = self.location(conflict.baseline_location.as_ref())?;
        let preview_location_id = self.location(conflict.preview_location.as_ref())?;
        let issue_id = self.intern(ResourceConflict {
            id: 0,
            resource_id,
            baseline_location_id,
            preview_location_id,
        })?;

        for attribute in &conflict.added_attributes {
            let attribute_id = self.attribute(&attribute.name)?;
            self.intern(AttributeAdded {
                id: 0,
                issue_id,
                attribute_id,
                value: attribute.value.clone(),
            })?;
        }
        for attribute in &conflict.missing_attributes {
            let attribute_id = self.attribute(&attribute.name)?;
            self.intern(AttributeMissing {
                id: 0,
                issue_id,
                attribute_id,
                value: attribute.value.clone(),
            })?;
        }
        for attribute in &conflict.conflicting_attributes {
            let attribute_id = self.attribute(&attribute.name)?;
            self.intern(AttributeConflict {
                id: 0,
                issue_id,
                attribute_id,
                baseline_value: attribute.baseline_value.clone(),
                preview_value: attribute.preview_value.clone(),
                compliant: attribute.compliant,
            })?;
        }

        self.issue_on_node(node_id, issue_id)
    }

    fn resource(&mut self, type_name: &str, title: &str) -> Result<Id> {
        let type_id = self.intern(ResourceType {
            id: 0,
            name: normalize_type_name(type_name),
        })?;
        self.intern(Resource {
            id: 0,
            type_id,
            title: title.to_string(),
        })
    }

    fn location(&mut self, location: Option<&diff::Location>) -> Result<Option<Id>> {
        let Some(location) = location else {
            return Ok(None);
        };
        let file_id = self.intern(SourceFile {
            id: 0,
            path: location.file.clone(),
        })?;
        self.intern(Location {
            id: 0,
            file_id: Some(file_id),
            line: location.line,
        })
        .map(Some)
    }

    fn log_location(&mut self, file: Option<&str>, line: Option<u64>) -> Result<Option<Id>> {
        if file.is_none() && line.is_none() {
            return Ok(None);
        }
        let file_id = match file {
            Some(path) => Some(self.intern(SourceFile {
                id: 0,
                path: path.to_string(),
            })?),
            None => None,
        };
        self.intern(Location {
            id: 0,
            file_id,
            line: line.unwrap_or(0),
        })
        .map(Some)
    }

    fn attribute(&mut self, name: &str) -> Result<Id> {
        self.intern(Attribute {
            id: 0,
            name: name.to_string(),
        })
    }

    fn issue_on_node(&mut self, node_id: Id, issue_id: Id) -> Result<()> {
        self.intern(IssueOnNode {
            id: 0,
            node_id,
            issue_id,
        })
        .map(|_| ())
    }
}

fn parse_edges(edges: &[diff::Edge]) -> Result<Vec<(ResourceRef, ResourceRef)>> {
    edges
        .iter()
        .map(|edge| {
            Ok((
                ResourceRef::parse(&edge.source).context("edge source")?,
                ResourceRef::parse(&edge.target).context("edge target")?,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DeltaContext, DeltaEngine};
    use crate::model::{Catalog, CatalogEdge, CatalogResource};
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn delta(node: &str) -> CatalogDelta {
        let baseline = Catalog {
            name: None,
            environment: "production".to_string(),
            version: json!(1),
            resources: vec![
                CatalogResource::new("File", "/tmp/x")
                    .with_parameter("ensure", json!("present"))
                    .at("site.pp", 4),
                CatalogResource::new("Class", "Main"),
            ],
            edges: vec![CatalogEdge::new("Class[Main]", "File[/tmp/x]")],
        };
        let preview = Catalog {
            name: None,
            environment: "future".to_string(),
            version: json!(2),
            resources: vec![
                CatalogResource::new("File", "/tmp/x").at("site.pp", 4),
                CatalogResource::new("Class", "Main"),
                CatalogResource::new("Package", "nginx"),
            ],
            edges: vec![],
        };
        DeltaEngine::new()
            .compare(&baseline, &preview, &DeltaContext::new(node).at(ts()))
            .unwrap()
    }

    #[test]
    fn test_merge_builds_graph() {
        let mut factory = Factory::new();
        let node_id = factory.merge(&delta("web01")).unwrap();
        let overview = factory.create_overview();

        let node = overview.get(node_id).and_then(Entity::as_node).unwrap();
        assert_eq!(node.name, "web01");
        assert_eq!(node.severity, Severity::Different);
        assert_eq!(node.exit_code, 5);
        assert_eq!(node.timestamp, "2024-05-01T12:00:00.000000000Z");

        assert_eq!(overview.count_of(EntityKind::Environment), 2);
        assert_eq!(overview.count_of(EntityKind::Compilation), 2);
        assert_eq!(overview.count_of(EntityKind::ResourceAdded), 1);
        assert_eq!(overview.count_of(EntityKind::ResourceConflict), 1);
        assert_eq!(overview.count_of(EntityKind::AttributeMissing), 1);
        assert_eq!(overview.count_of(EntityKind::EdgeMissing), 1);
        // one join per node issue
        assert_eq!(overview.count_of(EntityKind::IssueOnNode), 3);
        // one file, one line
        assert_eq!(overview.count_of(EntityKind::Location), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let d = delta("web01");
        let mut factory = Factory::new();
        factory.merge(&d).unwrap();
        let once = factory.create_overview().to_value().unwrap();
        factory.merge(&d).unwrap();
        let twice = factory.create_overview().to_value().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_issues_shared_across_nodes() {
        let mut factory = Factory::new();
        factory.merge(&delta("web01")).unwrap();
        let before = factory.len();
        factory.merge(&delta("web02")).unwrap();
        let overview = factory.create_overview();
        assert_eq!(overview.count_of(EntityKind::Node), 2);
        assert_eq!(overview.count_of(EntityKind::ResourceConflict), 1);
        assert_eq!(overview.count_of(EntityKind::IssueOnNode), 6);
        // new node, two compilations and three joins
        assert_eq!(factory.len(), before + 6);
    }

    #[test]
    fn test_bad_edge_leaves_store_untouched() {
        let mut d = delta("web01");
        d.added_edges.push(diff::Edge::new("Class[Main]", "garbage"));
        let mut factory = Factory::new();
        let err = factory.merge(&d).expect_err("bad edge");
        assert!(err.is_reference());
        assert!(factory.is_empty());
    }

    #[test]
    fn test_merge_failure() {
        let mut factory = Factory::new();
        let entries = vec![
            CompileLogEntry::new("err", "Syntax error").with_issue("SYNTAX").at("site.pp", 3),
            CompileLogEntry::new("warning", "Deprecated"),
        ];
        let node_id = factory
            .merge_failure("db01", "future", ts(), 3, &entries)
            .unwrap();
        let overview = factory.create_overview();
        let node = overview.get(node_id).and_then(Entity::as_node).unwrap();
        assert_eq!(node.severity, Severity::PreviewFailed);
        assert_eq!(overview.count_of(EntityKind::LogEntry), 2);
        assert_eq!(overview.count_of(EntityKind::LogIssue), 1);
        let compilation = overview.of_kind(EntityKind::Compilation).next().unwrap();
        assert!(matches!(compilation, Entity::Compilation(c) if !c.baseline));
    }

    #[test]
    fn test_log_line_without_file() {
        let mut factory = Factory::new();
        let mut entry = CompileLogEntry::new("err", "Unknown function").with_issue("UNKNOWN");
        entry.line = Some(7);
        factory
            .merge_failure("db01", "future", ts(), 3, &[entry])
            .unwrap();
        let overview = factory.create_overview();

        assert_eq!(overview.count_of(EntityKind::SourceFile), 0);
        let location = overview.of_kind(EntityKind::Location).next().unwrap();
        match location {
            Entity::Location(l) => {
                assert_eq!(l.line, 7);
                assert_eq!(l.file_id, None);
            }
            other => panic!("Expected Location, got {other:?}"),
        }
        assert!(location.references().is_empty());
    }

    #[test]
    fn test_merge_failure_rejects_other_codes() {
        let mut factory = Factory::new();
        for code in [0, 1, 4, 5] {
            let err = factory
                .merge_failure("db01", "future", ts(), code, &[])
                .expect_err("not a failure");
            assert!(err.is_validation());
        }
        assert!(factory.is_empty());
    }

    #[test]
    fn test_reseed_from_overview() {
        let mut factory = Factory::new();
        factory.merge(&delta("web01")).unwrap();
        let overview = factory.create_overview();

        let mut reseeded = Factory::from_overview(&overview).unwrap();
        reseeded.merge(&delta("web01")).unwrap();
        assert_eq!(reseeded.create_overview(), overview);

        let next = reseeded.merge(&delta("web02")).unwrap();
        assert!(next > overview.iter().map(Entity::id).max().unwrap());
    }

    #[test]
    fn test_parse_log_entries() {
        let entries = CompileLogEntry::parse_json(
            r#"[{"level": "err", "message": "boom", "file": "a.pp", "line": 2}]"#,
        )
        .unwrap();
        assert_eq!(entries[0], CompileLogEntry::new("err", "boom").at("a.pp", 2));
        assert!(CompileLogEntry::parse_json(r#"[{"level": "err"}]"#).is_err());
    }
}
