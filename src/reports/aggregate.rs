//! Fleet-wide report aggregation over an overview.

use crate::diff::Location;
use crate::error::{PreviewError, ReportErrorKind, Result};
use crate::overview::{Entity, EntityKind, Overview, Severity};
use crate::query::{EntityRef, Query};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Default length of the `top_ten` list.
pub const DEFAULT_TOP_N: usize = 10;

/// Aggregated view of an overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub stats: Stats,
    pub top_ten: Vec<NodeRank>,
    pub changes: Changes,
    /// Present only when some node failed to compile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation_errors: Option<CompilationErrors>,
}

/// Count and share of nodes with one severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub count: usize,
    /// Percentage of all nodes, rounded to two decimals
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub node_count: usize,
    pub equal: Bucket,
    pub compliant: Bucket,
    pub different: Bucket,
    pub baseline_failed: Bucket,
    pub preview_failed: Bucket,
}

impl Stats {
    #[must_use]
    pub const fn bucket(&self, severity: Severity) -> &Bucket {
        match severity {
            Severity::Equal => &self.equal,
            Severity::Compliant => &self.compliant,
            Severity::Different => &self.different,
            Severity::BaselineFailed => &self.baseline_failed,
            Severity::PreviewFailed => &self.preview_failed,
        }
    }

    fn bucket_mut(&mut self, severity: Severity) -> &mut Bucket {
        match severity {
            Severity::Equal => &mut self.equal,
            Severity::Compliant => &mut self.compliant,
            Severity::Different => &mut self.different,
            Severity::BaselineFailed => &mut self.baseline_failed,
            Severity::PreviewFailed => &mut self.preview_failed,
        }
    }

    #[must_use]
    pub const fn failed_count(&self) -> usize {
        self.baseline_failed.count + self.preview_failed.count
    }
}

/// A node and how many issues it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRank {
    pub name: String,
    pub timestamp: String,
    pub severity: Severity,
    pub issue_count: usize,
}

/// One attribute finding inside a resource conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum AttributeRow {
    Added {
        name: String,
        value: Value,
    },
    Missing {
        name: String,
        value: Value,
    },
    Conflicting {
        name: String,
        baseline_value: Value,
        preview_value: Value,
        compliant: bool,
    },
}

impl AttributeRow {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Added { name, .. } | Self::Missing { name, .. } | Self::Conflicting { name, .. } => {
                name
            }
        }
    }
}

/// One deduplicated resource issue and the nodes it occurs on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRow {
    pub title: String,
    /// Position in the baseline for conflicts and missing resources,
    /// in the preview for added resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_location: Option<Location>,
    pub nodes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeRow>,
}

/// One deduplicated edge issue and the nodes it occurs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRow {
    pub source: String,
    pub target: String,
    pub nodes: Vec<String>,
}

/// type -> issue kind -> title -> rows
pub type ResourceTypeChanges = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<ResourceRow>>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Changes {
    pub resource_type_changes: ResourceTypeChanges,
    /// issue kind -> rows
    pub edge_changes: BTreeMap<String, Vec<EdgeRow>>,
}

/// Compiler output of failed nodes grouped by `(issue, file, line)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    pub issue: Option<String>,
    pub file: Option<String>,
    pub line: Option<u64>,
    pub level: String,
    pub message: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationErrors {
    pub baseline: Vec<LogRow>,
    pub preview: Vec<LogRow>,
}

/// Key of an issue kind in the report.
#[must_use]
pub const fn issue_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::ResourceAdded => "added_resources",
        EntityKind::ResourceMissing => "missing_resources",
        EntityKind::ResourceConflict => "conflicting_resources",
        EntityKind::EdgeAdded => "added_edges",
        EntityKind::EdgeMissing => "missing_edges",
        _ => "other",
    }
}

/// Builds [`ReportData`] from an overview.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct Report<'a> {
    overview: &'a Overview,
    top_n: usize,
}

impl<'a> Report<'a> {
    pub const fn new(overview: &'a Overview) -> Self {
        Self {
            overview,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Length of the `top_ten` list.
    pub const fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Aggregate the overview.
    #[must_use]
    pub fn build(&self) -> ReportData {
        let query = Query::new(self.overview);
        let stats = self.stats(&query);
        let compilation_errors = (stats.failed_count() > 0).then(|| self.compilation_errors(&query));
        ReportData {
            top_ten: self.top_ten(&query),
            changes: Changes {
                resource_type_changes: self.resource_type_changes(&query),
                edge_changes: self.edge_changes(&query),
            },
            stats,
            compilation_errors,
        }
    }

    /// Aggregate and serialize to JSON.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self.build()).map_err(|e| {
            PreviewError::report(
                "serializing report",
                ReportErrorKind::JsonSerialization(e.to_string()),
            )
        })
    }

    /// Aggregate and render as indented text.
    pub fn to_text(&self) -> Result<String> {
        super::text::render(&self.build())
    }

    fn stats(&self, query: &Query<'a>) -> Stats {
        let mut stats = Stats::default();
        for node in query.all(EntityKind::Node).iter() {
            if let Some(record) = node.entity().as_node() {
                stats.node_count += 1;
                stats.bucket_mut(record.severity).count += 1;
            }
        }
        let total = stats.node_count;
        for severity in Severity::ALL {
            let bucket = stats.bucket_mut(severity);
            bucket.percentage = percentage(bucket.count, total);
        }
        stats
    }

    fn top_ten(&self, query: &Query<'a>) -> Vec<NodeRank> {
        let mut ranks: Vec<NodeRank> = query
            .all(EntityKind::Node)
            .iter()
            .filter_map(|node| {
                let record = node.entity().as_node()?;
                let issue_count = node.many("issues").len();
                (issue_count > 0).then(|| NodeRank {
                    name: record.name.clone(),
                    timestamp: record.timestamp.clone(),
                    severity: record.severity,
                    issue_count,
                })
            })
            .collect();
        ranks.sort_by(|a, b| {
            b.issue_count
                .cmp(&a.issue_count)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
        ranks.truncate(self.top_n);
        ranks
    }

    fn resource_type_changes(&self, query: &Query<'a>) -> ResourceTypeChanges {
        let mut changes = ResourceTypeChanges::new();
        for issue in query.all_of(EntityKind::RESOURCE_ISSUES).iter() {
            let Some(resource) = issue.one("resource") else {
                continue;
            };
            let type_name = resource
                .one("resource_type")
                .and_then(|t| t.label())
                .unwrap_or_default()
                .to_string();
            let title = resource.label().unwrap_or_default().to_string();

            let (location, preview_location) = if issue.kind() == EntityKind::ResourceConflict {
                (
                    location_of(issue.one("baseline_location")),
                    location_of(issue.one("preview_location")),
                )
            } else {
                (location_of(issue.one("location")), None)
            };

            let row = ResourceRow {
                title: title.clone(),
                location,
                preview_location,
                nodes: node_names(&issue),
                attributes: attribute_rows(&issue),
            };
            changes
                .entry(type_name)
                .or_default()
                .entry(issue_key(issue.kind()).to_string())
                .or_default()
                .entry(title)
                .or_default()
                .push(row);
        }
        changes
    }

    fn edge_changes(&self, query: &Query<'a>) -> BTreeMap<String, Vec<EdgeRow>> {
        let mut changes: BTreeMap<String, Vec<EdgeRow>> = BTreeMap::new();
        for issue in query.all_of(EntityKind::EDGE_ISSUES).iter() {
            let (Some(source), Some(target)) = (issue.one("source"), issue.one("target")) else {
                continue;
            };
            changes
                .entry(issue_key(issue.kind()).to_string())
                .or_default()
                .push(EdgeRow {
                    source: reference_of(&source),
                    target: reference_of(&target),
                    nodes: node_names(&issue),
                });
        }
        for rows in changes.values_mut() {
            rows.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.target.cmp(&b.target)));
        }
        changes
    }

    fn compilation_errors(&self, query: &Query<'a>) -> CompilationErrors {
        type GroupKey = (Option<String>, Option<String>, Option<u64>);
        let mut baseline: IndexMap<GroupKey, (LogRow, BTreeSet<String>)> = IndexMap::new();
        let mut preview: IndexMap<GroupKey, (LogRow, BTreeSet<String>)> = IndexMap::new();

        for entry in query.all(EntityKind::LogEntry).iter() {
            let Some(compilation) = entry.one("compilation") else {
                continue;
            };
            let location = entry.one("location");
            let line = location.as_ref().and_then(|l| match l.entity() {
                Entity::Location(record) => Some(record.line),
                _ => None,
            });
            let row = LogRow {
                issue: entry.one("issue").and_then(|i| i.label()).map(str::to_string),
                file: location
                    .and_then(|l| l.one("file"))
                    .and_then(|f| f.label())
                    .map(str::to_string),
                line,
                level: label_of(entry.one("level")),
                message: label_of(entry.one("message")),
                nodes: Vec::new(),
            };
            let key = (row.issue.clone(), row.file.clone(), row.line);
            let side = match compilation.entity() {
                Entity::Compilation(c) if c.baseline => &mut baseline,
                _ => &mut preview,
            };
            let (_, nodes) = side.entry(key).or_insert_with(|| (row, BTreeSet::new()));
            if let Some(name) = entry.one("node").and_then(|n| n.label()) {
                nodes.insert(name.to_string());
            }
        }

        let finish = |groups: IndexMap<GroupKey, (LogRow, BTreeSet<String>)>| -> Vec<LogRow> {
            groups
                .into_values()
                .map(|(mut row, nodes)| {
                    row.nodes = nodes.into_iter().collect();
                    row
                })
                .collect()
        };
        CompilationErrors {
            baseline: finish(baseline),
            preview: finish(preview),
        }
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 * 100.0 / total as f64;
    (raw * 100.0).round() / 100.0
}

fn label_of(entity: Option<EntityRef<'_>>) -> String {
    entity
        .and_then(|e| e.label())
        .unwrap_or_default()
        .to_string()
}

fn location_of(location: Option<EntityRef<'_>>) -> Option<Location> {
    let location = location?;
    let Entity::Location(record) = location.entity() else {
        return None;
    };
    Some(Location {
        file: label_of(location.one("file")),
        line: record.line,
    })
}

fn reference_of(resource: &EntityRef<'_>) -> String {
    format!(
        "{}[{}]",
        label_of(resource.one("resource_type")),
        resource.label().unwrap_or_default()
    )
}

fn node_names(issue: &EntityRef<'_>) -> Vec<String> {
    let names: BTreeSet<&str> = issue.many("nodes").labels().into_iter().collect();
    names.into_iter().map(str::to_string).collect()
}

fn attribute_rows(issue: &EntityRef<'_>) -> Vec<AttributeRow> {
    issue
        .many("attribute_issues")
        .iter()
        .filter_map(|attribute_issue| {
            let name = label_of(attribute_issue.one("attribute"));
            match attribute_issue.entity() {
                Entity::AttributeAdded(a) => Some(AttributeRow::Added {
                    name,
                    value: a.value.clone(),
                }),
                Entity::AttributeMissing(a) => Some(AttributeRow::Missing {
                    name,
                    value: a.value.clone(),
                }),
                Entity::AttributeConflict(a) => Some(AttributeRow::Conflicting {
                    name,
                    baseline_value: a.baseline_value.clone(),
                    preview_value: a.preview_value.clone(),
                    compliant: a.compliant,
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DeltaContext, DeltaEngine};
    use crate::model::{Catalog, CatalogEdge, CatalogResource};
    use crate::overview::{CompileLogEntry, Factory};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn catalog(env: &str, mode: &str, extra: bool) -> Catalog {
        let mut resources = vec![
            CatalogResource::new("File", "/etc/app.conf")
                .with_parameter("mode", json!(mode))
                .at("app.pp", 10),
            CatalogResource::new("Class", "App"),
        ];
        if extra {
            resources.push(CatalogResource::new("Package", "htop"));
        }
        Catalog {
            name: None,
            environment: env.to_string(),
            version: json!(1),
            resources,
            edges: vec![CatalogEdge::new("Class[App]", "File[/etc/app.conf]")],
        }
    }

    fn overview() -> Overview {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut factory = Factory::new();
        let engine = DeltaEngine::new();
        let baseline = catalog("production", "0644", false);
        // web01: conflict, web02: same conflict, web03: only an added package, web04: equal
        for (node, preview) in [
            ("web01", catalog("future", "0600", false)),
            ("web02", catalog("future", "0600", false)),
            ("web03", catalog("future", "0644", true)),
            ("web04", catalog("future", "0644", false)),
        ] {
            let delta = engine
                .compare(&baseline, &preview, &DeltaContext::new(node).at(ts))
                .unwrap();
            factory.merge(&delta).unwrap();
        }
        let log = [CompileLogEntry::new("err", "Unknown function").with_issue("UNKNOWN_FUNCTION").at("app.pp", 3)];
        factory.merge_failure("db01", "future", ts, 3, &log).unwrap();
        factory.merge_failure("db02", "future", ts, 3, &log).unwrap();
        factory.create_overview()
    }

    #[test]
    fn test_stats() {
        let overview = overview();
        let data = Report::new(&overview).build();
        assert_eq!(data.stats.node_count, 6);
        assert_eq!(data.stats.different.count, 2);
        assert_eq!(data.stats.compliant.count, 1);
        assert_eq!(data.stats.equal.count, 1);
        assert_eq!(data.stats.preview_failed.count, 2);
        assert_eq!(data.stats.preview_failed.percentage, 33.33);
        assert_eq!(data.stats.bucket(Severity::BaselineFailed).percentage, 0.0);
    }

    #[test]
    fn test_top_ten() {
        let overview = overview();
        let data = Report::new(&overview).build();
        let names: Vec<&str> = data.top_ten.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["web01", "web02", "web03"]);
        assert!(data.top_ten.iter().all(|r| r.issue_count == 1));

        let short = Report::new(&overview).with_top_n(1).build();
        assert_eq!(short.top_ten.len(), 1);
    }

    #[test]
    fn test_resource_changes_are_deduplicated() {
        let overview = overview();
        let data = Report::new(&overview).build();
        let file_changes = &data.changes.resource_type_changes["File"]["conflicting_resources"];
        let rows = &file_changes["/etc/app.conf"];
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nodes, ["web01", "web02"]);
        assert_eq!(rows[0].location.as_ref().map(|l| l.line), Some(10));
        assert_eq!(rows[0].attributes.len(), 1);
        assert_eq!(rows[0].attributes[0].name(), "mode");

        let added = &data.changes.resource_type_changes["Package"]["added_resources"]["htop"];
        assert_eq!(added[0].nodes, ["web03"]);
        assert!(data.changes.edge_changes.is_empty());
    }

    #[test]
    fn test_compilation_errors_collapse() {
        let overview = overview();
        let data = Report::new(&overview).build();
        let errors = data.compilation_errors.unwrap();
        assert!(errors.baseline.is_empty());
        assert_eq!(errors.preview.len(), 1);
        let row = &errors.preview[0];
        assert_eq!(row.issue.as_deref(), Some("UNKNOWN_FUNCTION"));
        assert_eq!(row.line, Some(3));
        assert_eq!(row.nodes, ["db01", "db02"]);
    }

    #[test]
    fn test_compilation_errors_keep_line_without_file() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut entry = CompileLogEntry::new("err", "Evaluation error").with_issue("EVAL");
        entry.line = Some(42);
        let mut factory = Factory::new();
        factory.merge_failure("db01", "future", ts, 2, &[entry.clone()]).unwrap();
        factory.merge_failure("db02", "future", ts, 2, &[entry]).unwrap();
        let overview = factory.create_overview();

        let errors = Report::new(&overview).build().compilation_errors.unwrap();
        assert!(errors.preview.is_empty());
        assert_eq!(errors.baseline.len(), 1);
        let row = &errors.baseline[0];
        assert_eq!(row.file, None);
        assert_eq!(row.line, Some(42));
        assert_eq!(row.nodes, ["db01", "db02"]);
    }

    #[test]
    fn test_report_value_shape() {
        let overview = overview();
        let value = Report::new(&overview).to_value().unwrap();
        assert!(value["stats"]["equal"]["count"].is_number());
        assert!(value["changes"]["resource_type_changes"].is_object());
        assert!(value["compilation_errors"]["preview"].is_array());
        assert_eq!(
            value["changes"]["resource_type_changes"]["File"]["conflicting_resources"]["/etc/app.conf"][0]
                ["attributes"][0]["change"],
            json!("conflicting")
        );
    }

    #[test]
    fn test_empty_overview() {
        let overview = Overview::default();
        let data = Report::new(&overview).build();
        assert_eq!(data.stats.node_count, 0);
        assert_eq!(data.stats.equal.percentage, 0.0);
        assert!(data.top_ten.is_empty());
        assert!(data.compilation_errors.is_none());
    }
}
