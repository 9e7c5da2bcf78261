//! Delta result structures.

use crate::error::{ErrorContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the producing tool, recorded in every delta.
pub const PRODUCED_BY: &str = concat!("catalog-delta ", env!("CARGO_PKG_VERSION"));

/// Source position of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u64,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u64) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A named attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            value,
        }
    }
}

/// A dependency edge between two resource references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// An attribute present on both sides with different values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConflict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub baseline_value: Value,
    pub preview_value: Value,
    pub compliant: bool,
}

/// A resource found on only one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub location: Option<Location>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    /// Cleared after comparison unless verbose output was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

impl Resource {
    /// `Type[title]` reference of this resource.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}[{}]", self.type_name, self.title)
    }

    fn assign_ids(&mut self, next: &mut u64) {
        self.id = Some(take(next));
        for attribute in self.attributes.iter_mut().flatten() {
            attribute.id = Some(take(next));
        }
    }
}

/// A resource present on both sides with differing attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConflict {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub baseline_location: Option<Location>,
    pub preview_location: Option<Location>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    pub equal_attribute_count: usize,
    pub added_attribute_count: usize,
    pub missing_attribute_count: usize,
    pub conflicting_attribute_count: usize,
    pub added_attributes: Vec<Attribute>,
    pub missing_attributes: Vec<Attribute>,
    pub conflicting_attributes: Vec<AttributeConflict>,
    /// No missing attributes and every conflict compliant
    pub compliant: bool,
}

impl ResourceConflict {
    /// `Type[title]` reference of this resource.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}[{}]", self.type_name, self.title)
    }

    /// Whether no attribute findings remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_attributes.is_empty()
            && self.missing_attributes.is_empty()
            && self.conflicting_attributes.is_empty()
    }

    /// Recompute counts and compliance from the finding lists.
    pub fn refresh(&mut self) {
        self.added_attribute_count = self.added_attributes.len();
        self.missing_attribute_count = self.missing_attributes.len();
        self.conflicting_attribute_count = self.conflicting_attributes.len();
        self.compliant = self.missing_attributes.is_empty()
            && self.conflicting_attributes.iter().all(|c| c.compliant);
    }

    fn assign_ids(&mut self, next: &mut u64) {
        self.id = Some(take(next));
        for attribute in self
            .added_attributes
            .iter_mut()
            .chain(self.missing_attributes.iter_mut())
        {
            attribute.id = Some(take(next));
        }
        for conflict in &mut self.conflicting_attributes {
            conflict.id = Some(take(next));
        }
    }
}

fn take(next: &mut u64) -> u64 {
    let id = *next;
    *next += 1;
    id
}

/// Per-category counts of a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSummary {
    pub baseline_resource_count: usize,
    pub preview_resource_count: usize,
    pub added_resource_count: usize,
    pub missing_resource_count: usize,
    pub conflicting_resource_count: usize,
    pub equal_resource_count: usize,
    pub added_attribute_count: usize,
    pub missing_attribute_count: usize,
    pub conflicting_attribute_count: usize,
    pub equal_attribute_count: usize,
    pub baseline_edge_count: usize,
    pub preview_edge_count: usize,
    pub added_edge_count: usize,
    pub missing_edge_count: usize,
    pub equal_edge_count: usize,
}

impl DeltaSummary {
    /// Whether every finding count is zero.
    #[must_use]
    pub const fn has_findings(&self) -> bool {
        self.added_resource_count > 0
            || self.missing_resource_count > 0
            || self.conflicting_resource_count > 0
            || self.added_edge_count > 0
            || self.missing_edge_count > 0
    }
}

/// Complete result of comparing a baseline and a preview catalog for one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct CatalogDelta {
    pub produced_by: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    pub baseline_env: String,
    pub preview_env: String,
    pub baseline_catalog: Option<String>,
    pub preview_catalog: Option<String>,
    pub node_name: String,
    pub version_equal: bool,
    pub preview_compliant: bool,
    pub preview_equal: bool,
    #[serde(flatten)]
    pub summary: DeltaSummary,
    pub added_resources: Vec<Resource>,
    pub missing_resources: Vec<Resource>,
    pub conflicting_resources: Vec<ResourceConflict>,
    pub added_edges: Vec<Edge>,
    pub missing_edges: Vec<Edge>,
}

impl CatalogDelta {
    /// Serialize into the JSON object representation.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).context("serializing catalog delta")
    }

    /// Rebuild a delta from its JSON object representation.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("reading catalog delta")
    }

    /// Serialize to pretty-printed JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing catalog delta")
    }

    /// Parse a delta from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("reading catalog delta")
    }

    /// Recompute the derived compliance flags from the findings.
    pub fn derive_compliance(&mut self) {
        self.preview_compliant = self.missing_resources.is_empty()
            && self.missing_edges.is_empty()
            && self.conflicting_resources.iter().all(|c| c.compliant);
        self.preview_equal = self.preview_compliant
            && self.conflicting_resources.is_empty()
            && self.added_resources.is_empty()
            && self.added_edges.is_empty();
    }

    /// Assign sequential ids, starting at `start`, in traversal order:
    /// added resources, missing resources, conflicting resources (each with
    /// its attribute findings), added edges, missing edges.
    ///
    /// Returns the next unused id.
    pub fn assign_ids(&mut self, start: u64) -> u64 {
        let mut next = start;
        for resource in self
            .added_resources
            .iter_mut()
            .chain(self.missing_resources.iter_mut())
        {
            resource.assign_ids(&mut next);
        }
        for conflict in &mut self.conflicting_resources {
            conflict.assign_ids(&mut next);
        }
        for edge in self.added_edges.iter_mut().chain(self.missing_edges.iter_mut()) {
            edge.id = Some(take(&mut next));
        }
        next
    }

    /// Drop the attribute sets of added and missing resources.
    pub fn clear_resource_attributes(&mut self) {
        for resource in self
            .added_resources
            .iter_mut()
            .chain(self.missing_resources.iter_mut())
        {
            resource.attributes = None;
        }
    }
}

/// ISO-8601 UTC timestamps with nanosecond precision.
mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Format a timestamp the way deltas record it.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn conflict(title: &str) -> ResourceConflict {
        let mut c = ResourceConflict {
            id: None,
            baseline_location: None,
            preview_location: None,
            type_name: "File".to_string(),
            title: title.to_string(),
            equal_attribute_count: 0,
            added_attribute_count: 0,
            missing_attribute_count: 0,
            conflicting_attribute_count: 0,
            added_attributes: vec![Attribute::new("owner", json!("root"))],
            missing_attributes: vec![Attribute::new("mode", json!("0644"))],
            conflicting_attributes: vec![AttributeConflict {
                id: None,
                name: "content".to_string(),
                baseline_value: json!("a"),
                preview_value: json!("b"),
                compliant: false,
            }],
            compliant: true,
        };
        c.refresh();
        c
    }

    fn delta() -> CatalogDelta {
        CatalogDelta {
            produced_by: PRODUCED_BY.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            baseline_env: "production".to_string(),
            preview_env: "future".to_string(),
            baseline_catalog: None,
            preview_catalog: None,
            node_name: "web01".to_string(),
            version_equal: false,
            preview_compliant: false,
            preview_equal: false,
            summary: DeltaSummary::default(),
            added_resources: vec![Resource {
                id: None,
                location: None,
                type_name: "Package".to_string(),
                title: "nginx".to_string(),
                attributes: Some(vec![Attribute::new("ensure", json!("installed"))]),
            }],
            missing_resources: vec![],
            conflicting_resources: vec![conflict("/tmp/x")],
            added_edges: vec![Edge::new("Class[main]", "Package[nginx]")],
            missing_edges: vec![Edge::new("Class[main]", "File[/tmp/y]")],
        }
    }

    #[test]
    fn test_refresh_counts_and_compliance() {
        let c = conflict("/tmp/x");
        assert_eq!(c.added_attribute_count, 1);
        assert_eq!(c.missing_attribute_count, 1);
        assert_eq!(c.conflicting_attribute_count, 1);
        assert!(!c.compliant);
    }

    #[test]
    fn test_id_traversal_order() {
        let mut d = delta();
        let next = d.assign_ids(1);
        // added resource + its attribute
        assert_eq!(d.added_resources[0].id, Some(1));
        assert_eq!(d.added_resources[0].attributes.as_ref().unwrap()[0].id, Some(2));
        // conflict, then added, missing, conflicting attribute findings
        let c = &d.conflicting_resources[0];
        assert_eq!(c.id, Some(3));
        assert_eq!(c.added_attributes[0].id, Some(4));
        assert_eq!(c.missing_attributes[0].id, Some(5));
        assert_eq!(c.conflicting_attributes[0].id, Some(6));
        assert_eq!(d.added_edges[0].id, Some(7));
        assert_eq!(d.missing_edges[0].id, Some(8));
        assert_eq!(next, 9);
    }

    #[test]
    fn test_derive_compliance() {
        let mut d = delta();
        d.derive_compliance();
        assert!(!d.preview_compliant);
        assert!(!d.preview_equal);

        d.missing_edges.clear();
        d.conflicting_resources[0].missing_attributes.clear();
        d.conflicting_resources[0].conflicting_attributes[0].compliant = true;
        d.conflicting_resources[0].refresh();
        d.derive_compliance();
        assert!(d.preview_compliant);
        assert!(!d.preview_equal);
    }

    #[test]
    fn test_timestamp_has_nanoseconds() {
        let value = delta().to_value().unwrap();
        assert_eq!(value["timestamp"], json!("2024-05-01T12:00:00.000000000Z"));
        // counts are flattened into the top-level object
        assert_eq!(value["added_resource_count"], json!(0));
    }

    #[test]
    fn test_round_trip() {
        let mut d = delta();
        d.assign_ids(1);
        d.clear_resource_attributes();
        let value = d.to_value().unwrap();
        let back = CatalogDelta::from_value(value.clone()).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.to_value().unwrap(), value);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = CatalogDelta::from_value(json!({"node_name": "web01"})).expect_err("partial");
        assert!(err.is_validation());
    }
}
