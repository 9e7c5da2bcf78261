//! User supplied rules that suppress findings.
//!
//! Rules are loaded from a JSON array:
//!
//! ```json
//! [
//!   {"type": "file", "title": "/etc/motd"},
//!   {"type": "Service"},
//!   {"type": "file", "title": "/tmp/x", "attributes": ["ensure", "mode"]}
//! ]
//! ```
//!
//! A rule without attribute names suppresses whole resources; a rule with
//! attribute names suppresses only those attribute findings inside a conflict.

use crate::error::{ErrorContext, PreviewError, Result};
use crate::model::{parse_type_name, ResourceRef};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One suppression rule. Absent fields act as wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Exclude {
    /// Resource type, matched case-insensitively per `::` segment
    #[serde(rename = "type")]
    pub type_name: String,
    /// Resource title; all titles when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Attribute names to suppress; the whole resource when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,
}

impl Exclude {
    /// Rule suppressing every resource of a type.
    pub fn resource_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            title: None,
            attributes: None,
        }
    }

    /// Rule suppressing one resource.
    pub fn resource(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            title: Some(title.into()),
            attributes: None,
        }
    }

    /// Restrict the rule to the given attribute names.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a rule list from JSON text.
    pub fn parse_json(content: &str) -> Result<Vec<Self>> {
        let rules: Vec<Self> = serde_json::from_str(content).context("parsing exclude rules")?;
        for (idx, rule) in rules.iter().enumerate() {
            rule.validate()
                .with_context(|| format!("exclude rule #{idx}"))?;
        }
        Ok(rules)
    }

    /// Read and parse a rule file.
    pub fn parse_file(path: &Path) -> Result<Vec<Self>> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PreviewError::io(path, e))?;
        Self::parse_json(&content)
            .with_context(|| format!("reading exclude file {}", path.display()))
    }

    /// JSON Schema of the rule file format.
    #[must_use]
    pub fn json_schema() -> String {
        let schema = schemars::schema_for!(Vec<Exclude>);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        parse_type_name(&self.type_name)?;
        if matches!(&self.title, Some(title) if title.is_empty()) {
            return Err(PreviewError::invalid_value("title", "must not be empty"));
        }
        if let Some(names) = &self.attributes {
            if names.is_empty() {
                return Err(PreviewError::invalid_value(
                    "attributes",
                    "must name at least one attribute",
                ));
            }
            if names.iter().any(String::is_empty) {
                return Err(PreviewError::invalid_value(
                    "attributes",
                    "attribute names must not be empty",
                ));
            }
        }
        Ok(())
    }
}

/// A rule with its type name normalized for matching.
#[derive(Debug, Clone)]
struct CompiledRule {
    type_name: String,
    title: Option<String>,
    attributes: Option<HashSet<String>>,
}

impl CompiledRule {
    fn matches(&self, type_name: &str, title: &str) -> bool {
        self.type_name == type_name && self.title.as_deref().map_or(true, |t| t == title)
    }
}

/// Evaluates a rule set against resources, attributes and edges.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    rules: Vec<CompiledRule>,
}

impl ExclusionFilter {
    /// Compile a rule set.
    pub fn new(rules: &[Exclude]) -> Result<Self> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| {
                rule.validate()
                    .with_context(|| format!("exclude rule #{idx}"))?;
                Ok(CompiledRule {
                    type_name: parse_type_name(&rule.type_name)?,
                    title: rule.title.clone(),
                    attributes: rule
                        .attributes
                        .as_ref()
                        .map(|names| names.iter().cloned().collect()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether all findings for this resource are suppressed.
    #[must_use]
    pub fn excludes_resource(&self, type_name: &str, title: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.attributes.is_none() && rule.matches(type_name, title))
    }

    /// Attribute names whose findings are suppressed for this resource.
    #[must_use]
    pub fn excluded_attributes(&self, type_name: &str, title: &str) -> HashSet<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(type_name, title))
            .filter_map(|rule| rule.attributes.as_ref())
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Whether an edge touches a fully suppressed resource.
    ///
    /// Both ends must already be known to parse; unparsable ends never match.
    #[must_use]
    pub fn excludes_edge(&self, source: &str, target: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        [source, target].iter().any(|end| {
            ResourceRef::parse(end)
                .map(|r| self.excludes_resource(&r.type_name, &r.title))
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_file() {
        let rules = Exclude::parse_json(
            r#"[
                {"type": "file", "title": "/tmp/x", "attributes": ["ensure"]},
                {"type": "Service"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0],
            Exclude::resource("file", "/tmp/x").with_attributes(["ensure"])
        );
        assert_eq!(rules[1], Exclude::resource_type("Service"));
    }

    #[test]
    fn test_schema_violations_are_rejected() {
        for bad in [
            r#"{"type": "File"}"#,
            r#"[{"title": "/tmp/x"}]"#,
            r#"[{"type": "File", "titel": "/tmp/x"}]"#,
            r#"[{"type": "File", "attributes": "ensure"}]"#,
            r#"[{"type": "File", "attributes": []}]"#,
        ] {
            let err = Exclude::parse_json(bad).expect_err(bad);
            assert!(err.is_validation(), "{bad}: {err}");
        }
    }

    #[test]
    fn test_malformed_type_is_reference_error() {
        let err = Exclude::parse_json(r#"[{"type": "not a type"}]"#).expect_err("bad type");
        assert!(err.is_reference());
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("excludes.json");
        std::fs::write(&path, r#"[{"type": "notify"}]"#).unwrap();
        let rules = Exclude::parse_file(&path).unwrap();
        assert_eq!(rules, vec![Exclude::resource_type("notify")]);

        let missing = Exclude::parse_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(PreviewError::Io { .. })));
    }

    #[test]
    fn test_resource_matching() {
        let filter = ExclusionFilter::new(&[
            Exclude::resource_type("service"),
            Exclude::resource("file", "/etc/motd"),
            Exclude::resource("file", "/tmp/x").with_attributes(["ensure", "mode"]),
        ])
        .unwrap();

        assert!(filter.excludes_resource("Service", "nginx"));
        assert!(filter.excludes_resource("File", "/etc/motd"));
        assert!(!filter.excludes_resource("File", "/tmp/x"));
        assert!(!filter.excludes_resource("Package", "nginx"));

        let names = filter.excluded_attributes("File", "/tmp/x");
        assert_eq!(names.len(), 2);
        assert!(names.contains("ensure"));
        assert!(filter.excluded_attributes("File", "/etc/hosts").is_empty());
    }

    #[test]
    fn test_edge_matching() {
        let filter = ExclusionFilter::new(&[Exclude::resource_type("Service")]).unwrap();
        assert!(filter.excludes_edge("Package[nginx]", "Service[nginx]"));
        assert!(!filter.excludes_edge("Package[nginx]", "File[/etc/nginx.conf]"));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = Exclude::json_schema();
        assert!(schema.contains("\"type\""));
        assert!(schema.contains("attributes"));
    }
}
