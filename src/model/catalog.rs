//! Catalog documents as produced by the external compiler.

use crate::error::{ErrorContext, PreviewError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A compiled resource graph for one host under one configuration source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Host the catalog was compiled for, when the compiler records it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Environment (configuration source) name
    pub environment: String,
    /// Opaque version token, compared only for equality
    pub version: Value,
    /// Resources in declaration order
    pub resources: Vec<CatalogResource>,
    /// Dependency edges between resources
    pub edges: Vec<CatalogEdge>,
}

/// One resource of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResource {
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
}

/// A dependency edge; both ends are `Type[title]` reference strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEdge {
    pub source: String,
    pub target: String,
}

impl Catalog {
    /// Parse and validate a catalog from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("parsing catalog JSON")?;
        Self::from_value(value)
    }

    /// Validate and construct a catalog from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let catalog: Self = serde_json::from_value(value).context("reading catalog document")?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Number of resources in the catalog.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn validate(&self) -> Result<()> {
        if self.environment.trim().is_empty() {
            return Err(PreviewError::invalid_value(
                "environment",
                "must be a non-empty string",
            ));
        }
        for (idx, resource) in self.resources.iter().enumerate() {
            if resource.type_name.trim().is_empty() {
                return Err(PreviewError::invalid_value(
                    format!("resources[{idx}].type"),
                    "must be a non-empty string",
                ));
            }
            if resource.title.is_empty() {
                return Err(PreviewError::invalid_value(
                    format!("resources[{idx}].title"),
                    "must be a non-empty string",
                ));
            }
        }
        Ok(())
    }
}

impl CatalogResource {
    /// Create a resource with no parameters, tags or source position.
    pub fn new(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            title: title.into(),
            file: None,
            line: None,
            exported: false,
            tags: Vec::new(),
            parameters: IndexMap::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Set the source position.
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u64) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl CatalogEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
