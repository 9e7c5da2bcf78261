//! Loading of input documents from disk.

use crate::diff::CatalogDelta;
use crate::error::{ErrorContext, PreviewError, Result};
use crate::model::Catalog;
use crate::overview::{CompileLogEntry, Overview};
use std::path::Path;

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| PreviewError::io(path, e))
}

/// Read and validate a catalog document.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    tracing::debug!(path = %path.display(), "loading catalog");
    let content = read(path)?;
    Catalog::from_json_str(&content).with_context(|| format!("loading catalog {}", path.display()))
}

/// Read a previously written delta.
pub fn load_delta(path: &Path) -> Result<CatalogDelta> {
    tracing::debug!(path = %path.display(), "loading delta");
    let content = read(path)?;
    CatalogDelta::from_json(&content).with_context(|| format!("loading delta {}", path.display()))
}

/// Read an overview snapshot.
pub fn load_overview(path: &Path) -> Result<Overview> {
    tracing::debug!(path = %path.display(), "loading overview");
    let content = read(path)?;
    Overview::from_json(&content).with_context(|| format!("loading overview {}", path.display()))
}

/// Read the compiler log of a failed compilation.
pub fn load_compile_log(path: &Path) -> Result<Vec<CompileLogEntry>> {
    CompileLogEntry::parse_file(path)
}
