//! `Type[title]` resource references.

use crate::error::{PreviewError, ReferenceErrorKind, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*)\[(.+)\]$")
            .expect("static resource reference regex")
    })
}

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("static type name regex")
    })
}

/// Capitalize every `::` segment of a type name (`foo::bar` becomes `Foo::Bar`).
#[must_use]
pub fn normalize_type_name(name: &str) -> String {
    name.split("::")
        .map(|segment| {
            let mut chars = segment.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join("::")
}

/// Validate and normalize a bare type name.
pub fn parse_type_name(name: &str) -> Result<String> {
    if type_pattern().is_match(name) {
        Ok(normalize_type_name(name))
    } else {
        Err(PreviewError::reference(
            "parsing resource type",
            ReferenceErrorKind::MalformedType(name.to_string()),
        ))
    }
}

/// A parsed reference to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    pub type_name: String,
    pub title: String,
}

impl ResourceRef {
    pub fn new(type_name: &str, title: impl Into<String>) -> Self {
        Self {
            type_name: normalize_type_name(type_name),
            title: title.into(),
        }
    }

    /// Parse a `Type[title]` string.
    pub fn parse(reference: &str) -> Result<Self> {
        let captures = reference_pattern()
            .captures(reference)
            .ok_or_else(|| PreviewError::malformed_resource(reference))?;
        Ok(Self::new(&captures[1], &captures[2]))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_reference() {
        let r = ResourceRef::parse("File[/tmp/x]").unwrap();
        assert_eq!(r.type_name, "File");
        assert_eq!(r.title, "/tmp/x");
        assert_eq!(r.to_string(), "File[/tmp/x]");
    }

    #[test]
    fn test_parse_namespaced_lowercase_reference() {
        let r = ResourceRef::parse("apache::vhost[default [80]]").unwrap();
        assert_eq!(r.type_name, "Apache::Vhost");
        assert_eq!(r.title, "default [80]");
    }

    #[test]
    fn test_malformed_references() {
        for bad in ["File", "File[]", "[x]", "File[x", "9File[x]", "File::[x]"] {
            let err = ResourceRef::parse(bad).expect_err(bad);
            assert!(err.is_reference(), "{bad}: {err}");
        }
    }

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("file"), "File");
        assert_eq!(normalize_type_name("FILE"), "File");
        assert_eq!(normalize_type_name("foo::bar_baz"), "Foo::Bar_baz");
        assert!(parse_type_name("foo bar").is_err());
    }
}
