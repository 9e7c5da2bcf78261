//! Declared relationships of every entity kind.
//!
//! Navigation is table driven: each kind maps relationship names to a
//! [`Traversal`]. Names not in the table fall back to reading a plain field.

use crate::overview::EntityKind;

/// How a relationship is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Follow this entity's own foreign key.
    Key(&'static str),
    /// Entities of `kinds` whose foreign key `field` points at this entity.
    Reverse {
        kinds: &'static [EntityKind],
        field: &'static str,
        /// Keep only referrers whose boolean field has the given value
        flag: Option<(&'static str, bool)>,
        /// Collapse the result to its first entity
        single: bool,
    },
    /// Compose relationships of the intermediate kinds, left to right.
    Path(&'static [&'static str]),
}

const fn reverse(kinds: &'static [EntityKind], field: &'static str) -> Traversal {
    Traversal::Reverse {
        kinds,
        field,
        flag: None,
        single: false,
    }
}

const fn reverse_one(
    kinds: &'static [EntityKind],
    field: &'static str,
    flag: (&'static str, bool),
) -> Traversal {
    Traversal::Reverse {
        kinds,
        field,
        flag: Some(flag),
        single: true,
    }
}

type Table = &'static [(&'static str, Traversal)];

use EntityKind as K;
use Traversal::{Key, Path};

const NODE: Table = &[
    ("compilations", reverse(&[K::Compilation], "node")),
    (
        "baseline_compilation",
        reverse_one(&[K::Compilation], "node", ("baseline", true)),
    ),
    (
        "preview_compilation",
        reverse_one(&[K::Compilation], "node", ("baseline", false)),
    ),
    (
        "baseline_environment",
        Path(&["baseline_compilation", "environment"]),
    ),
    (
        "preview_environment",
        Path(&["preview_compilation", "environment"]),
    ),
    ("issue_on_nodes", reverse(&[K::IssueOnNode], "node")),
    ("issues", Path(&["issue_on_nodes", "issue"])),
    ("log_entries", Path(&["compilations", "log_entries"])),
];

const ENVIRONMENT: Table = &[
    ("compilations", reverse(&[K::Compilation], "environment")),
    ("nodes", Path(&["compilations", "node"])),
];

const COMPILATION: Table = &[
    ("node", Key("node")),
    ("environment", Key("environment")),
    ("log_entries", reverse(&[K::LogEntry], "compilation")),
];

const RESOURCE_TYPE: Table = &[("resources", reverse(&[K::Resource], "resource_type"))];

const RESOURCE: Table = &[
    ("resource_type", Key("resource_type")),
    ("issues", reverse(K::RESOURCE_ISSUES, "resource")),
    ("edges_from", reverse(K::EDGE_ISSUES, "source")),
    ("edges_to", reverse(K::EDGE_ISSUES, "target")),
];

const SOURCE_FILE: Table = &[("locations", reverse(&[K::Location], "file"))];

const LOCATION: Table = &[("file", Key("file"))];

const ATTRIBUTE: Table = &[("issues", reverse(K::ATTRIBUTE_ISSUES, "attribute"))];

const LOG_LEVEL: Table = &[("log_entries", reverse(&[K::LogEntry], "level"))];
const LOG_ISSUE: Table = &[("log_entries", reverse(&[K::LogEntry], "issue"))];
const LOG_MESSAGE: Table = &[("log_entries", reverse(&[K::LogEntry], "message"))];

const LOG_ENTRY: Table = &[
    ("compilation", Key("compilation")),
    ("level", Key("level")),
    ("issue", Key("issue")),
    ("message", Key("message")),
    ("location", Key("location")),
    ("node", Path(&["compilation", "node"])),
];

const RESOURCE_ISSUE: Table = &[
    ("resource", Key("resource")),
    ("location", Key("location")),
    ("resource_type", Path(&["resource", "resource_type"])),
    ("issue_on_nodes", reverse(&[K::IssueOnNode], "issue")),
    ("nodes", Path(&["issue_on_nodes", "node"])),
];

const RESOURCE_CONFLICT: Table = &[
    ("resource", Key("resource")),
    ("baseline_location", Key("baseline_location")),
    ("preview_location", Key("preview_location")),
    ("resource_type", Path(&["resource", "resource_type"])),
    ("attribute_issues", reverse(K::ATTRIBUTE_ISSUES, "issue")),
    ("issue_on_nodes", reverse(&[K::IssueOnNode], "issue")),
    ("nodes", Path(&["issue_on_nodes", "node"])),
];

const EDGE_ISSUE: Table = &[
    ("source", Key("source")),
    ("target", Key("target")),
    ("issue_on_nodes", reverse(&[K::IssueOnNode], "issue")),
    ("nodes", Path(&["issue_on_nodes", "node"])),
];

const ATTRIBUTE_ISSUE: Table = &[("issue", Key("issue")), ("attribute", Key("attribute"))];

const ISSUE_ON_NODE: Table = &[("node", Key("node")), ("issue", Key("issue"))];

/// Relationship table of `kind`.
#[must_use]
pub fn relationships(kind: EntityKind) -> Table {
    match kind {
        K::Node => NODE,
        K::Environment => ENVIRONMENT,
        K::Compilation => COMPILATION,
        K::ResourceType => RESOURCE_TYPE,
        K::Resource => RESOURCE,
        K::SourceFile => SOURCE_FILE,
        K::Location => LOCATION,
        K::Attribute => ATTRIBUTE,
        K::LogLevel => LOG_LEVEL,
        K::LogIssue => LOG_ISSUE,
        K::LogMessage => LOG_MESSAGE,
        K::LogEntry => LOG_ENTRY,
        K::ResourceAdded | K::ResourceMissing => RESOURCE_ISSUE,
        K::ResourceConflict => RESOURCE_CONFLICT,
        K::EdgeAdded | K::EdgeMissing => EDGE_ISSUE,
        K::AttributeAdded | K::AttributeMissing | K::AttributeConflict => ATTRIBUTE_ISSUE,
        K::IssueOnNode => ISSUE_ON_NODE,
    }
}

/// Traversal of the relationship `name` on `kind`, if declared.
#[must_use]
pub fn relationship(kind: EntityKind, name: &str) -> Option<Traversal> {
    relationships(kind)
        .iter()
        .find(|(declared, _)| *declared == name)
        .map(|(_, traversal)| *traversal)
}

/// Whether following `traversal` from an entity of `kind` reaches at most
/// one entity. Paths are to-one only when every step is.
#[must_use]
pub fn is_to_one(kind: EntityKind, traversal: Traversal) -> bool {
    reach(kind, traversal).1
}

fn reach(kind: EntityKind, traversal: Traversal) -> (Vec<EntityKind>, bool) {
    match traversal {
        Key(field) => (kind.key_targets(field).to_vec(), true),
        Traversal::Reverse { kinds, single, .. } => (kinds.to_vec(), single),
        Path(steps) => {
            let mut kinds = vec![kind];
            let mut to_one = true;
            for step in steps {
                let mut next = Vec::new();
                for current in &kinds {
                    let Some(traversal) = relationship(*current, step) else {
                        continue;
                    };
                    let (reached, one) = reach(*current, traversal);
                    to_one &= one;
                    for target in reached {
                        if !next.contains(&target) {
                            next.push(target);
                        }
                    }
                }
                kinds = next;
            }
            (kinds, to_one)
        }
    }
}
