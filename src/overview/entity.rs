//! Entity kinds stored in an overview.
//!
//! Every entity is a plain record with an integer `id` that is unique within
//! one overview. Relationships are foreign-key fields holding ids; they are
//! resolved by the query layer, never stored as pointers.

use crate::diff::CatalogDelta;
use crate::error::{ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of an entity within an overview.
pub type Id = u64;

/// Outcome class of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Equal,
    Compliant,
    Different,
    BaselineFailed,
    PreviewFailed,
}

impl Severity {
    /// All severities in report order.
    pub const ALL: [Self; 5] = [
        Self::Equal,
        Self::Compliant,
        Self::Different,
        Self::BaselineFailed,
        Self::PreviewFailed,
    ];

    /// Process exit code conventionally associated with this severity.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Equal => 0,
            Self::BaselineFailed => 2,
            Self::PreviewFailed => 3,
            Self::Compliant => 4,
            Self::Different => 5,
        }
    }

    #[must_use]
    pub const fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Equal),
            2 => Some(Self::BaselineFailed),
            3 => Some(Self::PreviewFailed),
            4 => Some(Self::Compliant),
            5 => Some(Self::Different),
            _ => None,
        }
    }

    /// Severity of a successful comparison.
    #[must_use]
    pub const fn of_delta(delta: &CatalogDelta) -> Self {
        if delta.preview_equal {
            Self::Equal
        } else if delta.preview_compliant {
            Self::Compliant
        } else {
            Self::Different
        }
    }

    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::BaselineFailed | Self::PreviewFailed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Compliant => "compliant",
            Self::Different => "different",
            Self::BaselineFailed => "baseline_failed",
            Self::PreviewFailed => "preview_failed",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// One host in one run; unique by `(name, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Id,
    pub name: String,
    pub timestamp: String,
    pub severity: Severity,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    pub id: Id,
    pub name: String,
}

/// An attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: Id,
    pub path: String,
}

/// A position in a source file; compiler output may carry a line only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: Id,
    pub file_id: Option<Id>,
    pub line: u64,
}

/// One catalog compilation of a node against an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compilation {
    pub id: Id,
    pub node_id: Id,
    pub environment_id: Id,
    /// Baseline (`true`) or preview (`false`) side
    pub baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevel {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogIssue {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub id: Id,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Id,
    pub compilation_id: Id,
    pub level_id: Id,
    pub issue_id: Option<Id>,
    pub message_id: Id,
    pub location_id: Option<Id>,
}

/// A resource identity, shared by every issue that mentions it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Id,
    pub type_id: Id,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAdded {
    pub id: Id,
    pub resource_id: Id,
    pub location_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMissing {
    pub id: Id,
    pub resource_id: Id,
    pub location_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConflict {
    pub id: Id,
    pub resource_id: Id,
    pub baseline_location_id: Option<Id>,
    pub preview_location_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAdded {
    pub id: Id,
    pub source_id: Id,
    pub target_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMissing {
    pub id: Id,
    pub source_id: Id,
    pub target_id: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAdded {
    pub id: Id,
    pub issue_id: Id,
    pub attribute_id: Id,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMissing {
    pub id: Id,
    pub issue_id: Id,
    pub attribute_id: Id,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeConflict {
    pub id: Id,
    pub issue_id: Id,
    pub attribute_id: Id,
    pub baseline_value: Value,
    pub preview_value: Value,
    pub compliant: bool,
}

/// Join between a node and one of its edge or resource issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOnNode {
    pub id: Id,
    pub node_id: Id,
    pub issue_id: Id,
}

// ============================================================================
// Sum type
// ============================================================================

/// Generates [`EntityKind`], the [`Entity`] sum type and its mechanical
/// accessors from the list of record types.
macro_rules! entity_kinds {
    ($($kind:ident),* $(,)?) => {
        /// Discriminant of an [`Entity`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EntityKind {
            $($kind),*
        }

        impl EntityKind {
            pub const ALL: &'static [Self] = &[$(Self::$kind),*];

            /// Name used in the wire format.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$kind => stringify!($kind)),*
                }
            }

            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($kind) => Some(Self::$kind),)*
                    _ => None,
                }
            }
        }

        /// Any entity of an overview.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Entity {
            $($kind($kind)),*
        }

        impl Entity {
            #[must_use]
            pub const fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$kind(_) => EntityKind::$kind),*
                }
            }

            #[must_use]
            pub const fn id(&self) -> Id {
                match self {
                    $(Self::$kind(e) => e.id),*
                }
            }

            pub(crate) fn set_id(&mut self, id: Id) {
                match self {
                    $(Self::$kind(e) => e.id = id),*
                }
            }

            /// All fields, including `id`, as a JSON object.
            pub fn fields(&self) -> Result<Value> {
                let value = match self {
                    $(Self::$kind(e) => serde_json::to_value(e)),*
                };
                value.with_context(|| format!("serializing {} {}", self.kind(), self.id()))
            }

            /// Rebuild an entity of `kind` from its JSON fields.
            pub fn from_fields(kind: EntityKind, fields: Value) -> Result<Self> {
                let entity = match kind {
                    $(EntityKind::$kind => serde_json::from_value(fields).map(Self::$kind)),*
                };
                entity.with_context(|| format!("reading {kind} fields"))
            }
        }

        $(
            impl From<$kind> for Entity {
                fn from(entity: $kind) -> Self {
                    Self::$kind(entity)
                }
            }
        )*
    };
}

entity_kinds!(
    Node,
    Environment,
    ResourceType,
    Attribute,
    SourceFile,
    Location,
    Compilation,
    LogLevel,
    LogIssue,
    LogMessage,
    LogEntry,
    Resource,
    ResourceAdded,
    ResourceMissing,
    ResourceConflict,
    EdgeAdded,
    EdgeMissing,
    AttributeAdded,
    AttributeMissing,
    AttributeConflict,
    IssueOnNode,
);

impl EntityKind {
    pub const EDGE_ISSUES: &'static [Self] = &[Self::EdgeMissing, Self::EdgeAdded];
    pub const RESOURCE_ISSUES: &'static [Self] = &[
        Self::ResourceMissing,
        Self::ResourceAdded,
        Self::ResourceConflict,
    ];
    pub const NODE_ISSUES: &'static [Self] = &[
        Self::EdgeMissing,
        Self::EdgeAdded,
        Self::ResourceMissing,
        Self::ResourceAdded,
        Self::ResourceConflict,
    ];
    pub const ATTRIBUTE_ISSUES: &'static [Self] = &[
        Self::AttributeMissing,
        Self::AttributeAdded,
        Self::AttributeConflict,
    ];
    pub const LOG_KINDS: &'static [Self] = &[
        Self::LogLevel,
        Self::LogIssue,
        Self::LogMessage,
        Self::LogEntry,
    ];

    /// Kinds the foreign key `field` of this kind may point at; empty when
    /// the kind has no such key.
    #[must_use]
    pub fn key_targets(self, field: &str) -> &'static [Self] {
        match (self, field) {
            (Self::Location, "file") => &[Self::SourceFile],
            (Self::Compilation, "node") | (Self::IssueOnNode, "node") => &[Self::Node],
            (Self::Compilation, "environment") => &[Self::Environment],
            (Self::LogEntry, "compilation") => &[Self::Compilation],
            (Self::LogEntry, "level") => &[Self::LogLevel],
            (Self::LogEntry, "issue") => &[Self::LogIssue],
            (Self::LogEntry, "message") => &[Self::LogMessage],
            (Self::LogEntry | Self::ResourceAdded | Self::ResourceMissing, "location")
            | (Self::ResourceConflict, "baseline_location" | "preview_location") => {
                &[Self::Location]
            }
            (Self::Resource, "resource_type") => &[Self::ResourceType],
            (Self::ResourceAdded | Self::ResourceMissing | Self::ResourceConflict, "resource")
            | (Self::EdgeAdded | Self::EdgeMissing, "source" | "target") => &[Self::Resource],
            (Self::AttributeAdded | Self::AttributeMissing | Self::AttributeConflict, "issue") => {
                &[Self::ResourceConflict]
            }
            (Self::AttributeAdded | Self::AttributeMissing | Self::AttributeConflict, "attribute") => {
                &[Self::Attribute]
            }
            (Self::IssueOnNode, "issue") => Self::NODE_ISSUES,
            _ => &[],
        }
    }

    /// Whether this kind is in `group`.
    #[must_use]
    pub fn is_in(self, group: &[Self]) -> bool {
        group.contains(&self)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A foreign key held by an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: &'static str,
    pub target: Id,
    /// Kinds the target may have
    pub kinds: &'static [EntityKind],
}

impl Entity {
    /// Foreign keys of this entity, optional keys only when set.
    #[must_use]
    pub fn references(&self) -> Vec<ForeignKey> {
        let kind = self.kind();
        let key = |field: &'static str, target: Id| ForeignKey {
            field,
            target,
            kinds: kind.key_targets(field),
        };
        let optional = |field: &'static str, target: Option<Id>| target.map(|id| key(field, id));

        match self {
            Self::Node(_)
            | Self::Environment(_)
            | Self::ResourceType(_)
            | Self::Attribute(_)
            | Self::SourceFile(_)
            | Self::LogLevel(_)
            | Self::LogIssue(_)
            | Self::LogMessage(_) => Vec::new(),
            Self::Location(e) => optional("file", e.file_id)
                .into_iter()
                .collect(),
            Self::Compilation(e) => vec![
                key("node", e.node_id),
                key("environment", e.environment_id),
            ],
            Self::LogEntry(e) => [
                Some(key("compilation", e.compilation_id)),
                Some(key("level", e.level_id)),
                optional("issue", e.issue_id),
                Some(key("message", e.message_id)),
                optional("location", e.location_id),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Self::Resource(e) => vec![key("resource_type", e.type_id)],
            Self::ResourceAdded(ResourceAdded {
                resource_id,
                location_id,
                ..
            })
            | Self::ResourceMissing(ResourceMissing {
                resource_id,
                location_id,
                ..
            }) => [
                Some(key("resource", *resource_id)),
                optional("location", *location_id),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Self::ResourceConflict(e) => [
                Some(key("resource", e.resource_id)),
                optional("baseline_location", e.baseline_location_id),
                optional("preview_location", e.preview_location_id),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Self::EdgeAdded(EdgeAdded {
                source_id,
                target_id,
                ..
            })
            | Self::EdgeMissing(EdgeMissing {
                source_id,
                target_id,
                ..
            }) => vec![
                key("source", *source_id),
                key("target", *target_id),
            ],
            Self::AttributeAdded(AttributeAdded {
                issue_id,
                attribute_id,
                ..
            })
            | Self::AttributeMissing(AttributeMissing {
                issue_id,
                attribute_id,
                ..
            })
            | Self::AttributeConflict(AttributeConflict {
                issue_id,
                attribute_id,
                ..
            }) => vec![
                key("issue", *issue_id),
                key("attribute", *attribute_id),
            ],
            Self::IssueOnNode(e) => vec![
                key("node", e.node_id),
                key("issue", e.issue_id),
            ],
        }
    }

    /// Target of the foreign key named `field`, if set.
    #[must_use]
    pub fn reference(&self, field: &str) -> Option<Id> {
        self.references()
            .into_iter()
            .find(|key| key.field == field)
            .map(|key| key.target)
    }

    /// The node record, when this is a node.
    #[must_use]
    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Display name of named entities (nodes, environments, types, attributes,
    /// log levels and issues), path of source files, text of log messages.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Node(Node { name, .. })
            | Self::Environment(Environment { name, .. })
            | Self::ResourceType(ResourceType { name, .. })
            | Self::Attribute(Attribute { name, .. })
            | Self::LogLevel(LogLevel { name, .. })
            | Self::LogIssue(LogIssue { name, .. }) => Some(name.as_str()),
            Self::SourceFile(SourceFile { path, .. }) => Some(path.as_str()),
            Self::LogMessage(LogMessage { message, .. }) => Some(message.as_str()),
            Self::Resource(Resource { title, .. }) => Some(title.as_str()),
            _ => None,
        }
    }
}
