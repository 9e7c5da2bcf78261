//! Immutable overview snapshots and their wire format.
//!
//! ```json
//! {"entities": {"1": ["Node", {"id": 1, "name": "web01", ...}], ...}}
//! ```

use super::entity::{Entity, EntityKind, Id};
use crate::error::{
    ErrorContext, OptionContext, PreviewError, ReferenceErrorKind, Result, ValidationErrorKind,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// One entity pointing at another through a named foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Referrer {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: Id,
}

/// Merged, deduplicated graph of deltas and compile failures.
///
/// Snapshots never change; take a new one from a
/// [`Factory`](super::Factory) after further merges.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Overview {
    entities: BTreeMap<Id, Entity>,
    by_kind: BTreeMap<EntityKind, Vec<Id>>,
    referrers: HashMap<Id, Vec<Referrer>>,
}

impl PartialEq for Overview {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
    }
}

impl Overview {
    pub(crate) fn from_entities(entities: BTreeMap<Id, Entity>) -> Self {
        let mut by_kind: BTreeMap<EntityKind, Vec<Id>> = BTreeMap::new();
        let mut referrers: HashMap<Id, Vec<Referrer>> = HashMap::new();
        for (id, entity) in &entities {
            by_kind.entry(entity.kind()).or_default().push(*id);
            for key in entity.references() {
                referrers.entry(key.target).or_default().push(Referrer {
                    field: key.field,
                    kind: entity.kind(),
                    id: *id,
                });
            }
        }
        Self {
            entities,
            by_kind,
            referrers,
        }
    }

    #[must_use]
    pub fn get(&self, id: Id) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up an entity, failing with a reference error when absent.
    pub fn fetch(&self, id: Id) -> Result<&Entity> {
        self.entities.get(&id).ok_or_else(|| {
            PreviewError::reference(format!("entity {id}"), ReferenceErrorKind::UnknownEntity(id))
        })
    }

    /// Entities of one kind in id order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
    }

    /// Entities of any of the given kinds in id order.
    #[must_use]
    pub fn of_kinds(&self, kinds: &[EntityKind]) -> Vec<&Entity> {
        let mut found: Vec<&Entity> = kinds.iter().flat_map(|k| self.of_kind(*k)).collect();
        found.sort_by_key(|e| e.id());
        found.dedup_by_key(|e| e.id());
        found
    }

    /// All entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    pub(crate) fn referrers(&self, id: Id) -> &[Referrer] {
        self.referrers.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn entities(&self) -> &BTreeMap<Id, Entity> {
        &self.entities
    }

    /// Overview restricted to `ids`; unknown ids are ignored.
    ///
    /// The caller is responsible for passing a set closed under references.
    pub fn subset(&self, ids: impl IntoIterator<Item = Id>) -> Self {
        let entities = ids
            .into_iter()
            .filter_map(|id| self.entities.get(&id).map(|e| (id, e.clone())))
            .collect();
        Self::from_entities(entities)
    }

    // ========================================================================
    // Wire format
    // ========================================================================

    pub fn to_value(&self) -> Result<Value> {
        let mut entities = Map::with_capacity(self.entities.len());
        for (id, entity) in &self.entities {
            entities.insert(
                id.to_string(),
                Value::Array(vec![
                    Value::String(entity.kind().name().to_string()),
                    entity.fields()?,
                ]),
            );
        }
        let mut root = Map::new();
        root.insert("entities".to_string(), Value::Object(entities));
        Ok(Value::Object(root))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value()?).context("serializing overview")
    }

    /// Rebuild an overview from its wire format.
    ///
    /// Ids are taken verbatim from the keys; every foreign key must point at
    /// an entity of an allowed kind within the same document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(PreviewError::invalid_value("overview", "expected a JSON object"));
        };
        let raw = match root.remove("entities") {
            Some(Value::Object(raw)) => Some(raw),
            _ => None,
        }
        .required("entities", "overview")?;

        let mut entities = BTreeMap::new();
        for (key, record) in raw {
            let id: Id = key.parse().map_err(|_| {
                PreviewError::validation(
                    "overview entities",
                    ValidationErrorKind::InvalidEntityId {
                        key: key.clone(),
                        message: "not an integer".to_string(),
                    },
                )
            })?;
            let entity = parse_record(record).with_context(|| format!("entity {key}"))?;
            if entity.id() != id {
                return Err(PreviewError::validation(
                    "overview entities",
                    ValidationErrorKind::InvalidEntityId {
                        key,
                        message: format!("record carries id {}", entity.id()),
                    },
                ));
            }
            entities.insert(id, entity);
        }

        check_references(&entities)?;
        Ok(Self::from_entities(entities))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("parsing overview JSON")?;
        Self::from_value(value)
    }
}

fn parse_record(record: Value) -> Result<Entity> {
    let Value::Array(mut pair) = record else {
        return Err(PreviewError::invalid_value("record", "expected [kind, fields]"));
    };
    if pair.len() != 2 {
        return Err(PreviewError::invalid_value("record", "expected [kind, fields]"));
    }
    let fields = pair.pop().unwrap_or(Value::Null);
    let kind = match pair.pop() {
        Some(Value::String(name)) => EntityKind::from_name(&name).ok_or_else(|| {
            PreviewError::validation("record kind", ValidationErrorKind::UnknownEntityKind(name))
        })?,
        _ => return Err(PreviewError::invalid_value("record", "kind must be a string")),
    };
    Entity::from_fields(kind, fields)
}

fn check_references(entities: &BTreeMap<Id, Entity>) -> Result<()> {
    for entity in entities.values() {
        for key in entity.references() {
            let context = format!("{} {} field {}", entity.kind(), entity.id(), key.field);
            let target = entities.get(&key.target).ok_or_else(|| {
                PreviewError::reference(&context, ReferenceErrorKind::UnknownEntity(key.target))
            })?;
            if !key.kinds.contains(&target.kind()) {
                return Err(PreviewError::reference(
                    context,
                    ReferenceErrorKind::WrongKind {
                        id: key.target,
                        expected: key.kinds.first().map_or("entity", |k| k.name()),
                        actual: target.kind().name(),
                    },
                ));
            }
        }
    }
    Ok(())
}
