//! Navigable views over overview entities.

use super::relationships::{is_to_one, relationship, Traversal};
use crate::overview::{Entity, EntityKind, Id, Overview};
use crate::error::Result;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Result of reading a name on an [`EntityRef`].
#[derive(Debug, Clone)]
pub enum Navigation<'a> {
    /// A to-one relationship; `None` when the key is unset
    One(Option<EntityRef<'a>>),
    /// A to-many relationship
    Many(EntitySet<'a>),
    /// A plain field; `None` when the entity has no such field
    Value(Option<Value>),
}

impl<'a> Navigation<'a> {
    /// Flatten into a set: one entity, all entities, or nothing for fields.
    #[must_use]
    pub fn into_set(self, overview: &'a Overview) -> EntitySet<'a> {
        match self {
            Navigation::One(one) => EntitySet::from_ids(overview, one.map(|e| e.id())),
            Navigation::Many(set) => set,
            Navigation::Value(_) => EntitySet::empty(overview),
        }
    }
}

/// One entity together with the overview it lives in.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'a> {
    overview: &'a Overview,
    entity: &'a Entity,
}

impl<'a> EntityRef<'a> {
    pub(crate) const fn new(overview: &'a Overview, entity: &'a Entity) -> Self {
        Self { overview, entity }
    }

    #[must_use]
    pub const fn id(&self) -> Id {
        self.entity.id()
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    #[must_use]
    pub const fn entity(&self) -> &'a Entity {
        self.entity
    }

    #[must_use]
    pub fn label(&self) -> Option<&'a str> {
        self.entity.label()
    }

    /// Resolve `name`: a declared relationship, or else a plain field.
    #[must_use]
    pub fn get(&self, name: &str) -> Navigation<'a> {
        match relationship(self.kind(), name) {
            Some(traversal) => self.traverse(traversal),
            None => Navigation::Value(self.field(name)),
        }
    }

    /// The to-one relationship `name`.
    #[must_use]
    pub fn one(&self, name: &str) -> Option<EntityRef<'a>> {
        match self.get(name) {
            Navigation::One(one) => one,
            Navigation::Many(set) => set.first(),
            Navigation::Value(_) => None,
        }
    }

    /// The relationship `name` as a set, whatever its arity.
    #[must_use]
    pub fn many(&self, name: &str) -> EntitySet<'a> {
        self.get(name).into_set(self.overview)
    }

    /// A plain field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        let Ok(Value::Object(mut fields)) = self.entity.fields() else {
            return None;
        };
        fields.remove(name)
    }

    fn flag(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(|v| v.as_bool())
    }

    fn traverse(&self, traversal: Traversal) -> Navigation<'a> {
        let overview = self.overview;
        match traversal {
            Traversal::Key(field) => Navigation::One(
                self.entity
                    .reference(field)
                    .and_then(|id| overview.get(id))
                    .map(|entity| EntityRef::new(overview, entity)),
            ),
            Traversal::Reverse {
                kinds,
                field,
                flag,
                single,
            } => {
                let ids = overview
                    .referrers(self.id())
                    .iter()
                    .filter(|r| r.field == field && kinds.contains(&r.kind))
                    .map(|r| r.id)
                    .filter(|id| match flag {
                        None => true,
                        Some((name, wanted)) => overview
                            .get(*id)
                            .map(|e| EntityRef::new(overview, e))
                            .and_then(|e| e.flag(name))
                            == Some(wanted),
                    });
                let set = EntitySet::from_ids(overview, ids);
                if single {
                    Navigation::One(set.first())
                } else {
                    Navigation::Many(set)
                }
            }
            Traversal::Path(steps) => {
                let mut current = EntitySet::from_ids(overview, [self.id()]);
                for step in steps {
                    current = current.navigate(step);
                }
                if is_to_one(self.kind(), traversal) {
                    Navigation::One(current.first())
                } else {
                    Navigation::Many(current)
                }
            }
        }
    }
}

/// Ordered, duplicate-free collection of entities of one overview.
#[derive(Debug, Clone)]
pub struct EntitySet<'a> {
    overview: &'a Overview,
    ids: Vec<Id>,
}

impl<'a> EntitySet<'a> {
    #[must_use]
    pub const fn empty(overview: &'a Overview) -> Self {
        Self {
            overview,
            ids: Vec::new(),
        }
    }

    /// Set of the given ids in first-seen order; unknown ids are dropped.
    pub fn from_ids(overview: &'a Overview, ids: impl IntoIterator<Item = Id>) -> Self {
        let mut seen = HashSet::new();
        let ids = ids
            .into_iter()
            .filter(|id| overview.get(*id).is_some() && seen.insert(*id))
            .collect();
        Self { overview, ids }
    }

    /// Follow `name` from every member and merge the results.
    #[must_use]
    pub fn navigate(&self, name: &str) -> Self {
        let ids: Vec<Id> = self
            .iter()
            .flat_map(|e| e.many(name).ids)
            .collect();
        Self::from_ids(self.overview, ids)
    }

    /// Members for which `predicate` holds.
    #[must_use]
    pub fn filter(&self, mut predicate: impl FnMut(&EntityRef<'a>) -> bool) -> Self {
        let ids = self
            .iter()
            .filter(|e| predicate(e))
            .map(|e| e.id())
            .collect();
        Self {
            overview: self.overview,
            ids,
        }
    }

    /// Members sorted with `compare`; ties keep their current order.
    #[must_use]
    pub fn sorted_by(
        &self,
        mut compare: impl FnMut(&EntityRef<'a>, &EntityRef<'a>) -> Ordering,
    ) -> Self {
        let mut members: Vec<EntityRef<'a>> = self.iter().collect();
        members.sort_by(|a, b| compare(a, b));
        Self {
            overview: self.overview,
            ids: members.iter().map(EntityRef::id).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityRef<'a>> + '_ {
        let overview = self.overview;
        self.ids
            .iter()
            .filter_map(move |id| overview.get(*id).map(|e| EntityRef::new(overview, e)))
    }

    #[must_use]
    pub fn first(&self) -> Option<EntityRef<'a>> {
        self.iter().next()
    }

    #[must_use]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Labels of all members that have one.
    #[must_use]
    pub fn labels(&self) -> Vec<&'a str> {
        self.iter().filter_map(|e| e.label()).collect()
    }
}

/// Entry point for navigating an overview.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    overview: &'a Overview,
}

impl<'a> Query<'a> {
    pub const fn new(overview: &'a Overview) -> Self {
        Self { overview }
    }

    /// All entities of `kind` in id order.
    #[must_use]
    pub fn all(&self, kind: EntityKind) -> EntitySet<'a> {
        EntitySet::from_ids(self.overview, self.overview.of_kind(kind).map(Entity::id))
    }

    /// All entities of any of `kinds` in id order.
    #[must_use]
    pub fn all_of(&self, kinds: &[EntityKind]) -> EntitySet<'a> {
        EntitySet::from_ids(
            self.overview,
            self.overview.of_kinds(kinds).into_iter().map(Entity::id),
        )
    }

    /// The entity with `id`.
    pub fn find(&self, id: Id) -> Result<EntityRef<'a>> {
        self.overview
            .fetch(id)
            .map(|entity| EntityRef::new(self.overview, entity))
    }

    /// Every run of the host called `name`.
    #[must_use]
    pub fn nodes_named(&self, name: &str) -> EntitySet<'a> {
        self.all(EntityKind::Node)
            .filter(|node| node.entity().as_node().is_some_and(|n| n.name == name))
    }

    /// The most recent run of the host called `name`.
    #[must_use]
    pub fn latest_node(&self, name: &str) -> Option<EntityRef<'a>> {
        self.nodes_named(name).iter().max_by(|a, b| {
            let ts = |e: &EntityRef<'a>| e.entity().as_node().map(|n| n.timestamp.clone());
            ts(a).cmp(&ts(b)).then(a.id().cmp(&b.id()))
        })
    }
}
