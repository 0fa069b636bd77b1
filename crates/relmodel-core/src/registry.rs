//! The relation registry.
//!
//! Relations and entity metadata are collected single-threaded into a
//! [`RegistryBuilder`] during start-up, then frozen into an immutable
//! [`RelationRegistry`] snapshot that any number of tasks can read without
//! locking. A process-wide registry can be installed once with
//! [`install_global`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use crate::descriptor::RelationDescriptor;
use crate::entity::{Entity, EntityInfo};
use crate::error::{ConfigError, Error, Result};

type RelationMap = BTreeMap<String, RelationDescriptor>;

/// Mutable registry used while entities are being declared.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entities: HashMap<String, EntityInfo>,
    relations: HashMap<String, RelationMap>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register entity metadata, replacing any earlier entry of the same name.
    pub fn register_entity(&mut self, info: EntityInfo) -> &mut Self {
        self.entities.insert(info.name().to_string(), info);
        self
    }

    /// Register an [`Entity`] and every relation it declares.
    pub fn entity<E: Entity>(&mut self) -> Result<&mut Self> {
        self.register_entity(E::entity_info());
        for descriptor in E::relations()? {
            self.register(descriptor);
        }
        Ok(self)
    }

    /// Register a relation under its owner type and property.
    ///
    /// Re-registering the same (owner, property) pair overwrites the earlier
    /// descriptor; the replaced one is returned.
    pub fn register(&mut self, descriptor: RelationDescriptor) -> Option<RelationDescriptor> {
        let owner = descriptor.owner_type().to_string();
        let property = descriptor.property().to_string();
        tracing::trace!(
            owner = %owner,
            relation = %property,
            kind = %descriptor.kind(),
            foreign = descriptor.foreign_entity(),
            "Registering relation"
        );
        let replaced = self
            .relations
            .entry(owner)
            .or_default()
            .insert(property, descriptor);
        if let Some(old) = &replaced {
            tracing::debug!(
                owner = old.owner_type(),
                relation = old.property(),
                "Relation re-registered; later declaration wins"
            );
        }
        replaced
    }

    /// Freeze into an immutable, shareable registry.
    pub fn freeze(self) -> RelationRegistry {
        let relation_count: usize = self.relations.values().map(BTreeMap::len).sum();
        tracing::debug!(
            entities = self.entities.len(),
            relations = relation_count,
            "Relation registry frozen"
        );
        RelationRegistry {
            inner: Arc::new(RegistryInner {
                entities: self.entities,
                relations: self.relations,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    entities: HashMap<String, EntityInfo>,
    relations: HashMap<String, RelationMap>,
}

/// Read-only (owner type, property) → descriptor lookup plus the entity catalog.
///
/// Cloning is cheap; all clones share one snapshot.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    inner: Arc<RegistryInner>,
}

impl RelationRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// With `property`, whether that relation is declared on `owner_type`;
    /// without, whether `owner_type` declares any relation at all.
    pub fn has(&self, owner_type: &str, property: Option<&str>) -> bool {
        match (self.inner.relations.get(owner_type), property) {
            (None, _) => false,
            (Some(map), None) => !map.is_empty(),
            (Some(map), Some(property)) => map.contains_key(property),
        }
    }

    /// Descriptor for (owner type, property). Absence is not an error.
    pub fn get(&self, owner_type: &str, property: &str) -> Option<&RelationDescriptor> {
        self.inner
            .relations
            .get(owner_type)
            .and_then(|map| map.get(property))
    }

    /// Every relation declared on `owner_type`, keyed by property.
    pub fn get_all(&self, owner_type: &str) -> Option<&BTreeMap<String, RelationDescriptor>> {
        self.inner.relations.get(owner_type)
    }

    /// Entity metadata by name.
    pub fn entity(&self, name: &str) -> Option<&EntityInfo> {
        self.inner.entities.get(name)
    }

    /// Entity metadata by name, or `InvalidRelationConfig` naming the relation
    /// that needed it.
    pub fn require_entity(
        &self,
        name: &str,
        owner: &str,
        relation: &str,
    ) -> Result<&EntityInfo> {
        self.entity(name).ok_or_else(|| {
            Error::invalid_relation(
                owner,
                Some(relation),
                format!("{owner}::{relation} refers to unknown entity '{name}'"),
            )
        })
    }

    pub fn relation_count(&self) -> usize {
        self.inner.relations.values().map(BTreeMap::len).sum()
    }
}

static GLOBAL: OnceLock<RelationRegistry> = OnceLock::new();

/// Install the process-wide registry. Only the first call succeeds.
pub fn install_global(registry: RelationRegistry) -> Result<()> {
    GLOBAL.set(registry).map_err(|_| {
        Error::Config(ConfigError {
            message: "global relation registry is already installed".to_string(),
            source: None,
        })
    })
}

/// The process-wide registry, if one was installed.
pub fn global() -> Option<&'static RelationRegistry> {
    GLOBAL.get()
}
