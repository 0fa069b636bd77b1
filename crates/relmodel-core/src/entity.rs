//! Entity metadata.
//!
//! [`EntityInfo`] is what the relation engine knows about an entity type:
//! its name, table, primary key, and the relation hooks it exposes under
//! conventional names. The [`Entity`] trait is the declarative way to provide
//! that metadata together with the entity's relations.

use std::collections::BTreeMap;

use crate::descriptor::RelationDescriptor;
use crate::error::Result;
use crate::naming::{accessor_name, mutator_name};
use crate::record::{Record, RelationValue};
use crate::row::Row;

/// Receives a freshly resolved relation value (`set_<key>`).
pub type RelationMutator = fn(&mut Record, RelationValue) -> Result<()>;

/// Reads a relation value off a record (`get_<key>`).
pub type RelationAccessor = fn(&Record) -> Option<&RelationValue>;

/// Metadata for one entity type.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    name: String,
    table: String,
    primary_key: String,
    mutators: BTreeMap<String, RelationMutator>,
    accessors: BTreeMap<String, RelationAccessor>,
}

impl EntityInfo {
    /// Create entity metadata with the default primary key `id`.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            mutators: BTreeMap::new(),
            accessors: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Register the mutator for relation `key` under its conventional name.
    #[must_use]
    pub fn with_mutator(mut self, key: &str, mutator: RelationMutator) -> Self {
        self.mutators.insert(mutator_name(key), mutator);
        self
    }

    /// Register the accessor for relation `key` under its conventional name.
    #[must_use]
    pub fn with_accessor(mut self, key: &str, accessor: RelationAccessor) -> Self {
        self.accessors.insert(accessor_name(key), accessor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Look up a mutator by its conventional name (`set_<snake key>`).
    pub fn mutator(&self, method: &str) -> Option<RelationMutator> {
        self.mutators.get(method).copied()
    }

    /// Look up an accessor by its conventional name (`get_<snake key>`).
    pub fn accessor(&self, method: &str) -> Option<RelationAccessor> {
        self.accessors.get(method).copied()
    }

    /// An empty record of this entity.
    pub fn new_record(&self) -> Record {
        Record::new(&self.name, &self.primary_key)
    }

    /// Build a record of this entity from a result row.
    pub fn hydrate(&self, row: Row) -> Record {
        Record::from_row(&self.name, &self.primary_key, row)
    }
}

/// Declarative entity definition.
///
/// # Example
///
/// ```ignore
/// struct User;
///
/// impl Entity for User {
///     const NAME: &'static str = "User";
///     const TABLE_NAME: &'static str = "users";
///
///     fn relations() -> Result<Vec<RelationDescriptor>> {
///         Ok(vec![RelationDescriptor::has_many("User", "posts", "Post", KeySpec::new())?])
///     }
/// }
/// ```
pub trait Entity {
    /// Entity name used in descriptors and records.
    const NAME: &'static str;
    /// Table the entity is stored in.
    const TABLE_NAME: &'static str;
    /// Primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// Relations declared on this entity.
    fn relations() -> Result<Vec<RelationDescriptor>> {
        Ok(Vec::new())
    }

    /// Metadata registered for this entity. Override to attach relation hooks.
    fn entity_info() -> EntityInfo {
        EntityInfo::new(Self::NAME, Self::TABLE_NAME).with_primary_key(Self::PRIMARY_KEY)
    }
}
