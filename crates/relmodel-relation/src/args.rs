//! Positional relation arguments.
//!
//! Each relation kind is constructed from a fixed argument tuple:
//!
//! | kind          | arguments |
//! |---------------|-----------|
//! | hasOne        | foreign entity, foreign key, owner key |
//! | hasMany       | foreign entity, foreign key, owner key |
//! | belongsTo     | foreign entity, relation alias, foreign key, owner key |
//! | belongsToMany | foreign entity, pivot entity, relation alias, foreign pivot key, owner pivot key, foreign key, owner key |
//!
//! [`RelationArgs`] is that tuple as a closed enum, so a descriptor whose
//! keys do not fit its kind is rejected instead of silently mis-ordered.

use relmodel_core::{Error, RelationDescriptor, RelationKeys, RelationKind, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationArgs {
    HasOne {
        foreign_entity: String,
        foreign_key: Option<String>,
        owner_key: Option<String>,
    },
    HasMany {
        foreign_entity: String,
        foreign_key: Option<String>,
        owner_key: Option<String>,
    },
    BelongsTo {
        foreign_entity: String,
        relation_alias: String,
        foreign_key: Option<String>,
        owner_key: Option<String>,
    },
    BelongsToMany {
        foreign_entity: String,
        pivot_entity: String,
        relation_alias: String,
        foreign_pivot_key: Option<String>,
        owner_pivot_key: Option<String>,
        foreign_key: Option<String>,
        owner_key: Option<String>,
        pivot_columns: Vec<String>,
    },
}

impl RelationArgs {
    /// Arrange a descriptor's keys into its kind's argument tuple.
    pub fn from_descriptor(descriptor: &RelationDescriptor) -> Result<Self> {
        let foreign_entity = descriptor.foreign_entity().to_string();
        match (descriptor.kind(), descriptor.keys()) {
            (
                RelationKind::HasOne,
                RelationKeys::HasOneOrMany {
                    foreign_key,
                    owner_key,
                },
            ) => Ok(RelationArgs::HasOne {
                foreign_entity,
                foreign_key: foreign_key.clone(),
                owner_key: owner_key.clone(),
            }),
            (
                RelationKind::HasMany,
                RelationKeys::HasOneOrMany {
                    foreign_key,
                    owner_key,
                },
            ) => Ok(RelationArgs::HasMany {
                foreign_entity,
                foreign_key: foreign_key.clone(),
                owner_key: owner_key.clone(),
            }),
            (
                RelationKind::BelongsTo,
                RelationKeys::BelongsTo {
                    foreign_key,
                    owner_key,
                    relation_alias,
                },
            ) => Ok(RelationArgs::BelongsTo {
                foreign_entity,
                relation_alias: relation_alias.clone(),
                foreign_key: foreign_key.clone(),
                owner_key: owner_key.clone(),
            }),
            (
                RelationKind::BelongsToMany,
                RelationKeys::BelongsToMany {
                    pivot_entity,
                    foreign_pivot_key,
                    owner_pivot_key,
                    foreign_key,
                    owner_key,
                    relation_alias,
                    pivot_columns,
                },
            ) => Ok(RelationArgs::BelongsToMany {
                foreign_entity,
                pivot_entity: pivot_entity.clone(),
                relation_alias: relation_alias.clone(),
                foreign_pivot_key: foreign_pivot_key.clone(),
                owner_pivot_key: owner_pivot_key.clone(),
                foreign_key: foreign_key.clone(),
                owner_key: owner_key.clone(),
                pivot_columns: pivot_columns.clone(),
            }),
            (kind, _) => Err(Error::relation_type_mismatch(
                descriptor.owner_type(),
                descriptor.property(),
                format!(
                    "{}::{} is declared as {kind} but carries keys of another kind",
                    descriptor.owner_type(),
                    descriptor.property()
                ),
            )),
        }
    }

    pub fn kind(&self) -> RelationKind {
        match self {
            RelationArgs::HasOne { .. } => RelationKind::HasOne,
            RelationArgs::HasMany { .. } => RelationKind::HasMany,
            RelationArgs::BelongsTo { .. } => RelationKind::BelongsTo,
            RelationArgs::BelongsToMany { .. } => RelationKind::BelongsToMany,
        }
    }

    pub fn foreign_entity(&self) -> &str {
        match self {
            RelationArgs::HasOne { foreign_entity, .. }
            | RelationArgs::HasMany { foreign_entity, .. }
            | RelationArgs::BelongsTo { foreign_entity, .. }
            | RelationArgs::BelongsToMany { foreign_entity, .. } => foreign_entity,
        }
    }
}
