//! Relation descriptors.
//!
//! A [`RelationDescriptor`] is the immutable description of one declared
//! relationship: which entity declares it, under which property, of which
//! kind, toward which entity, and over which key columns.
//!
//! Key columns left unset here are resolved by naming convention when a
//! relation variant is built, because the defaults depend on the primary key
//! of entities that may not be known yet at declaration time.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::naming::is_identifier;

/// The four supported relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Owner has at most one foreign record pointing back at it
    HasOne,
    /// Owner has any number of foreign records pointing back at it
    HasMany,
    /// Owner holds a foreign key to one foreign record
    BelongsTo,
    /// Owner and foreign records are linked through a pivot entity
    BelongsToMany,
}

impl RelationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::BelongsToMany => "belongsToMany",
        }
    }

    /// Whether results are a collection rather than a single record.
    pub const fn is_to_many(self) -> bool {
        matches!(self, RelationKind::HasMany | RelationKind::BelongsToMany)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hasOne" | "has_one" => Ok(RelationKind::HasOne),
            "hasMany" | "has_many" => Ok(RelationKind::HasMany),
            "belongsTo" | "belongs_to" => Ok(RelationKind::BelongsTo),
            "belongsToMany" | "belongs_to_many" => Ok(RelationKind::BelongsToMany),
            other => Err(Error::invalid_relation(
                "",
                None,
                format!("unknown relation kind '{other}'"),
            )),
        }
    }
}

/// Raw key bundle, as a declaration supplies it.
///
/// Every field is optional; which ones apply depends on the kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpec {
    pub foreign_key: Option<String>,
    pub owner_key: Option<String>,
    pub relation_alias: Option<String>,
    pub pivot_entity: Option<String>,
    pub foreign_pivot_key: Option<String>,
    pub owner_pivot_key: Option<String>,
    pub pivot_columns: Vec<String>,
}

impl KeySpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }

    #[must_use]
    pub fn owner_key(mut self, column: impl Into<String>) -> Self {
        self.owner_key = Some(column.into());
        self
    }

    #[must_use]
    pub fn relation_alias(mut self, alias: impl Into<String>) -> Self {
        self.relation_alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn pivot_entity(mut self, entity: impl Into<String>) -> Self {
        self.pivot_entity = Some(entity.into());
        self
    }

    /// Pivot column referencing the owner.
    #[must_use]
    pub fn foreign_pivot_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_pivot_key = Some(column.into());
        self
    }

    /// Pivot column referencing the foreign entity.
    #[must_use]
    pub fn owner_pivot_key(mut self, column: impl Into<String>) -> Self {
        self.owner_pivot_key = Some(column.into());
        self
    }

    /// Extra pivot columns copied onto each result's pivot record.
    #[must_use]
    pub fn pivot_column(mut self, column: impl Into<String>) -> Self {
        self.pivot_columns.push(column.into());
        self
    }
}

/// Validated, kind-specific key bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKeys {
    /// HasOne / HasMany: `foreign_key` lives on the foreign table and
    /// references `owner_key` on the owner.
    HasOneOrMany {
        foreign_key: Option<String>,
        owner_key: Option<String>,
    },
    /// BelongsTo: `foreign_key` lives on the owner's table and references
    /// `owner_key` on the foreign entity.
    BelongsTo {
        foreign_key: Option<String>,
        owner_key: Option<String>,
        relation_alias: String,
    },
    /// BelongsToMany: `foreign_pivot_key` references the owner's
    /// `foreign_key`, `owner_pivot_key` references the foreign entity's
    /// `owner_key`.
    BelongsToMany {
        pivot_entity: String,
        foreign_pivot_key: Option<String>,
        owner_pivot_key: Option<String>,
        foreign_key: Option<String>,
        owner_key: Option<String>,
        relation_alias: String,
        pivot_columns: Vec<String>,
    },
}

/// Immutable description of one declared relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    owner_type: String,
    property: String,
    kind: RelationKind,
    foreign_entity: String,
    keys: RelationKeys,
}

impl RelationDescriptor {
    /// Validate and build a descriptor.
    ///
    /// Fails with `InvalidRelationConfig` when the foreign entity is empty,
    /// a BelongsToMany has no pivot entity, pivot keys are given for a kind
    /// without a pivot, or any key is not a plain identifier.
    pub fn new(
        owner_type: impl Into<String>,
        property: impl Into<String>,
        kind: RelationKind,
        foreign_entity: impl Into<String>,
        spec: KeySpec,
    ) -> Result<Self> {
        let owner_type = owner_type.into();
        let property = property.into();
        let foreign_entity = foreign_entity.into();
        let invalid = |message: String| Error::invalid_relation(&owner_type, Some(&property), message);

        if owner_type.is_empty() || property.is_empty() {
            return Err(invalid(
                "owner type and property name must not be empty".to_string(),
            ));
        }
        if foreign_entity.trim().is_empty() {
            return Err(invalid(format!(
                "{owner_type}::{property} ({kind}) has no foreign entity"
            )));
        }

        let columns = [
            &spec.foreign_key,
            &spec.owner_key,
            &spec.foreign_pivot_key,
            &spec.owner_pivot_key,
        ];
        for column in columns.into_iter().flatten().chain(spec.pivot_columns.iter()) {
            if !is_identifier(column)? {
                return Err(invalid(format!(
                    "{owner_type}::{property}: '{column}' is not a valid key column"
                )));
            }
        }

        let has_pivot_keys = spec.pivot_entity.is_some()
            || spec.foreign_pivot_key.is_some()
            || spec.owner_pivot_key.is_some()
            || !spec.pivot_columns.is_empty();
        if kind != RelationKind::BelongsToMany && has_pivot_keys {
            return Err(invalid(format!(
                "{owner_type}::{property}: pivot keys only apply to belongsToMany, not {kind}"
            )));
        }

        let relation_alias = spec
            .relation_alias
            .filter(|alias| !alias.is_empty())
            .unwrap_or_else(|| property.clone());

        let keys = match kind {
            RelationKind::HasOne | RelationKind::HasMany => RelationKeys::HasOneOrMany {
                foreign_key: spec.foreign_key,
                owner_key: spec.owner_key,
            },
            RelationKind::BelongsTo => RelationKeys::BelongsTo {
                foreign_key: spec.foreign_key,
                owner_key: spec.owner_key,
                relation_alias,
            },
            RelationKind::BelongsToMany => {
                let Some(pivot_entity) = spec.pivot_entity.filter(|p| !p.trim().is_empty()) else {
                    return Err(invalid(format!(
                        "{owner_type}::{property} (belongsToMany) requires a pivot entity"
                    )));
                };
                RelationKeys::BelongsToMany {
                    pivot_entity,
                    foreign_pivot_key: spec.foreign_pivot_key,
                    owner_pivot_key: spec.owner_pivot_key,
                    foreign_key: spec.foreign_key,
                    owner_key: spec.owner_key,
                    relation_alias,
                    pivot_columns: spec.pivot_columns,
                }
            }
        };

        Ok(Self {
            owner_type,
            property,
            kind,
            foreign_entity,
            keys,
        })
    }

    /// Build a descriptor from a kind name such as `"hasMany"`.
    pub fn parse(
        owner_type: impl Into<String>,
        property: impl Into<String>,
        kind: &str,
        foreign_entity: impl Into<String>,
        spec: KeySpec,
    ) -> Result<Self> {
        let owner_type = owner_type.into();
        let property = property.into();
        let kind = kind.parse::<RelationKind>().map_err(|_| {
            Error::invalid_relation(
                &owner_type,
                Some(&property),
                format!("{owner_type}::{property}: unknown relation kind '{kind}'"),
            )
        })?;
        Self::new(owner_type, property, kind, foreign_entity, spec)
    }

    pub fn has_one(
        owner_type: impl Into<String>,
        property: impl Into<String>,
        foreign_entity: impl Into<String>,
        spec: KeySpec,
    ) -> Result<Self> {
        Self::new(owner_type, property, RelationKind::HasOne, foreign_entity, spec)
    }

    pub fn has_many(
        owner_type: impl Into<String>,
        property: impl Into<String>,
        foreign_entity: impl Into<String>,
        spec: KeySpec,
    ) -> Result<Self> {
        Self::new(owner_type, property, RelationKind::HasMany, foreign_entity, spec)
    }

    pub fn belongs_to(
        owner_type: impl Into<String>,
        property: impl Into<String>,
        foreign_entity: impl Into<String>,
        spec: KeySpec,
    ) -> Result<Self> {
        Self::new(owner_type, property, RelationKind::BelongsTo, foreign_entity, spec)
    }

    pub fn belongs_to_many(
        owner_type: impl Into<String>,
        property: impl Into<String>,
        foreign_entity: impl Into<String>,
        spec: KeySpec,
    ) -> Result<Self> {
        Self::new(
            owner_type,
            property,
            RelationKind::BelongsToMany,
            foreign_entity,
            spec,
        )
    }

    pub fn owner_type(&self) -> &str {
        &self.owner_type
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn foreign_entity(&self) -> &str {
        &self.foreign_entity
    }

    pub fn keys(&self) -> &RelationKeys {
        &self.keys
    }

    /// Relation alias for the kinds that carry one.
    pub fn relation_alias(&self) -> Option<&str> {
        match &self.keys {
            RelationKeys::BelongsTo { relation_alias, .. }
            | RelationKeys::BelongsToMany { relation_alias, .. } => Some(relation_alias),
            RelationKeys::HasOneOrMany { .. } => None,
        }
    }

    /// Pivot entity, for BelongsToMany.
    pub fn pivot_entity(&self) -> Option<&str> {
        match &self.keys {
            RelationKeys::BelongsToMany { pivot_entity, .. } => Some(pivot_entity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelationErrorKind;

    #[test]
    fn kind_parses_both_spellings() {
        assert_eq!("hasMany".parse::<RelationKind>().unwrap(), RelationKind::HasMany);
        assert_eq!(
            "belongs_to_many".parse::<RelationKind>().unwrap(),
            RelationKind::BelongsToMany
        );
        assert!(RelationKind::BelongsToMany.is_to_many());
        assert!(!RelationKind::BelongsTo.is_to_many());
    }

    #[test]
    fn unknown_kind_is_invalid_config() {
        let err = RelationDescriptor::parse("User", "posts", "hasSome", "Post", KeySpec::new())
            .unwrap_err();
        assert_eq!(
            err.relation_kind(),
            Some(RelationErrorKind::InvalidRelationConfig)
        );
        assert!(err.to_string().contains("hasSome"));
    }

    #[test]
    fn belongs_to_many_requires_pivot_entity() {
        let err = RelationDescriptor::belongs_to_many("User", "roles", "Role", KeySpec::new())
            .unwrap_err();
        assert_eq!(
            err.relation_kind(),
            Some(RelationErrorKind::InvalidRelationConfig)
        );
    }

    #[test]
    fn pivot_keys_rejected_outside_belongs_to_many() {
        let spec = KeySpec::new().pivot_entity("RoleUser");
        assert!(RelationDescriptor::has_many("User", "roles", "Role", spec).is_err());
    }

    #[test]
    fn empty_foreign_entity_rejected() {
        assert!(RelationDescriptor::has_one("User", "profile", " ", KeySpec::new()).is_err());
    }

    #[test]
    fn key_columns_must_be_identifiers() {
        let spec = KeySpec::new().foreign_key("user id");
        let err = RelationDescriptor::has_many("User", "posts", "Post", spec).unwrap_err();
        assert!(err.to_string().contains("user id"));
    }

    #[test]
    fn alias_defaults_to_property_for_belongs_kinds() {
        let d = RelationDescriptor::belongs_to("Post", "author", "User", KeySpec::new()).unwrap();
        assert_eq!(d.relation_alias(), Some("author"));

        let d = RelationDescriptor::belongs_to(
            "Post",
            "author",
            "User",
            KeySpec::new().relation_alias("writer"),
        )
        .unwrap();
        assert_eq!(d.relation_alias(), Some("writer"));

        let d = RelationDescriptor::has_many("User", "posts", "Post", KeySpec::new()).unwrap();
        assert_eq!(d.relation_alias(), None);
    }

    #[test]
    fn belongs_to_many_keeps_all_keys() {
        let d = RelationDescriptor::belongs_to_many(
            "User",
            "roles",
            "Role",
            KeySpec::new()
                .pivot_entity("RoleUser")
                .foreign_pivot_key("user_id")
                .owner_pivot_key("role_id")
                .pivot_column("granted_at"),
        )
        .unwrap();
        assert_eq!(d.pivot_entity(), Some("RoleUser"));
        assert_eq!(
            d.keys(),
            &RelationKeys::BelongsToMany {
                pivot_entity: "RoleUser".to_string(),
                foreign_pivot_key: Some("user_id".to_string()),
                owner_pivot_key: Some("role_id".to_string()),
                foreign_key: None,
                owner_key: None,
                relation_alias: "roles".to_string(),
                pivot_columns: vec!["granted_at".to_string()],
            }
        );
    }
}
