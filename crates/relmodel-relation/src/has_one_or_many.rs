//! HasOne / HasMany: foreign records point back at the owner.

use relmodel_core::{EntityInfo, Record, RelationKind, RelationValue};
use relmodel_query::{ColumnRef, RelationQuery};

use crate::keys::{build_dictionary, collect_key_values, key_value};
use crate::variant::RelationVariant;

/// `foreign.foreign_key = owner.owner_key`, to-one or to-many.
#[derive(Debug, Clone)]
pub struct HasOneOrMany {
    kind: RelationKind,
    related: EntityInfo,
    query: RelationQuery,
    /// Column on the foreign table
    foreign_key: String,
    /// Column on the owner
    owner_key: String,
}

impl HasOneOrMany {
    pub fn has_one(
        related: EntityInfo,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::HasOne, related, foreign_key, owner_key)
    }

    pub fn has_many(
        related: EntityInfo,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::HasMany, related, foreign_key, owner_key)
    }

    fn new(
        kind: RelationKind,
        related: EntityInfo,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        let query = RelationQuery::new(related.table());
        Self {
            kind,
            related,
            query,
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
        }
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    fn qualified_foreign_key(&self) -> ColumnRef {
        ColumnRef::new(self.related.table(), &self.foreign_key)
    }
}

impl RelationVariant for HasOneOrMany {
    fn kind(&self) -> RelationKind {
        self.kind
    }

    fn related(&self) -> &EntityInfo {
        &self.related
    }

    fn query(&self) -> &RelationQuery {
        &self.query
    }

    fn query_mut(&mut self) -> &mut RelationQuery {
        &mut self.query
    }

    fn add_constraints(&mut self, parent: &Record) -> bool {
        let Some(value) = key_value(parent, &self.owner_key) else {
            return false;
        };
        let column = self.qualified_foreign_key();
        self.query.where_eq(column, value);
        true
    }

    fn add_eager_constraints(&mut self, parents: &[Record]) -> bool {
        let values = collect_key_values(parents, &self.owner_key);
        if values.is_empty() {
            return false;
        }
        let column = self.qualified_foreign_key();
        self.query.where_in(column, values);
        true
    }

    fn match_eager(&self, parents: &mut [Record], results: Vec<Record>, relation: &str) {
        let dictionary = build_dictionary(results, |r| r.relation_key(&self.foreign_key));
        for parent in parents.iter_mut() {
            // Don't remove from the dictionary: the same key may appear on several parents.
            let matches = parent
                .relation_key(&self.owner_key)
                .and_then(|key| dictionary.get(&key));
            let value = match self.kind {
                RelationKind::HasMany => {
                    RelationValue::Many(matches.cloned().unwrap_or_default())
                }
                _ => RelationValue::One(
                    matches
                        .and_then(|records| records.first())
                        .cloned()
                        .map(Box::new),
                ),
            };
            parent.set_relation(relation, value);
        }
    }
}
