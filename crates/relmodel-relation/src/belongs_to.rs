//! BelongsTo: the owner holds a foreign key to one foreign record.

use std::collections::HashMap;

use relmodel_core::{EntityInfo, Record, RelationKey, RelationKind, RelationValue};
use relmodel_query::{ColumnRef, RelationQuery};

use crate::keys::{collect_key_values, key_value};
use crate::variant::RelationVariant;

/// `foreign.owner_key = owner.foreign_key`, always to-one.
#[derive(Debug, Clone)]
pub struct BelongsTo {
    related: EntityInfo,
    query: RelationQuery,
    /// Column on the owner
    foreign_key: String,
    /// Column on the foreign table
    owner_key: String,
    relation_alias: String,
}

impl BelongsTo {
    pub fn new(
        related: EntityInfo,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
        relation_alias: impl Into<String>,
    ) -> Self {
        let query = RelationQuery::new(related.table());
        Self {
            related,
            query,
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
            relation_alias: relation_alias.into(),
        }
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    pub fn relation_alias(&self) -> &str {
        &self.relation_alias
    }

    fn qualified_owner_key(&self) -> ColumnRef {
        ColumnRef::new(self.related.table(), &self.owner_key)
    }
}

impl RelationVariant for BelongsTo {
    fn kind(&self) -> RelationKind {
        RelationKind::BelongsTo
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
        let Some(value) = key_value(parent, &self.foreign_key) else {
            return false;
        };
        let column = self.qualified_owner_key();
        self.query.where_eq(column, value);
        true
    }

    fn add_eager_constraints(&mut self, parents: &[Record]) -> bool {
        let values = collect_key_values(parents, &self.foreign_key);
        if values.is_empty() {
            return false;
        }
        let column = self.qualified_owner_key();
        self.query.where_in(column, values);
        true
    }

    fn match_eager(&self, parents: &mut [Record], results: Vec<Record>, relation: &str) {
        let mut dictionary: HashMap<RelationKey, Record> = HashMap::new();
        for record in results {
            if let Some(key) = record.relation_key(&self.owner_key) {
                dictionary.entry(key).or_insert(record);
            }
        }

        for parent in parents.iter_mut() {
            let related = parent
                .relation_key(&self.foreign_key)
                .and_then(|key| dictionary.get(&key))
                .cloned()
                .map(Box::new);
            parent.set_relation(relation, RelationValue::One(related));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmodel_core::{Dialect, Value};

    fn owner_relation() -> BelongsTo {
        BelongsTo::new(EntityInfo::new("Account", "accounts"), "foreign_id", "id", "account")
    }

    #[test]
    fn eager_constraint_skips_null_foreign_keys() {
        let mut relation = owner_relation();
        let parents = vec![
            Record::new("Item", "id").with("id", 1i64).with("foreign_id", 10i64),
            Record::new("Item", "id").with("id", 2i64).with("foreign_id", Value::Null),
        ];
        assert!(relation.add_eager_constraints(&parents));
        let (sql, params) = relation.query().build(Dialect::Postgres);
        assert_eq!(
            sql,
            "SELECT \"accounts\".* FROM \"accounts\" WHERE \"accounts\".\"id\" IN ($1)"
        );
        assert_eq!(params, vec![Value::BigInt(10)]);
    }

    #[test]
    fn no_usable_keys_means_no_constraint() {
        let mut relation = owner_relation();
        let parents = vec![Record::new("Item", "id").with("id", 1i64)];
        assert!(!relation.add_eager_constraints(&parents));
        assert!(!relation.add_constraints(&parents[0]));
    }

    #[test]
    fn shared_parent_is_cloned_into_each_child() {
        let relation = owner_relation();
        let mut parents = vec![
            Record::new("Item", "id").with("id", 1i64).with("foreign_id", 10i64),
            Record::new("Item", "id").with("id", 2i64).with("foreign_id", Value::Int(10)),
            Record::new("Item", "id").with("id", 3i64).with("foreign_id", Value::Null),
        ];
        relation.init_relation(&mut parents, "account");
        relation.match_eager(
            &mut parents,
            vec![Record::new("Account", "id").with("id", 10i64).with("name", "acme")],
            "account",
        );
        for parent in &parents[..2] {
            let account = parent.related_one("account").unwrap().unwrap();
            assert_eq!(account.get_attribute("name"), Some(&Value::Text("acme".into())));
        }
        assert_eq!(parents[2].get_relation("account"), Some(&RelationValue::none()));
    }

    #[test]
    fn first_match_wins_on_duplicate_owner_keys() {
        let relation = owner_relation();
        let mut parents = vec![Record::new("Item", "id").with("foreign_id", 10i64)];
        relation.match_eager(
            &mut parents,
            vec![
                Record::new("Account", "id").with("id", 10i64).with("name", "first"),
                Record::new("Account", "id").with("id", 10i64).with("name", "second"),
            ],
            "account",
        );
        let account = parents[0].related_one("account").unwrap().unwrap();
        assert_eq!(account.get_attribute("name"), Some(&Value::Text("first".into())));
    }
}
