//! BelongsToMany: owner and foreign records linked through a pivot table.
//!
//! The pivot columns needed for matching are selected alongside the foreign
//! columns under a `__pivot_` prefix, then split back out into a pivot
//! [`Record`] attached to each result.

use relmodel_core::{EntityInfo, Record, RelationKind, RelationValue, Row};
use relmodel_query::{ColumnRef, RelationQuery};

use crate::keys::{build_dictionary, collect_key_values, key_value};
use crate::variant::RelationVariant;

/// Prefix of pivot columns in the joined result set.
pub const PIVOT_PREFIX: &str = "__pivot_";

#[derive(Debug, Clone)]
pub struct BelongsToMany {
    related: EntityInfo,
    pivot: EntityInfo,
    query: RelationQuery,
    relation_alias: String,
    /// Pivot column referencing the owner's `foreign_key`
    foreign_pivot_key: String,
    /// Pivot column referencing the related entity's `owner_key`
    owner_pivot_key: String,
    /// Column on the owner
    foreign_key: String,
    /// Column on the related table joined against the pivot
    owner_key: String,
    pivot_columns: Vec<String>,
}

impl BelongsToMany {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        related: EntityInfo,
        pivot: EntityInfo,
        relation_alias: impl Into<String>,
        foreign_pivot_key: impl Into<String>,
        owner_pivot_key: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
        pivot_columns: Vec<String>,
    ) -> Self {
        let mut relation = Self {
            query: RelationQuery::new(related.table()),
            related,
            pivot,
            relation_alias: relation_alias.into(),
            foreign_pivot_key: foreign_pivot_key.into(),
            owner_pivot_key: owner_pivot_key.into(),
            foreign_key: foreign_key.into(),
            owner_key: owner_key.into(),
            pivot_columns,
        };
        relation.add_pivot_join();
        relation
    }

    pub fn pivot_entity(&self) -> &EntityInfo {
        &self.pivot
    }

    pub fn relation_alias(&self) -> &str {
        &self.relation_alias
    }

    pub fn foreign_pivot_key(&self) -> &str {
        &self.foreign_pivot_key
    }

    pub fn owner_pivot_key(&self) -> &str {
        &self.owner_pivot_key
    }

    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    fn pivot_column(&self, column: &str) -> ColumnRef {
        ColumnRef::new(self.pivot.table(), column)
    }

    fn add_pivot_join(&mut self) {
        let mut selected = vec![self.foreign_pivot_key.clone(), self.owner_pivot_key.clone()];
        for column in &self.pivot_columns {
            if !selected.contains(column) {
                selected.push(column.clone());
            }
        }
        for column in selected {
            let source = self.pivot_column(&column);
            self.query.add_select(source, format!("{PIVOT_PREFIX}{column}"));
        }

        let left = self.pivot_column(&self.owner_pivot_key);
        let right = ColumnRef::new(self.related.table(), &self.owner_key);
        let pivot_table = self.pivot.table().to_string();
        self.query.inner_join(pivot_table, left, right);
    }

    /// Move `__pivot_` attributes of `record` into an attached pivot record.
    fn split_pivot(&self, mut record: Record) -> Record {
        let pivot_names: Vec<String> = record
            .attributes()
            .keys()
            .filter(|name| name.starts_with(PIVOT_PREFIX))
            .cloned()
            .collect();

        let mut pivot = self.pivot.new_record();
        for name in pivot_names {
            if let Some(value) = record.remove_attribute(&name) {
                pivot.set_attribute(&name[PIVOT_PREFIX.len()..], value);
            }
        }
        record.set_pivot(pivot);
        record
    }
}

impl RelationVariant for BelongsToMany {
    fn kind(&self) -> RelationKind {
        RelationKind::BelongsToMany
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
        let column = self.pivot_column(&self.foreign_pivot_key);
        self.query.where_eq(column, value);
        true
    }

    fn add_eager_constraints(&mut self, parents: &[Record]) -> bool {
        let values = collect_key_values(parents, &self.foreign_key);
        if values.is_empty() {
            return false;
        }
        let column = self.pivot_column(&self.foreign_pivot_key);
        self.query.where_in(column, values);
        true
    }

    fn hydrate(&self, rows: Vec<Row>) -> Vec<Record> {
        rows.into_iter()
            .map(|row| self.split_pivot(self.related.hydrate(row)))
            .collect()
    }

    fn match_eager(&self, parents: &mut [Record], results: Vec<Record>, relation: &str) {
        let dictionary = build_dictionary(results, |record| {
            record
                .pivot()
                .and_then(|pivot| pivot.relation_key(&self.foreign_pivot_key))
        });
        for parent in parents.iter_mut() {
            let related = parent
                .relation_key(&self.foreign_key)
                .and_then(|key| dictionary.get(&key))
                .cloned()
                .unwrap_or_default();
            parent.set_relation(relation, RelationValue::Many(related));
        }
    }
}
