//! Dynamic records and their loaded-relation cache.
//!
//! A [`Record`] is one row of an entity: its attribute map plus the relations
//! that have already been resolved for it. Presence of a key in the relation
//! cache means "already resolved", even when the resolved value is empty.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::key::RelationKey;
use crate::row::Row;
use crate::value::Value;

/// The resolved value of one relation on one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// To-one result: the related record, or none
    One(Option<Box<Record>>),
    /// To-many result, in the order the query returned it
    Many(Vec<Record>),
}

impl RelationValue {
    /// A to-one relation that resolved to nothing.
    pub const fn none() -> Self {
        RelationValue::One(None)
    }

    /// A to-one relation holding `record`.
    pub fn one(record: Record) -> Self {
        RelationValue::One(Some(Box::new(record)))
    }

    /// A to-many relation with no members.
    pub const fn empty_many() -> Self {
        RelationValue::Many(Vec::new())
    }

    pub const fn is_many(&self) -> bool {
        matches!(self, RelationValue::Many(_))
    }

    /// Number of related records held.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// View the related records as a slice (zero or one element for to-one).
    pub fn as_slice(&self) -> &[Record] {
        match self {
            RelationValue::One(Some(record)) => std::slice::from_ref(record.as_ref()),
            RelationValue::One(None) => &[],
            RelationValue::Many(records) => records,
        }
    }

    /// Mutable counterpart of [`RelationValue::as_slice`].
    pub fn as_mut_slice(&mut self) -> &mut [Record] {
        match self {
            RelationValue::One(Some(record)) => std::slice::from_mut(record.as_mut()),
            RelationValue::One(None) => &mut [],
            RelationValue::Many(records) => records,
        }
    }

    /// Consume into the held records.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            RelationValue::One(Some(record)) => vec![*record],
            RelationValue::One(None) => Vec::new(),
            RelationValue::Many(records) => records,
        }
    }

    /// Plain JSON: an object or `null` for to-one, an array for to-many.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RelationValue::One(Some(record)) => record.to_json(),
            RelationValue::One(None) => serde_json::Value::Null,
            RelationValue::Many(records) => {
                serde_json::Value::Array(records.iter().map(Record::to_json).collect())
            }
        }
    }
}

/// One record of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    key_name: String,
    attributes: BTreeMap<String, Value>,
    relations: BTreeMap<String, RelationValue>,
    pivot: Option<Box<Record>>,
}

impl Record {
    /// Create an empty record of `entity` whose primary key column is `key_name`.
    pub fn new(entity: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            key_name: key_name.into(),
            attributes: BTreeMap::new(),
            relations: BTreeMap::new(),
            pivot: None,
        }
    }

    /// Build a record from a result row; every column becomes an attribute.
    pub fn from_row(entity: impl Into<String>, key_name: impl Into<String>, row: Row) -> Self {
        let mut record = Self::new(entity, key_name);
        record.attributes.extend(row.into_pairs());
        record
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Entity name this record belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Primary key column name.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Primary key value, if set and not NULL.
    pub fn get_key(&self) -> Option<&Value> {
        self.get_attribute(&self.key_name)
            .filter(|value| !value.is_null())
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Normalized key read from `column`, or `None` when unset or NULL.
    pub fn relation_key(&self, column: &str) -> Option<RelationKey> {
        self.get_attribute(column).and_then(RelationKey::from_value)
    }

    // ---- loaded relations -------------------------------------------------

    pub fn relations(&self) -> &BTreeMap<String, RelationValue> {
        &self.relations
    }

    pub fn get_relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    pub fn get_relation_mut(&mut self, name: &str) -> Option<&mut RelationValue> {
        self.relations.get_mut(name)
    }

    /// Whether `name` has already been resolved on this record.
    pub fn relation_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn set_relation(&mut self, name: impl Into<String>, value: RelationValue) -> &mut Self {
        self.relations.insert(name.into(), value);
        self
    }

    pub fn unset_relation(&mut self, name: &str) -> Option<RelationValue> {
        self.relations.remove(name)
    }

    /// Replace the whole relation cache.
    pub fn set_relations(&mut self, relations: BTreeMap<String, RelationValue>) -> &mut Self {
        self.relations = relations;
        self
    }

    /// Loaded to-one relation.
    ///
    /// Returns `Ok(None)` when the relation is not loaded or resolved to
    /// nothing; use [`Record::relation_loaded`] to tell the two apart.
    pub fn related_one(&self, name: &str) -> Result<Option<&Record>> {
        match self.relations.get(name) {
            None | Some(RelationValue::One(None)) => Ok(None),
            Some(RelationValue::One(Some(record))) => Ok(Some(record.as_ref())),
            Some(RelationValue::Many(_)) => Err(Error::relation_type_mismatch(
                self.entity.clone(),
                name,
                format!("{}::{} holds a collection, not a single record", self.entity, name),
            )),
        }
    }

    /// Loaded to-many relation; empty when not loaded.
    pub fn related_many(&self, name: &str) -> Result<&[Record]> {
        match self.relations.get(name) {
            None => Ok(&[]),
            Some(RelationValue::Many(records)) => Ok(records),
            Some(RelationValue::One(_)) => Err(Error::relation_type_mismatch(
                self.entity.clone(),
                name,
                format!("{}::{} holds a single record, not a collection", self.entity, name),
            )),
        }
    }

    // ---- pivot --------------------------------------------------------------

    /// Join-table record attached by a many-to-many load.
    pub fn pivot(&self) -> Option<&Record> {
        self.pivot.as_deref()
    }

    pub fn set_pivot(&mut self, pivot: Record) {
        self.pivot = Some(Box::new(pivot));
    }

    /// Attributes merged with loaded relations, as plain JSON.
    ///
    /// A loaded relation replaces an attribute of the same name. The pivot
    /// record, if any, is nested under `"pivot"`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.attributes {
            map.insert(name.clone(), value.to_json());
        }
        for (name, relation) in &self.relations {
            map.insert(name.clone(), relation.to_json());
        }
        if let Some(pivot) = &self.pivot {
            map.insert("pivot".to_string(), pivot.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelationErrorKind;

    fn user() -> Record {
        Record::new("User", "id").with("id", 1i64).with("name", "ada")
    }

    #[test]
    fn get_key_ignores_null() {
        assert_eq!(user().get_key(), Some(&Value::BigInt(1)));
        let unsaved = Record::new("User", "id").with("id", Value::Null);
        assert_eq!(unsaved.get_key(), None);
    }

    #[test]
    fn empty_relation_counts_as_loaded() {
        let mut record = user();
        assert!(!record.relation_loaded("posts"));
        record.set_relation("posts", RelationValue::empty_many());
        assert!(record.relation_loaded("posts"));
        assert!(record.related_many("posts").unwrap().is_empty());

        record.unset_relation("posts");
        assert!(!record.relation_loaded("posts"));
    }

    #[test]
    fn typed_access_rejects_wrong_shape() {
        let mut record = user();
        record.set_relation("profile", RelationValue::none());
        let err = record.related_many("profile").unwrap_err();
        assert_eq!(
            err.relation_kind(),
            Some(RelationErrorKind::RelationTypeMismatch)
        );
        assert_eq!(record.related_one("profile").unwrap(), None);
    }

    #[test]
    fn json_merges_relations_and_pivot() {
        let mut role = Record::new("Role", "id").with("id", 7i64);
        role.set_pivot(
            Record::new("RoleUser", "id")
                .with("user_id", 1i64)
                .with("role_id", 7i64),
        );
        let mut record = user();
        record.set_relation("roles", RelationValue::Many(vec![role]));
        record.set_relation("profile", RelationValue::none());

        assert_eq!(
            record.to_json(),
            serde_json::json!({
                "id": 1,
                "name": "ada",
                "profile": null,
                "roles": [{"id": 7, "pivot": {"role_id": 7, "user_id": 1}}],
            })
        );
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            record.to_json()
        );
    }

    #[test]
    fn slices_over_both_shapes() {
        let mut one = RelationValue::one(user());
        assert_eq!(one.len(), 1);
        one.as_mut_slice()[0].set_attribute("name", "grace");
        assert_eq!(
            one.as_slice()[0].get_attribute("name"),
            Some(&Value::Text("grace".into()))
        );
        assert!(RelationValue::none().is_empty());
        assert_eq!(RelationValue::Many(vec![user(), user()]).into_records().len(), 2);
    }
}
