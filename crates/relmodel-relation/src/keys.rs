//! Key collection and result dictionaries shared by the relation variants.
//!
//! Keys are normalized with [`RelationKey`] for dedup, ordering and matching,
//! but parameters are bound with the value the record actually holds.

use std::collections::{BTreeMap, HashMap};

use relmodel_core::{Record, RelationKey, Value};

/// The value of `column` to bind for `record`, or `None` when it is not a
/// usable key.
pub fn key_value(record: &Record, column: &str) -> Option<Value> {
    let value = record.get_attribute(column)?;
    RelationKey::from_value(value).map(|_| value.clone())
}

/// Bindable values of the distinct, non-null keys read from `column`, in
/// ascending key order. The first value seen for each key is kept.
pub fn collect_key_values<'a, I>(records: I, column: &str) -> Vec<Value>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut keys: BTreeMap<RelationKey, Value> = BTreeMap::new();
    for record in records {
        if let Some(value) = record.get_attribute(column) {
            if let Some(key) = RelationKey::from_value(value) {
                keys.entry(key).or_insert_with(|| value.clone());
            }
        }
    }
    keys.into_values().collect()
}

/// Group `records` by the key `key_of` extracts, keeping query order within
/// each group. Records without a key are dropped.
pub fn build_dictionary<F>(records: Vec<Record>, key_of: F) -> HashMap<RelationKey, Vec<Record>>
where
    F: Fn(&Record) -> Option<RelationKey>,
{
    let mut dictionary: HashMap<RelationKey, Vec<Record>> = HashMap::new();
    for record in records {
        match key_of(&record) {
            Some(key) => dictionary.entry(key).or_default().push(record),
            None => tracing::trace!(entity = record.entity(), "Related record has no link key"),
        }
    }
    dictionary
}
