//! Database row representation.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column names in order
    names: Vec<String>,
    /// Name -> index mapping for O(1) lookup
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get all column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// A single row returned from a database query.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Iterate over (column_name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Consume the row into owned (column_name, value) pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        let names = self.columns.names().to_vec();
        names.into_iter().zip(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_pairs() {
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::BigInt(1), Value::Text("ada".into())],
        );
        assert_eq!(row.len(), 2);
        assert_eq!(row.get_by_name("name"), Some(&Value::Text("ada".into())));
        assert_eq!(row.get_by_name("missing"), None);

        let pairs: Vec<(String, Value)> = row.into_pairs().collect();
        assert_eq!(pairs[0], ("id".to_string(), Value::BigInt(1)));
    }

    #[test]
    fn rows_share_column_info() {
        let columns = Arc::new(ColumnInfo::new(vec!["id".into()]));
        let a = Row::with_columns(Arc::clone(&columns), vec![Value::Int(1)]);
        let b = Row::with_columns(columns, vec![Value::Int(2)]);
        assert_eq!(a.get_by_name("id"), Some(&Value::Int(1)));
        assert_eq!(b.get_by_name("id"), Some(&Value::Int(2)));
    }
}
