//! Normalized relation keys.
//!
//! Constraint building and result matching must agree on what "the same key"
//! means. Drivers report the same column as `Int`, `BigInt` or even a numeric
//! string depending on backend and column type, so both phases go through
//! [`RelationKey`] instead of comparing raw [`Value`]s. Keys are never bound
//! as parameters; the record's own value is.

use crate::value::Value;

/// An orderable, hashable key used to link parents to related records.
///
/// NULL is never a key: [`RelationKey::from_value`] returns `None` for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKey {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid([u8; 16]),
}

impl RelationKey {
    /// Normalize a value into a key.
    ///
    /// Integers of every width collapse to `Int`, as do canonical decimal
    /// strings (`"42"`, not `"042"`). Floats, JSON and NULL are not usable as keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null | Value::Double(_) | Value::Json(_) => None,
            Value::Bool(v) => Some(RelationKey::Int(i64::from(*v))),
            Value::TinyInt(v) => Some(RelationKey::Int(i64::from(*v))),
            Value::SmallInt(v) => Some(RelationKey::Int(i64::from(*v))),
            Value::Int(v) | Value::Date(v) => Some(RelationKey::Int(i64::from(*v))),
            Value::BigInt(v) | Value::Timestamp(v) => Some(RelationKey::Int(*v)),
            Value::Text(s) | Value::Decimal(s) => Some(Self::from_text(s)),
            Value::Bytes(b) => Some(RelationKey::Bytes(b.clone())),
            Value::Uuid(u) => Some(RelationKey::Uuid(*u)),
        }
    }

    fn from_text(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => RelationKey::Int(n),
            _ => RelationKey::Text(s.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_compare_equal() {
        assert_eq!(
            RelationKey::from_value(&Value::Int(5)),
            RelationKey::from_value(&Value::BigInt(5))
        );
        assert_eq!(
            RelationKey::from_value(&Value::TinyInt(5)),
            Some(RelationKey::Int(5))
        );
    }

    #[test]
    fn numeric_text_normalizes_to_int() {
        assert_eq!(
            RelationKey::from_value(&Value::Text("10".into())),
            Some(RelationKey::Int(10))
        );
        assert_eq!(
            RelationKey::from_value(&Value::Text("010".into())),
            Some(RelationKey::Text("010".into()))
        );
    }

    #[test]
    fn null_and_float_are_not_keys() {
        assert_eq!(RelationKey::from_value(&Value::Null), None);
        assert_eq!(RelationKey::from_value(&Value::Double(1.0)), None);
    }

    #[test]
    fn keys_order_ascending() {
        let mut keys = vec![RelationKey::Int(3), RelationKey::Int(-1), RelationKey::Int(2)];
        keys.sort();
        assert_eq!(
            keys,
            vec![RelationKey::Int(-1), RelationKey::Int(2), RelationKey::Int(3)]
        );
    }
}
