use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Database value type.
///
/// Rows handed back by the executor carry these instead of untyped JSON so
/// binding keys and in-memory row correlation stay type-aware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// JSON/JSONB stored as string for exact round-trip preservation.
    Json(String),
    /// Decimal stored as string to preserve exact precision.
    Decimal(String),
    /// Timestamp with timezone.
    DateTime(DateTime<Utc>),
    /// Date without time component.
    Date(NaiveDate),
    /// Time without date component.
    Time(NaiveTime),
}

/// One fetched row: column name to value, in select-list order.
pub type Row = IndexMap<String, Value>;

/// Reads a column from a row; absent columns read as `Value::Null`.
pub fn row_value(row: &Row, column: &str) -> Value {
    row.get(column).cloned().unwrap_or(Value::Null)
}

/// Stable structural key of a binding tuple.
///
/// The key is the JSON serialization of the typed tuple, so `Int(7)` and
/// `Text("7")` produce different keys.
pub fn binding_key(values: &[Value]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| format!("{:?}", values))
}

/// Removes repeated binding tuples, keeping the first occurrence of each.
pub fn dedup_binding_values(tuples: impl IntoIterator<Item = Vec<Value>>) -> Vec<Vec<Value>> {
    let mut seen = IndexSet::new();
    let mut result = Vec::new();

    for tuple in tuples {
        if seen.insert(binding_key(&tuple)) {
            result.push(tuple);
        }
    }

    result
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let deduped = dedup_binding_values(vec![
            vec![Value::Int(7)],
            vec![Value::Int(7)],
            vec![Value::Int(9)],
            vec![Value::Int(7)],
        ]);

        assert_eq!(deduped, vec![vec![Value::Int(7)], vec![Value::Int(9)]]);
    }

    #[test]
    fn test_binding_key_is_type_aware() {
        assert_ne!(
            binding_key(&[Value::Int(7)]),
            binding_key(&[Value::Text("7".to_string())])
        );
    }

    #[test]
    fn test_row_value_missing_column_is_null() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Int(1));

        assert_eq!(row_value(&row, "id"), Value::Int(1));
        assert!(row_value(&row, "name").is_null());
    }

    #[test]
    fn test_values_of_different_types_never_equal() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Decimal("1".to_string()));
        assert_ne!(
            binding_key(&[Value::Int(1)]),
            binding_key(&[Value::Float(1.0)])
        );
    }
}
