//! Materialized rows.
//!
//! A [`Row`] is built eagerly when the cursor advances, so it holds no
//! reference to the cursor and can be retained or sent to another thread.

use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Error, Result};
use crate::types::ColumnType;
use crate::value::{FromValue, Value};

/// Label to position lookup, built once per result shape.
///
/// Exact matches win; otherwise the first ASCII case-insensitive match is
/// used. The first occurrence of a duplicated label wins.
#[derive(Debug, Clone, Default)]
pub struct ColumnLabels {
    labels: Vec<String>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl ColumnLabels {
    pub fn new(labels: Vec<String>) -> Self {
        let mut exact = HashMap::with_capacity(labels.len());
        let mut folded = HashMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            exact.entry(label.clone()).or_insert(idx);
            folded.entry(label.to_ascii_lowercase()).or_insert(idx);
        }
        Self {
            labels,
            exact,
            folded,
        }
    }

    /// Resolve a label to its zero-based position.
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.exact
            .get(label)
            .or_else(|| self.folded.get(&label.to_ascii_lowercase()))
            .copied()
            .ok_or_else(|| Error::no_such_column(label, self.labels.clone()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Column labels and types shared by every row of one result.
#[derive(Debug, Clone)]
pub struct RowColumns {
    labels: ColumnLabels,
    types: Vec<Arc<ColumnType>>,
}

impl RowColumns {
    pub fn new(labels: Vec<String>, types: Vec<ColumnType>) -> Self {
        debug_assert_eq!(labels.len(), types.len());
        Self {
            labels: ColumnLabels::new(labels),
            types: types.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn labels(&self) -> &ColumnLabels {
        &self.labels
    }

    pub fn column_type(&self, index: usize) -> Option<&Arc<ColumnType>> {
        self.types.get(index)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// One cell: the column's type and the converted value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    column_type: Arc<ColumnType>,
    value: Value,
}

impl ColumnValue {
    pub fn new(column_type: Arc<ColumnType>, value: Value) -> Self {
        Self { column_type, value }
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Typed access; fails with `TypeMismatch` if the value is not a `T`.
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(&self.value)
    }
}

/// An ordered, zero-indexed sequence of cells plus the producing row index.
#[derive(Debug, Clone)]
pub struct Row {
    index: u64,
    columns: Arc<RowColumns>,
    values: Vec<ColumnValue>,
}

impl Row {
    /// Assemble a row. `values` must be in column order.
    pub fn new(index: u64, columns: Arc<RowColumns>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        let values = values
            .into_iter()
            .zip(columns.types.iter())
            .map(|(value, ty)| ColumnValue::new(Arc::clone(ty), value))
            .collect();
        Self {
            index,
            columns,
            values,
        }
    }

    /// Position of this row in the iteration that produced it.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &RowColumns {
        &self.columns
    }

    pub fn labels(&self) -> &[String] {
        self.columns.labels.labels()
    }

    /// Cell at `index`, if in range.
    pub fn column(&self, index: usize) -> Option<&ColumnValue> {
        self.values.get(index)
    }

    /// Raw value at `index`, if in range.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(ColumnValue::value)
    }

    /// Typed access by position.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        let cell = self.values.get(index).ok_or_else(|| {
            Error::no_such_column(format!("#{}", index), self.labels().to_vec())
        })?;
        cell.get().map_err(|e| e.in_column(&self.labels()[index]))
    }

    /// Typed access by column label.
    pub fn get_by_label<T: FromValue>(&self, label: &str) -> Result<T> {
        let index = self.columns.labels.index_of(label)?;
        self.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnValue> {
        self.values.iter()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values.into_iter().map(ColumnValue::into_value).collect()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.labels() == other.labels()
            && self.values == other.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (label, cell) in self.labels().iter().zip(&self.values) {
            map.serialize_entry(label, cell.value())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCode;

    fn sample() -> Row {
        let columns = Arc::new(RowColumns::new(
            vec!["ID".to_string(), "NAME".to_string()],
            vec![
                ColumnType::new(TypeCode::BigInt, "BIGINT"),
                ColumnType::new(TypeCode::VarChar, "VARCHAR"),
            ],
        ));
        Row::new(3, columns, vec![Value::BigInt(1), Value::Text("a".into())])
    }

    #[test]
    fn test_typed_access() {
        let row = sample();
        assert_eq!(row.index(), 3);
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
        assert_eq!(row.get_by_label::<String>("NAME").unwrap(), "a");
        assert_eq!(row.get_by_label::<String>("name").unwrap(), "a");
        assert_eq!(
            row.column(1).unwrap().column_type().type_code,
            TypeCode::VarChar
        );
    }

    #[test]
    fn test_mismatch_and_unknown_label() {
        let row = sample();
        let err = row.get::<String>(0).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(ref e) if e.column.as_deref() == Some("ID")));

        let err = row.get_by_label::<i64>("MISSING").unwrap_err();
        let Error::NoSuchColumn(inner) = err else {
            panic!("expected NoSuchColumn");
        };
        assert_eq!(inner.label, "MISSING");
        assert_eq!(inner.available, vec!["ID".to_string(), "NAME".to_string()]);
    }

    #[test]
    fn test_duplicate_labels_first_wins() {
        let labels = ColumnLabels::new(vec!["a".into(), "A".into(), "a".into()]);
        assert_eq!(labels.index_of("a").unwrap(), 0);
        assert_eq!(labels.index_of("A").unwrap(), 1);
    }

    #[test]
    fn test_serializes_as_map() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["NAME"], serde_json::json!({"Text": "a"}));
    }
}
