//! Conversions between sqlbridge values and SQLite storage classes.

use rusqlite::types::{Value as SqlValue, ValueRef};
use sqlbridge_core::{
    ColumnMeta, ColumnType, DriverOperation, Error, Result, TypeCode, Value, ValueKind, format_uuid,
};
use sqlbridge_dialect::codec;

/// Map a value onto the storage class SQLite keeps it in.
///
/// Temporal values are stored as ISO-8601 text; structured values as their
/// text form; UUIDs as hyphenated text.
pub fn to_sql_value(value: &Value) -> Result<SqlValue> {
    let converted = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::TinyInt(v) => SqlValue::Integer(i64::from(*v)),
        Value::SmallInt(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int(v) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(v) => SqlValue::Integer(*v),
        Value::Float(v) => SqlValue::Real(f64::from(*v)),
        Value::Double(v) => SqlValue::Real(*v),
        Value::Decimal(s) | Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Date(days) => SqlValue::Text(render(codec::format_date(*days), value)?),
        Value::Time(micros) => SqlValue::Text(render(codec::format_time(*micros), value)?),
        Value::Timestamp(micros) => {
            SqlValue::Text(render(codec::format_timestamp(*micros), value)?)
        }
        Value::TimestampTz(micros) => {
            SqlValue::Text(render(codec::format_timestamp_utc(*micros), value)?)
        }
        Value::Interval(interval) => SqlValue::Text(interval.to_iso8601()),
        Value::Point(point) => SqlValue::Text(point.to_string()),
        Value::Uuid(bytes) => SqlValue::Text(format_uuid(bytes)),
        Value::Json(json) => SqlValue::Text(json.to_string()),
        Value::Array(_) => {
            return Err(Error::driver(
                DriverOperation::Bind,
                "sqlite has no array parameters",
            ));
        }
    };
    Ok(converted)
}

fn render(text: Option<String>, value: &Value) -> Result<String> {
    text.ok_or_else(|| {
        Error::driver(
            DriverOperation::Bind,
            format!("{} value out of range: {:?}", value.kind(), value),
        )
    })
}

/// A cell copied out of the current row.
///
/// Text keeps its raw bytes until it is read, so a column holding invalid
/// UTF-8 fails that column's read rather than the whole row fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(Vec<u8>),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Convert to a value, decoding text as UTF-8.
    pub fn decode(&self) -> Result<Value> {
        Ok(match self {
            Cell::Null => Value::Null,
            Cell::Integer(v) => Value::BigInt(*v),
            Cell::Real(v) => Value::Double(*v),
            Cell::Text(bytes) => Value::Text(
                std::str::from_utf8(bytes)
                    .map_err(|e| Error::driver_source(DriverOperation::Read, e))?
                    .to_string(),
            ),
            Cell::Blob(bytes) => Value::Bytes(bytes.clone()),
        })
    }
}

impl From<ValueRef<'_>> for Cell {
    fn from(cell: ValueRef<'_>) -> Self {
        match cell {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(v) => Cell::Integer(v),
            ValueRef::Real(v) => Cell::Real(v),
            ValueRef::Text(bytes) => Cell::Text(bytes.to_vec()),
            ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
        }
    }
}

/// Copy a borrowed cell into an owned value.
pub fn from_value_ref(cell: ValueRef<'_>) -> Result<Value> {
    Cell::from(cell).decode()
}

/// Column metadata from a declared type. Columns without one (expressions)
/// report `OTHER`.
///
/// SQLite hands back every integer as a 64-bit value, so integer columns
/// report a `BigInt` native kind whatever width they were declared with.
pub fn column_meta(label: &str, declared: Option<&str>) -> ColumnMeta {
    let column_type = match declared {
        Some(declared) if !declared.trim().is_empty() => {
            let ty = ColumnType::from_declared(declared);
            match ty.type_code {
                TypeCode::TinyInt | TypeCode::SmallInt | TypeCode::Integer | TypeCode::BigInt => {
                    ty.with_native_kind(ValueKind::BigInt)
                }
                TypeCode::Real | TypeCode::Float => ty.with_native_kind(ValueKind::Double),
                _ => ty,
            }
        }
        _ => ColumnType::new(TypeCode::Other, ""),
    };
    ColumnMeta::new(label, column_type)
}
