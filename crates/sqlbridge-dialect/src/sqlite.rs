//! SQLite conversion rules.
//!
//! SQLite stores values by storage class, not by declared type, so the
//! declared type is only a hint. Temporal columns may hold ISO-8601 text,
//! Unix epoch seconds (INTEGER) or a Julian day (REAL); all three are
//! accepted. Writes always use ISO-8601 text, 0/1 for booleans, and text
//! for JSON and UUIDs.

use std::sync::Arc;

use sqlbridge_core::{
    ColumnType, Cursor, DriverOperation, Error, ParameterSink, Result, TypeCode, Value, ValueKind,
    parse_uuid,
};

use crate::codec::{
    epoch_seconds_to_micros, format_date, format_time, format_timestamp, format_timestamp_utc,
    julian_day_to_micros, parse_date_days, parse_time_micros, parse_timestamp_micros,
};
use crate::dialect::{
    Dialect, Extractor, Setter, bool_as_int_setter, null_guarded, parsed_text_extractor,
    render_structured, text_setter, typed_extractor, untyped_extractor, untyped_setter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

fn malformed(index: usize, what: &str, value: &Value) -> Error {
    Error::driver(
        DriverOperation::Read,
        format!("column {} does not hold a {} ({})", index, what, value.kind()),
    )
}

fn timestamp_micros(cursor: &dyn Cursor, index: usize) -> Result<i64> {
    let value = cursor.read(index)?;
    let micros = match &value {
        Value::Timestamp(v) | Value::TimestampTz(v) => Some(*v),
        Value::Text(text) => parse_timestamp_micros(text),
        Value::Double(day) => julian_day_to_micros(*day),
        other => other.as_i64().and_then(epoch_seconds_to_micros),
    };
    micros.ok_or_else(|| malformed(index, "timestamp", &value))
}

fn read_timestamp(cursor: &dyn Cursor, index: usize) -> Result<Value> {
    timestamp_micros(cursor, index).map(Value::TimestampTz)
}

fn read_date(cursor: &dyn Cursor, index: usize) -> Result<Value> {
    let value = cursor.read(index)?;
    match &value {
        Value::Date(days) => Ok(Value::Date(*days)),
        Value::Text(text) => parse_date_days(text)
            .map(Value::Date)
            .ok_or_else(|| malformed(index, "date", &value)),
        _ => {
            let micros = timestamp_micros(cursor, index)?;
            i32::try_from(micros.div_euclid(86_400_000_000))
                .map(Value::Date)
                .map_err(|_| malformed(index, "date", &value))
        }
    }
}

fn read_time(cursor: &dyn Cursor, index: usize) -> Result<Value> {
    let value = cursor.read(index)?;
    match &value {
        Value::Time(micros) => Ok(Value::Time(*micros)),
        Value::Text(text) => parse_time_micros(text)
            .map(Value::Time)
            .ok_or_else(|| malformed(index, "time", &value)),
        _ => Err(malformed(index, "time", &value)),
    }
}

fn read_uuid(cursor: &dyn Cursor, index: usize) -> Result<Value> {
    let value = cursor.read(index)?;
    let parsed = match &value {
        Value::Uuid(bytes) => Some(*bytes),
        Value::Text(text) => parse_uuid(text),
        Value::Bytes(bytes) => <[u8; 16]>::try_from(bytes.as_slice()).ok(),
        _ => None,
    };
    parsed
        .map(Value::Uuid)
        .ok_or_else(|| malformed(index, "uuid", &value))
}

fn render_temporal(value: &Value) -> Option<String> {
    match value {
        Value::Timestamp(micros) => format_timestamp(*micros),
        Value::TimestampTz(micros) => format_timestamp_utc(*micros),
        Value::Date(days) => format_date(*days),
        Value::Time(micros) => format_time(*micros),
        _ => None,
    }
}

fn temporal_setter() -> Setter {
    Arc::new(|sink: &mut dyn ParameterSink, index: usize, value: &Value| {
        match render_temporal(value) {
            Some(text) => sink.bind(index, Value::Text(text)),
            None => Err(Error::driver(
                DriverOperation::Bind,
                format!("parameter {} is outside the representable date range", index),
            )),
        }
    })
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn url_prefixes(&self) -> &'static [&'static str] {
        &["sqlite:", "jdbc:sqlite:"]
    }

    fn extractor(&self, column: &ColumnType) -> Extractor {
        match column.type_code {
            TypeCode::Timestamp | TypeCode::TimestampWithTimeZone => null_guarded(read_timestamp),
            TypeCode::Date => null_guarded(read_date),
            TypeCode::Time => null_guarded(read_time),
            TypeCode::Boolean => typed_extractor(ValueKind::Bool),
            _ => match column.base_name().as_str() {
                "JSON" => parsed_text_extractor("json", |text| {
                    serde_json::from_str(text).ok().map(Value::Json)
                }),
                "UUID" => null_guarded(read_uuid),
                _ => untyped_extractor(),
            },
        }
    }

    fn setter(&self, kind: ValueKind) -> Setter {
        match kind {
            ValueKind::Bool => bool_as_int_setter(),
            ValueKind::Timestamp | ValueKind::TimestampTz | ValueKind::Date | ValueKind::Time => {
                temporal_setter()
            }
            ValueKind::Interval | ValueKind::Point | ValueKind::Json | ValueKind::Uuid => {
                text_setter(render_structured)
            }
            _ => untyped_setter(),
        }
    }
}
