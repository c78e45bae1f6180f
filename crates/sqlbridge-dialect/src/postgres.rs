//! PostgreSQL conversion rules.
//!
//! Timestamps (with or without zone) are read through the UTC-pinned
//! accessor and surface as instants. `interval`, `point`, `json`/`jsonb` and
//! `uuid` arrive as text from most clients and are parsed here; on the way
//! in they are rendered back to text, which PostgreSQL casts implicitly.

use sqlbridge_core::{ColumnType, TypeCode, Value, ValueKind, parse_uuid};

use crate::codec::{parse_interval, parse_point};
use crate::dialect::{
    Dialect, Extractor, Setter, parsed_text_extractor, render_structured, text_setter,
    untyped_extractor, untyped_setter, utc_timestamp_extractor, utc_timestamp_setter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn url_prefixes(&self) -> &'static [&'static str] {
        &["postgresql:", "postgres:", "jdbc:postgresql:"]
    }

    fn extractor(&self, column: &ColumnType) -> Extractor {
        match column.type_code {
            TypeCode::Timestamp | TypeCode::TimestampWithTimeZone => utc_timestamp_extractor(),
            _ => match column.base_name().as_str() {
                "INTERVAL" => parsed_text_extractor("interval", |text| {
                    parse_interval(text).map(Value::Interval)
                }),
                "POINT" => {
                    parsed_text_extractor("point", |text| parse_point(text).map(Value::Point))
                }
                "JSON" | "JSONB" => parsed_text_extractor("json", |text| {
                    serde_json::from_str(text).ok().map(Value::Json)
                }),
                "UUID" => parsed_text_extractor("uuid", |text| parse_uuid(text).map(Value::Uuid)),
                _ => untyped_extractor(),
            },
        }
    }

    fn setter(&self, kind: ValueKind) -> Setter {
        match kind {
            ValueKind::Timestamp | ValueKind::TimestampTz => utc_timestamp_setter(),
            ValueKind::Interval | ValueKind::Point | ValueKind::Json | ValueKind::Uuid => {
                text_setter(render_structured)
            }
            _ => untyped_setter(),
        }
    }
}
