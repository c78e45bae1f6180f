//! H2 conversion rules: LOB materialization and UTC timestamps.

use sqlbridge_core::{ColumnType, TypeCode, ValueKind};

use crate::dialect::{
    Dialect, Extractor, Setter, blob_extractor, clob_extractor, render_structured, text_setter,
    untyped_extractor, untyped_setter, utc_timestamp_extractor, utc_timestamp_setter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct H2Dialect;

impl Dialect for H2Dialect {
    fn name(&self) -> &'static str {
        "h2"
    }

    fn url_prefixes(&self) -> &'static [&'static str] {
        &["h2:", "jdbc:h2:"]
    }

    fn extractor(&self, column: &ColumnType) -> Extractor {
        match column.type_code {
            TypeCode::Clob | TypeCode::NClob => clob_extractor(),
            TypeCode::Blob => blob_extractor(),
            TypeCode::Timestamp | TypeCode::TimestampWithTimeZone => utc_timestamp_extractor(),
            _ => untyped_extractor(),
        }
    }

    fn setter(&self, kind: ValueKind) -> Setter {
        match kind {
            ValueKind::Timestamp | ValueKind::TimestampTz => utc_timestamp_setter(),
            ValueKind::Json | ValueKind::Uuid => text_setter(render_structured),
            _ => untyped_setter(),
        }
    }
}
