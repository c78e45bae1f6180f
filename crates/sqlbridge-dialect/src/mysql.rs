//! MySQL / MariaDB conversion rules.

use sqlbridge_core::{ColumnType, TypeCode, Value, ValueKind};

use crate::dialect::{
    Dialect, Extractor, Setter, blob_extractor, clob_extractor, parsed_text_extractor,
    render_structured, text_setter, typed_extractor, untyped_extractor, untyped_setter,
    utc_timestamp_extractor, utc_timestamp_setter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

/// `TINYINT(1)` and `BIT(1)` are MySQL's booleans.
fn is_flag(column: &ColumnType) -> bool {
    matches!(column.type_code, TypeCode::TinyInt | TypeCode::Bit) && column.precision == 1
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn url_prefixes(&self) -> &'static [&'static str] {
        &["mysql:", "mariadb:", "jdbc:mysql:", "jdbc:mariadb:"]
    }

    fn extractor(&self, column: &ColumnType) -> Extractor {
        if is_flag(column) {
            return typed_extractor(ValueKind::Bool);
        }
        match column.type_code {
            TypeCode::Timestamp | TypeCode::TimestampWithTimeZone => utc_timestamp_extractor(),
            TypeCode::LongVarChar | TypeCode::Clob => clob_extractor(),
            TypeCode::LongVarBinary | TypeCode::Blob => blob_extractor(),
            _ if column.name_is("JSON") => parsed_text_extractor("json", |text| {
                serde_json::from_str(text).ok().map(Value::Json)
            }),
            _ => untyped_extractor(),
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
