//! Oracle conversion rules.
//!
//! Oracle has no boolean column type; `NUMBER(1)` is the usual stand-in and
//! is read as a bool, with booleans bound as 0/1. `DATE` carries a time of
//! day, so it is read like a timestamp. LOB columns are streamed and
//! materialized.

use sqlbridge_core::{ColumnType, TypeCode, ValueKind};

use crate::dialect::{
    Dialect, Extractor, Setter, blob_extractor, bool_as_int_setter, clob_extractor,
    render_structured, text_setter, typed_extractor, untyped_extractor, untyped_setter,
    utc_timestamp_extractor, utc_timestamp_setter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

fn is_number_flag(column: &ColumnType) -> bool {
    column.type_code == TypeCode::Numeric && column.precision == 1 && column.scale == 0
}

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn url_prefixes(&self) -> &'static [&'static str] {
        &["oracle:", "jdbc:oracle:"]
    }

    fn extractor(&self, column: &ColumnType) -> Extractor {
        match column.type_code {
            TypeCode::Clob | TypeCode::NClob => clob_extractor(),
            TypeCode::Blob => blob_extractor(),
            TypeCode::Date | TypeCode::Timestamp | TypeCode::TimestampWithTimeZone => {
                utc_timestamp_extractor()
            }
            _ if is_number_flag(column) => typed_extractor(ValueKind::Bool),
            _ => untyped_extractor(),
        }
    }

    fn setter(&self, kind: ValueKind) -> Setter {
        match kind {
            ValueKind::Bool => bool_as_int_setter(),
            ValueKind::Timestamp | ValueKind::TimestampTz => utc_timestamp_setter(),
            ValueKind::Interval | ValueKind::Point | ValueKind::Json | ValueKind::Uuid => {
                text_setter(render_structured)
            }
            _ => untyped_setter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::{MockCursor, MockStatement};
    use sqlbridge_core::{Cursor, Value};

    #[test]
    fn test_lobs_and_flags() {
        let mut cursor = MockCursor::with_declared(
            &[("DOC", "CLOB"), ("IMG", "BLOB"), ("ACTIVE", "NUMBER(1)"), ("QTY", "NUMBER(10)")],
            vec![vec![
                Value::Text("body".into()),
                Value::Bytes(vec![9]),
                Value::Decimal("1".into()),
                Value::Decimal("42".into()),
            ]],
        );
        assert!(cursor.advance().unwrap());
        let columns: Vec<ColumnType> = cursor
            .columns()
            .unwrap()
            .into_iter()
            .map(|c| c.column_type)
            .collect();
        let values: Vec<Value> = columns
            .iter()
            .enumerate()
            .map(|(i, ty)| OracleDialect.extractor(ty)(&cursor, i).unwrap())
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Text("body".into()),
                Value::Bytes(vec![9]),
                Value::Bool(true),
                Value::Decimal("42".into()),
            ]
        );
        assert_eq!(cursor.calls().lob_reads.get(), 2);
    }

    #[test]
    fn test_date_reads_as_instant() {
        let mut cursor =
            MockCursor::with_declared(&[("D", "DATE")], vec![vec![Value::Timestamp(86_400)]]);
        assert!(cursor.advance().unwrap());
        let column = ColumnType::from_declared("DATE");
        assert_eq!(
            OracleDialect.extractor(&column)(&cursor, 0).unwrap(),
            Value::TimestampTz(86_400)
        );
    }

    #[test]
    fn test_bool_binds_as_number() {
        let mut stmt = MockStatement::standalone("update t set f = ?");
        OracleDialect.setter(ValueKind::Bool)(&mut stmt, 1, &Value::Bool(false)).unwrap();
        assert_eq!(stmt.log().borrow().binds, vec![(1, Value::Int(0))]);
    }
}
