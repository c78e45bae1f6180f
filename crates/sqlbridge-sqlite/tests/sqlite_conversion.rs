//! The conversion pipeline over a real SQLite database.

use sqlbridge_convert::{ConvertingStatement, collect_rows};
use sqlbridge_core::{Connection, Cursor, Error, Statement, TypeCode, Value, ValueKind};
use sqlbridge_sqlite::SqliteConnection;

fn events() -> SqliteConnection {
    let conn = SqliteConnection::open_url("sqlite::memory:").unwrap();
    conn.execute(
        "create table events (id integer primary key, at timestamp, day date, \
         active boolean, payload json, note text)",
    )
    .unwrap();
    conn
}

#[test]
fn sqlite_dialect_round_trips_typed_values() {
    let conn = events();
    let dialect = sqlbridge_dialect::resolve(conn.url());
    assert_eq!(dialect.name(), "sqlite");

    let insert = conn
        .prepare("insert into events (id, at, day, active, payload, note) values (?,?,?,?,?,?)")
        .unwrap();
    let mut insert = ConvertingStatement::new(insert, dialect.clone());
    insert
        .bind_all(&[
            Value::BigInt(1),
            Value::TimestampTz(86_400_000_000),
            Value::Date(10),
            Value::Bool(true),
            Value::Json(serde_json::json!({"k": [1, 2]})),
            Value::Null,
        ])
        .unwrap();
    assert_eq!(insert.execute().unwrap(), 1);
    insert.close().unwrap();

    let mut select = conn
        .prepare("select id, at, day, active, payload, note from events")
        .unwrap();
    let rows = collect_rows(select.query().unwrap(), dialect).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.value(0), Some(&Value::BigInt(1)));
    assert_eq!(row.value(1), Some(&Value::TimestampTz(86_400_000_000)));
    assert_eq!(row.value(2), Some(&Value::Date(10)));
    assert_eq!(row.value(3), Some(&Value::Bool(true)));
    assert_eq!(
        row.value(4),
        Some(&Value::Json(serde_json::json!({"k": [1, 2]})))
    );
    assert!(row.column(5).unwrap().is_null());
    assert_eq!(row.get_by_label::<i64>("id").unwrap(), 1);
}

#[test]
fn column_types_follow_declarations() {
    let conn = events();
    let mut select = conn.prepare("select id, note, 1 + 1 as two from events").unwrap();
    let cursor = sqlbridge_convert::ConvertingCursor::new(
        select.query().unwrap(),
        sqlbridge_dialect::resolve(conn.url()),
    )
    .unwrap();
    let id = cursor.column_type(0).unwrap();
    assert_eq!(id.type_code, TypeCode::Integer);
    assert_eq!(id.native_kind, ValueKind::BigInt);
    assert_eq!(cursor.column_type(1).unwrap().type_code, TypeCode::LongVarChar);
    assert_eq!(cursor.column_type(2).unwrap().type_code, TypeCode::Other);
    assert_eq!(cursor.column_metas()[2].label, "two");
}

#[test]
fn batch_flush_failure_reports_sql() {
    let conn = events();
    let mut stmt = conn.prepare("insert into events (id) values (?)").unwrap();
    for id in [1, 1] {
        sqlbridge_core::ParameterSink::bind(&mut stmt, 1, Value::BigInt(id)).unwrap();
        stmt.add_batch().unwrap();
    }
    let err = stmt.execute_batch().unwrap_err();
    assert!(err.is_driver());
    assert_eq!(err.sql(), Some("insert into events (id) values (?)"));
}

#[test]
fn invalid_text_fails_only_the_column_read() {
    let conn = events();
    let mut select = conn
        .prepare("select 1 as id, cast(x'fffe' as text) as bad")
        .unwrap();
    let mut cursor = select.query().unwrap();
    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.read(0).unwrap(), Value::BigInt(1));
    assert!(!cursor.is_null(1).unwrap());
    assert!(cursor.read(1).unwrap_err().is_driver());
    assert!(!cursor.advance().unwrap());
}

#[test]
fn invalid_text_surfaces_as_row_extraction() {
    let conn = events();
    let mut select = conn
        .prepare("select 1 as id, cast(x'fffe' as text) as bad")
        .unwrap();
    let err = collect_rows(select.query().unwrap(), sqlbridge_dialect::resolve(conn.url()))
        .unwrap_err();
    let Error::RowExtraction(e) = err else {
        panic!("expected a row extraction error, got {err:?}");
    };
    assert_eq!(e.column_index, 1);
    assert_eq!(e.column_label, "bad");
    assert!(e.source.is_driver());
}
