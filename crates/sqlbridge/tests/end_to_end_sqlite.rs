//! Session-level scenarios over an in-memory SQLite database.

use sqlbridge::prelude::*;
use sqlbridge::sqlite::SqliteConnection;
use sqlbridge::TypeCode;

fn session(max_batch_size: usize) -> Session<SqliteConnection> {
    let conn = SqliteConnection::open_url("sqlite::memory:").unwrap();
    let session = Session::with_config(conn, SessionConfig::new().max_batch_size(max_batch_size));
    session
        .execute("create table T (ID integer, NAME varchar(10))", &[])
        .unwrap();
    session
}

fn person(row: &(i64, &'static str)) -> Vec<Value> {
    vec![Value::BigInt(row.0), Value::Text(row.1.to_string())]
}

const PEOPLE: [(i64, &str); 3] = [(1, "a"), (2, "b"), (3, "c")];

#[test]
fn three_rows_two_flushes_then_ordered_read() {
    let session = session(2);
    let mut batch = session
        .insert_batch("T", ["ID", "NAME"])
        .mapper(person)
        .build()
        .unwrap();
    batch.add(&PEOPLE[0]).unwrap();
    assert_eq!(batch.stats().flushes, 0);
    batch.add(&PEOPLE[1]).unwrap();
    assert_eq!(batch.stats().flushes, 1);
    batch.add(&PEOPLE[2]).unwrap();
    let stats = batch.close().unwrap();
    assert_eq!(stats.flushes, 2);
    assert_eq!(stats.total_rows, 3);

    let rows = session.query("select ID, NAME from T order by ID", &[]).unwrap();
    let read: Vec<(i64, String)> = rows
        .iter()
        .map(|r| (r.get::<i64>(0).unwrap(), r.get::<String>(1).unwrap()))
        .collect();
    assert_eq!(
        read,
        vec![(1, "a".to_string()), (2, "b".to_string()), (3, "c".to_string())]
    );

    let id = rows[0].column(0).unwrap().column_type();
    assert!(id.type_code.is_integer());
    let name = rows[0].column(1).unwrap().column_type();
    assert!(name.type_code.is_character());
    assert_eq!(name.type_code, TypeCode::VarChar);
}

#[test]
fn batch_scope_commits_rows_inside_transaction() {
    let session = session(2);
    session
        .in_transaction(|tx| {
            let ((), stats) = tx.session()?.batch_scope("T", ["ID", "NAME"], person, |batch| {
                batch.add_all(&PEOPLE)
            })?;
            assert_eq!(stats.flushes, 2);
            Ok(())
        })
        .unwrap();
    let row = session
        .query_one("select count(*) from T", &[])
        .unwrap()
        .unwrap();
    assert_eq!(row.get::<i64>(0).unwrap(), 3);
}

#[test]
fn failed_body_rolls_back() {
    let session = session(10);
    let err = session
        .in_transaction(|tx| {
            tx.execute(
                "insert into T (ID, NAME) values (?, ?)",
                &[Value::BigInt(7), Value::Text("z".into())],
            )?;
            Err::<(), _>(Error::illegal_state("abandon"))
        })
        .unwrap_err();
    assert!(err.is_illegal_state());
    assert!(session.query("select * from T", &[]).unwrap().is_empty());
}

#[test]
fn statement_batch_runs_raw_sql() {
    let session = session(2);
    let mut batch = session.statement_batch().unwrap();
    for (id, name) in PEOPLE {
        batch
            .add(&format!("insert into T (ID, NAME) values ({id}, '{name}')"))
            .unwrap();
    }
    assert_eq!(batch.close().unwrap().flushes, 2);
    let names: Vec<String> = session
        .query_map("select NAME from T order by ID", &[], |row: &RowView<'_>| {
            row.get_typed::<String>(0)
        })
        .unwrap();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn flush_failure_carries_sql_and_releases_statement() {
    let session = session(2);
    session
        .execute("create unique index T_ID on T (ID)", &[])
        .unwrap();
    let mut batch = session
        .insert_batch("T", ["ID", "NAME"])
        .mapper(person)
        .build()
        .unwrap();
    batch.add(&(1, "a")).unwrap();
    let err = batch.add(&(1, "dup")).unwrap_err();
    assert!(err.is_driver());
    assert_eq!(err.sql(), Some(r#"insert into "T" ("ID","NAME") values (?,?)"#));
    // Nothing pending after the failed flush; closing still succeeds.
    assert_eq!(batch.close().unwrap().pending, 0);
}

#[test]
fn invalid_text_reports_column_and_keeps_session_usable() {
    let session = session(2);
    let err = session
        .query("select 1 as ID, cast(x'fffe' as text) as NAME", &[])
        .unwrap_err();
    let Error::RowExtraction(e) = err else {
        panic!("expected a row extraction error, got {err:?}");
    };
    assert_eq!(e.column_index, 1);
    assert_eq!(e.column_label, "NAME");
    assert_eq!(session.query("select 1", &[]).unwrap().len(), 1);
}

#[test]
fn session_close_releases_connection() {
    let session = session(2);
    assert_eq!(session.dialect().name(), "sqlite");
    session.close().unwrap();
}
