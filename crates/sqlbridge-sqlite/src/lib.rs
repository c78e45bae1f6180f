//! Blocking SQLite driver for sqlbridge, built on `rusqlite`.
//!
//! ```
//! use sqlbridge_core::{Connection, Cursor, ParameterSink, Statement, Value};
//! use sqlbridge_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_url("sqlite::memory:").unwrap();
//! conn.execute("create table t (id integer)").unwrap();
//! let mut insert = conn.prepare("insert into t values (?)").unwrap();
//! insert.bind(1, Value::BigInt(7)).unwrap();
//! insert.execute().unwrap();
//! insert.close().unwrap();
//!
//! let mut select = conn.prepare("select id from t").unwrap();
//! let mut cursor = select.query().unwrap();
//! assert!(cursor.advance().unwrap());
//! assert_eq!(cursor.read(0).unwrap(), Value::BigInt(7));
//! ```
//!
//! Cells are copied out of SQLite on every advance. Temporal and structured
//! parameters are stored as text; integers come back as `BigInt`.

pub mod config;
pub mod connection;
pub mod statement;
pub mod types;

pub use config::{SqliteConfig, SqliteTarget};
pub use connection::SqliteConnection;
pub use statement::{SqliteCursor, SqliteRawBatch, SqliteStatement};
