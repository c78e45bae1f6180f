//! Dialect-aware value conversion and bounded-memory batch writes over
//! blocking SQL clients.
//!
//! A [`Session`] pairs a [`Connection`] with the [`Dialect`] its URL
//! resolves to. Statements prepared through it bind parameters through the
//! dialect's setters and read cells through its extractors; batches opened
//! through it flush at the configured threshold and release their statement
//! exactly once.
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> sqlbridge::Result<()> {
//! use sqlbridge::prelude::*;
//! use sqlbridge::sqlite::SqliteConnection;
//!
//! let session = Session::with_config(
//!     SqliteConnection::open_url("sqlite::memory:")?,
//!     SessionConfig::new().max_batch_size(2),
//! );
//! session.execute("create table T (ID integer, NAME varchar(10))", &[])?;
//!
//! let ((), stats) = session.batch_scope(
//!     "T",
//!     ["ID", "NAME"],
//!     |row: &(i64, &'static str)| vec![Value::BigInt(row.0), Value::Text(row.1.to_string())],
//!     |batch| batch.add_all(&[(1, "a"), (2, "b"), (3, "c")]),
//! )?;
//! assert_eq!(stats.flushes, 2);
//!
//! let rows = session.query("select NAME from T order by ID", &[])?;
//! assert_eq!(rows[2].get::<String>(0)?, "c");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

pub mod session;
pub mod transaction;

pub use session::{Session, SessionConfig};
pub use transaction::Transaction;

pub use sqlbridge_batch::{
    BatchBuilder, BatchConfig, BatchStats, DEFAULT_MAX_BATCH_SIZE, InsertSql, PreparedBatch,
    RowBatch, StatementBatch,
};
pub use sqlbridge_convert::{
    ConvertingCursor, ConvertingStatement, GenericRowMapper, RowMapper, RowView, collect_rows,
};
pub use sqlbridge_core::{
    ColumnMeta, ColumnType, Connection, Cursor, Error, Identifier, ParameterSink, RawBatch,
    ResourceKind, Result, Row, Statement, TypeCode, Value, ValueKind,
};
pub use sqlbridge_dialect::{Dialect, DialectRegistry, resolve};

/// Component crates, for APIs not re-exported at the top level.
pub use sqlbridge_batch as batch;
pub use sqlbridge_convert as convert;
pub use sqlbridge_dialect as dialect;
#[cfg(feature = "sqlite")]
pub use sqlbridge_sqlite as sqlite;

/// The types most callers need.
pub mod prelude {
    pub use crate::{
        BatchConfig, BatchStats, Connection, Error, Result, Row, RowView, Session, SessionConfig,
        Transaction, Value,
    };
}
