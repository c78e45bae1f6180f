//! The blocking database client interface sqlbridge builds on.
//!
//! Driver crates (e.g. `sqlbridge-sqlite`) implement these traits. Every
//! method is a direct blocking call; implementations translate client
//! failures into [`Error::Driver`](crate::Error::Driver) at the point of
//! occurrence.
//!
//! Column positions are zero-based. Parameter positions are one-based.

use std::io::Read;

use crate::error::{DriverOperation, Error, Result};
use crate::types::ColumnType;
use crate::value::{Value, ValueKind};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    /// The label used for lookups (`AS` alias when present).
    pub label: String,
    /// The underlying column name.
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnMeta {
    pub fn new(label: impl Into<String>, column_type: ColumnType) -> Self {
        let label = label.into();
        Self {
            name: label.clone(),
            label,
            column_type,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A forward-only result cursor.
///
/// Reads address the current row; calling them before the first successful
/// [`advance`](Cursor::advance) is a driver error.
pub trait Cursor {
    /// Column metadata, in order.
    fn columns(&self) -> Result<Vec<ColumnMeta>>;

    /// Move to the next row. Returns `false` once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Whether the cell at `index` is SQL NULL.
    fn is_null(&self, index: usize) -> Result<bool>;

    /// Untyped default read.
    fn read(&self, index: usize) -> Result<Value>;

    /// Read with an explicit target kind.
    fn read_as(&self, index: usize, kind: ValueKind) -> Result<Value> {
        self.read(index)?.coerce(kind)
    }

    /// Calendar-aware timestamp read pinned to UTC, in microseconds since
    /// the Unix epoch. The cell must not be NULL.
    fn read_timestamp_utc(&self, index: usize) -> Result<i64> {
        match self.read(index)? {
            Value::Timestamp(v) | Value::TimestampTz(v) => Ok(v),
            other => Err(Error::driver(
                DriverOperation::Read,
                format!("column {} is not a timestamp ({})", index, other.kind()),
            )),
        }
    }

    /// Open the large object stored at `index`. The cell must not be NULL.
    fn read_lob(&self, index: usize) -> Result<Box<dyn Read + '_>> {
        match self.read(index)? {
            Value::Bytes(b) => Ok(Box::new(std::io::Cursor::new(b))),
            Value::Text(s) => Ok(Box::new(std::io::Cursor::new(s.into_bytes()))),
            other => Err(Error::driver(
                DriverOperation::Read,
                format!("column {} is not a large object ({})", index, other.kind()),
            )),
        }
    }

    /// Release the cursor.
    fn close(&mut self) -> Result<()>;
}

/// The binding half of a prepared statement, as seen by value setters.
pub trait ParameterSink {
    /// Untyped default bind at one-based `index`.
    fn bind(&mut self, index: usize, value: Value) -> Result<()>;

    /// Bind SQL NULL at one-based `index`.
    fn bind_null(&mut self, index: usize) -> Result<()> {
        self.bind(index, Value::Null)
    }

    /// Calendar-aware timestamp bind pinned to UTC.
    fn bind_timestamp_utc(&mut self, index: usize, micros: i64) -> Result<()> {
        self.bind(index, Value::TimestampTz(micros))
    }
}

/// A prepared statement.
pub trait Statement: ParameterSink {
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// SQL text this statement was prepared from.
    fn sql(&self) -> &str;

    fn parameter_count(&self) -> usize;

    fn clear_parameters(&mut self) -> Result<()>;

    /// Append the current parameter set to the pending batch.
    fn add_batch(&mut self) -> Result<()>;

    /// Execute the pending batch; one affected-row count per parameter set.
    fn execute_batch(&mut self) -> Result<Vec<u64>>;

    /// Execute once with the current parameters.
    fn execute(&mut self) -> Result<u64>;

    /// Run the statement as a query with the current parameters.
    fn query(&mut self) -> Result<Self::Cursor<'_>>;

    /// Release the statement. Must be called at most once.
    fn close(&mut self) -> Result<()>;
}

/// A batch of unparameterized SQL statements.
pub trait RawBatch {
    fn add_sql(&mut self, sql: &str) -> Result<()>;

    fn execute_batch(&mut self) -> Result<Vec<u64>>;

    fn close(&mut self) -> Result<()>;
}

/// A single database connection.
pub trait Connection {
    type Statement<'c>: Statement
    where
        Self: 'c;

    type RawBatch<'c>: RawBatch
    where
        Self: 'c;

    /// The URL this connection was opened with; drives dialect selection.
    fn url(&self) -> &str;

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>>;

    fn raw_batch(&self) -> Result<Self::RawBatch<'_>>;

    /// Execute one unparameterized statement.
    fn execute(&self, sql: &str) -> Result<u64>;

    fn begin(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    fn close(self) -> Result<()>;
}
