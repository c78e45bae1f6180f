//! Error types for sqlbridge.
//!
//! Every failure that crosses a crate boundary is an [`Error`]. Driver
//! failures are wrapped at the point of occurrence with the operation that
//! failed and, where known, the SQL text. Nothing in this workspace retries.

use std::fmt;

use crate::types::ColumnType;
use crate::value::ValueKind;

/// The primary error type for all sqlbridge operations.
#[derive(Debug)]
pub enum Error {
    /// The underlying database client failed.
    Driver(DriverError),
    /// A typed accessor was asked for a type the stored value does not satisfy.
    TypeMismatch(TypeMismatchError),
    /// A label-based lookup found no matching column.
    NoSuchColumn(NoSuchColumnError),
    /// An extractor failed while materializing one cell.
    RowExtraction(RowExtractionError),
    /// Closing a statement, cursor or connection failed. Always fatal.
    ResourceRelease(ResourceReleaseError),
    /// Operation attempted in the wrong lifecycle state.
    IllegalState(String),
    /// Invalid builder or batch configuration.
    Config(String),
}

/// The driver operation that produced a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOperation {
    Connect,
    Prepare,
    Bind,
    AddBatch,
    Execute,
    ExecuteBatch,
    Query,
    Fetch,
    Read,
    Metadata,
    Transaction,
    Close,
}

impl DriverOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            DriverOperation::Connect => "connect",
            DriverOperation::Prepare => "prepare",
            DriverOperation::Bind => "bind",
            DriverOperation::AddBatch => "add batch",
            DriverOperation::Execute => "execute",
            DriverOperation::ExecuteBatch => "execute batch",
            DriverOperation::Query => "query",
            DriverOperation::Fetch => "fetch",
            DriverOperation::Read => "read",
            DriverOperation::Metadata => "read metadata",
            DriverOperation::Transaction => "transaction",
            DriverOperation::Close => "close",
        }
    }
}

impl fmt::Display for DriverOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct DriverError {
    pub operation: DriverOperation,
    pub message: String,
    /// SQL text the operation was running, if any.
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct TypeMismatchError {
    /// Human-readable name of the requested type.
    pub expected: &'static str,
    /// Kind of the value actually stored.
    pub actual: ValueKind,
    /// Column label, when the value came from a row.
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct NoSuchColumnError {
    pub label: String,
    pub available: Vec<String>,
}

#[derive(Debug)]
pub struct RowExtractionError {
    /// Index of the row assigned by the iteration that produced it.
    pub row_index: u64,
    /// Zero-based column position.
    pub column_index: usize,
    pub column_label: String,
    pub column_type: ColumnType,
    pub source: Box<Error>,
}

/// What kind of resource failed to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Statement,
    Cursor,
    Connection,
    Batch,
}

impl ResourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Statement => "statement",
            ResourceKind::Cursor => "cursor",
            ResourceKind::Connection => "connection",
            ResourceKind::Batch => "batch",
        }
    }
}

#[derive(Debug)]
pub struct ResourceReleaseError {
    pub resource: ResourceKind,
    pub source: Box<Error>,
    /// An error that was already propagating when the release failed.
    pub suppressed: Option<Box<Error>>,
}

impl Error {
    /// Build a driver error for `operation`.
    pub fn driver(operation: DriverOperation, message: impl Into<String>) -> Self {
        Error::Driver(DriverError {
            operation,
            message: message.into(),
            sql: None,
            source: None,
        })
    }

    /// Wrap a client library error as a driver error.
    pub fn driver_source<E>(operation: DriverOperation, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Driver(DriverError {
            operation,
            message: source.to_string(),
            sql: None,
            source: Some(Box::new(source)),
        })
    }

    /// Attach SQL text to a driver error. Other variants are returned unchanged.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        if let Error::Driver(ref mut err) = self {
            if err.sql.is_none() {
                err.sql = Some(sql.into());
            }
        }
        self
    }

    pub fn type_mismatch(expected: &'static str, actual: ValueKind) -> Self {
        Error::TypeMismatch(TypeMismatchError {
            expected,
            actual,
            column: None,
        })
    }

    pub fn no_such_column(label: impl Into<String>, available: Vec<String>) -> Self {
        Error::NoSuchColumn(NoSuchColumnError {
            label: label.into(),
            available,
        })
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Error::IllegalState(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Wrap a failed close. `suppressed` is an error that was already in flight.
    pub fn resource_release(resource: ResourceKind, source: Error, suppressed: Option<Error>) -> Self {
        tracing::debug!(resource = ?resource, error = %source, "Resource release failed");
        Error::ResourceRelease(ResourceReleaseError {
            resource,
            source: Box::new(source),
            suppressed: suppressed.map(Box::new),
        })
    }

    /// Attach an error that was already propagating when a release failed.
    /// Errors other than `ResourceRelease` are returned unchanged.
    #[must_use]
    pub fn with_suppressed(mut self, suppressed: Error) -> Self {
        if let Error::ResourceRelease(ref mut err) = self {
            if err.suppressed.is_none() {
                tracing::trace!(
                    resource = ?err.resource,
                    suppressed = %suppressed,
                    "Release failure supersedes propagating error"
                );
                err.suppressed = Some(Box::new(suppressed));
            } else {
                tracing::debug!(dropped = %suppressed, "Release failure already carries a suppressed error");
            }
        }
        self
    }

    /// Attach a column label to a type mismatch raised by a bare value accessor.
    #[must_use]
    pub fn in_column(mut self, label: &str) -> Self {
        if let Error::TypeMismatch(ref mut err) = self {
            if err.column.is_none() {
                err.column = Some(label.to_string());
            }
        }
        self
    }

    /// The SQL text attached to this error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Driver(e) => e.sql.as_deref(),
            Error::RowExtraction(e) => e.source.sql(),
            Error::ResourceRelease(e) => e.source.sql(),
            _ => None,
        }
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, Error::Driver(_))
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Driver(e) => {
                write!(f, "Driver error during {}: {}", e.operation, e.message)?;
                if let Some(sql) = &e.sql {
                    write!(f, " [sql: {}]", sql)?;
                }
                Ok(())
            }
            Error::TypeMismatch(e) => match &e.column {
                Some(col) => write!(
                    f,
                    "Type mismatch in column '{}': expected {}, found {}",
                    col, e.expected, e.actual
                ),
                None => write!(f, "Type mismatch: expected {}, found {}", e.expected, e.actual),
            },
            Error::NoSuchColumn(e) => write!(
                f,
                "No such column '{}'; available columns: [{}]",
                e.label,
                e.available.join(", ")
            ),
            Error::RowExtraction(e) => write!(
                f,
                "Failed to extract row {} column {} ('{}', {} {}): {}",
                e.row_index,
                e.column_index,
                e.column_label,
                e.column_type.type_code,
                e.column_type.type_name,
                e.source
            ),
            Error::ResourceRelease(e) => {
                write!(f, "Failed to release {}: {}", e.resource.as_str(), e.source)?;
                if let Some(suppressed) = &e.suppressed {
                    write!(f, " (while handling: {})", suppressed)?;
                }
                Ok(())
            }
            Error::IllegalState(msg) => write!(f, "Illegal state: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Driver(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::RowExtraction(e) => Some(e.source.as_ref()),
            Error::ResourceRelease(e) => Some(e.source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for sqlbridge operations.
pub type Result<T> = std::result::Result<T, Error>;
