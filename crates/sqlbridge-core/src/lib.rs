//! Core types and traits for sqlbridge.
//!
//! `sqlbridge-core` is the **foundation layer** of the workspace. It defines
//! the data model and the blocking client contract every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Client contract**: `Connection`, `Statement`, `Cursor` and `RawBatch`
//!   describe the blocking SQL client. Driver crates implement them.
//! - **Data model**: `Value`, `ColumnType` and `Row` carry converted cells and
//!   parameters between dialects, cursors and batches.
//! - **Errors**: a single `Error` enum with the failing driver operation and
//!   SQL text attached where known.
//!
//! # Who Uses This Crate
//!
//! - `sqlbridge-dialect` builds extractors and setters over `Cursor` and
//!   `ParameterSink`.
//! - `sqlbridge-convert` wraps cursors and statements with dialect conversions.
//! - `sqlbridge-batch` drives `Statement::add_batch` / `execute_batch`.
//! - `sqlbridge-sqlite` implements the client contract on top of rusqlite.
//!
//! Most applications should use the `sqlbridge` facade; reach for
//! `sqlbridge-core` directly when writing drivers.

pub mod driver;
pub mod error;
pub mod identifiers;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod row;
pub mod types;
pub mod value;

pub use driver::{ColumnMeta, Connection, Cursor, ParameterSink, RawBatch, Statement};
pub use error::{
    DriverError, DriverOperation, Error, NoSuchColumnError, ResourceKind, ResourceReleaseError,
    Result, RowExtractionError, TypeMismatchError,
};
pub use identifiers::{Identifier, quote_ident};
pub use row::{ColumnLabels, ColumnValue, Row, RowColumns};
pub use types::{ColumnType, DeclaredType, TypeCode};
pub use value::{FromValue, Interval, Point, Value, ValueKind, format_uuid, parse_uuid};
