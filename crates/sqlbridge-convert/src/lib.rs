//! The value conversion pipeline.
//!
//! - [`ConvertingCursor`] routes every cell read through the dialect's
//!   extractors and exposes a single, forward-only iteration.
//! - [`ConvertingStatement`] routes every parameter bind through the
//!   dialect's setters, caching one setter per value kind.
//! - [`GenericRowMapper`] materializes the current row into a [`Row`]; any
//!   `FnMut(&RowView) -> Result<T>` is a [`RowMapper`] too.
//!
//! [`Row`]: sqlbridge_core::Row

pub mod cursor;
pub mod mapper;
pub mod statement;

pub use cursor::{ConvertingCursor, MappedRows, collect_rows};
pub use mapper::{GenericRowMapper, RowMapper, RowView};
pub use statement::ConvertingStatement;
