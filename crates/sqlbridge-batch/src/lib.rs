//! Bounded-memory batch writes.
//!
//! Every batch is a thin composition over one [`BatchAccumulator`], which
//! counts rows, flushes the owned statement exactly when the pending count
//! reaches the configured threshold, and releases it once on close.
//!
//! | Batch | Rows are | Bound by |
//! |-------|----------|----------|
//! | [`StatementBatch`] | SQL text | nothing (unparameterized) |
//! | [`PreparedBatch`] | parameter sets | a caller closure or a value slice |
//! | [`RowBatch`] with [`RowBinder::Setter`] | caller rows | a per-row setter callback |
//! | [`RowBatch`] with [`RowBinder::Mapper`] | caller rows | positional values through the dialect |
//!
//! [`BatchBuilder`] generates the INSERT text and assembles a [`RowBatch`].
//!
//! Failures while binding or flushing propagate out of `add`/`close`
//! unchanged; nothing is retried.

pub mod accumulator;
pub mod builder;
pub mod config;
pub mod insert;
pub mod prepared;
pub mod rows;
pub mod statement_batch;

pub use accumulator::{BatchAccumulator, BatchSink, BatchStats};
pub use builder::BatchBuilder;
pub use config::{BatchConfig, DEFAULT_MAX_BATCH_SIZE};
pub use insert::InsertSql;
pub use prepared::{PreparedBatch, StatementSink};
pub use rows::{RowBatch, RowBinder, RowMapFn, RowSetter};
pub use statement_batch::{RawSink, StatementBatch};
