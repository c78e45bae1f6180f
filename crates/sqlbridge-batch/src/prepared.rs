//! Prepared-statement batches with caller-driven binding.

use sqlbridge_core::{ResourceKind, Result, Statement, Value};
use sqlbridge_convert::ConvertingStatement;

use crate::accumulator::{BatchAccumulator, BatchSink, BatchStats, combine_scope};
use crate::config::BatchConfig;

/// Sink that executes a prepared statement's pending parameter sets.
pub struct StatementSink<S: Statement> {
    stmt: ConvertingStatement<S>,
}

impl<S: Statement> StatementSink<S> {
    pub(crate) fn new(stmt: ConvertingStatement<S>) -> Self {
        Self { stmt }
    }

    pub fn statement(&self) -> &ConvertingStatement<S> {
        &self.stmt
    }

    pub(crate) fn statement_mut(&mut self) -> &mut ConvertingStatement<S> {
        &mut self.stmt
    }
}

impl<S: Statement> BatchSink for StatementSink<S> {
    fn flush(&mut self, pending: usize) -> Result<()> {
        let counts = self.stmt.execute_batch()?;
        tracing::trace!(
            sql = %self.stmt.sql(),
            rows = pending,
            affected = counts.len(),
            "Executed statement batch"
        );
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.stmt.close()
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Statement
    }
}

/// A prepared statement executed in bounded batches.
///
/// Each row is bound by the caller (or positionally from values), appended
/// to the statement's pending batch, and then counted by the accumulator.
pub struct PreparedBatch<S: Statement> {
    acc: BatchAccumulator<StatementSink<S>>,
}

impl<S: Statement> PreparedBatch<S> {
    pub fn new(stmt: ConvertingStatement<S>, config: &BatchConfig) -> Result<Self> {
        Ok(Self {
            acc: BatchAccumulator::new(StatementSink::new(stmt), config)?,
        })
    }

    pub fn sql(&self) -> &str {
        self.acc.sink().statement().sql()
    }

    /// Add one row whose parameters `bind` sets on the statement.
    pub fn add_with<F>(&mut self, bind: F) -> Result<()>
    where
        F: FnOnce(&mut ConvertingStatement<S>) -> Result<()>,
    {
        let stmt = self.acc.sink_mut()?.statement_mut();
        bind(stmt)?;
        stmt.add_batch()?;
        self.acc.add()
    }

    /// Add one row bound positionally from `values`.
    pub fn add(&mut self, values: &[Value]) -> Result<()> {
        self.add_with(|stmt| stmt.bind_all(values))
    }

    pub fn stats(&self) -> BatchStats {
        self.acc.stats()
    }

    pub fn close(mut self) -> Result<BatchStats> {
        self.acc.close()
    }

    /// Run `body`, then close the batch whatever it returned.
    pub fn scope<F, R>(mut self, body: F) -> Result<(R, BatchStats)>
    where
        F: FnOnce(&mut Self) -> Result<R>,
    {
        let outcome = body(&mut self);
        let closed = self.acc.close();
        combine_scope(outcome, closed)
    }
}
