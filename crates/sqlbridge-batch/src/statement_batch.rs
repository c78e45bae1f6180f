//! Batches of unparameterized SQL statements.

use sqlbridge_core::{RawBatch, ResourceKind, Result};

use crate::accumulator::{BatchAccumulator, BatchSink, BatchStats, combine_scope};
use crate::config::BatchConfig;

/// Sink that executes a driver's raw statement batch.
#[derive(Debug)]
pub struct RawSink<B> {
    batch: B,
}

impl<B: RawBatch> BatchSink for RawSink<B> {
    fn flush(&mut self, _pending: usize) -> Result<()> {
        self.batch.execute_batch()?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.batch.close()
    }

    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Batch
    }
}

/// Accumulates SQL text and executes it in bounded batches.
pub struct StatementBatch<B: RawBatch> {
    acc: BatchAccumulator<RawSink<B>>,
}

impl<B: RawBatch> StatementBatch<B> {
    pub fn new(batch: B, config: &BatchConfig) -> Result<Self> {
        Ok(Self {
            acc: BatchAccumulator::new(RawSink { batch }, config)?,
        })
    }

    /// Queue one statement.
    pub fn add(&mut self, sql: &str) -> Result<()> {
        tracing::trace!(sql = %sql, "Queueing batch statement");
        self.acc.sink_mut()?.batch.add_sql(sql)?;
        self.acc.add()
    }

    pub fn stats(&self) -> BatchStats {
        self.acc.stats()
    }

    /// Flush the remaining statements and release the driver batch.
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::{MockConnection, MockFailures};
    use sqlbridge_core::{Connection, Error};

    #[test]
    fn test_statements_flush_in_order() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let mut batch =
            StatementBatch::new(conn.raw_batch().unwrap(), &BatchConfig::new().max_batch_size(2))
                .unwrap();
        for sql in ["delete from a", "delete from b", "delete from c"] {
            batch.add(sql).unwrap();
        }
        let stats = batch.close().unwrap();
        assert_eq!(stats.flushes, 2);
        assert_eq!(stats.total_rows, 3);
        let log = log.borrow();
        assert_eq!(
            log.raw_batches,
            vec![
                vec!["delete from a".to_string(), "delete from b".to_string()],
                vec!["delete from c".to_string()],
            ]
        );
        assert_eq!(log.raw_batches_closed, 1);
    }

    #[test]
    fn test_close_failure_reports_batch_resource() {
        let conn = MockConnection::new("mock:").with_failures(MockFailures {
            fail_close: true,
            ..MockFailures::default()
        });
        let batch = StatementBatch::new(conn.raw_batch().unwrap(), &BatchConfig::new()).unwrap();
        let err = batch.close().unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceRelease(ref e) if e.resource == ResourceKind::Batch
        ));
    }

    #[test]
    fn test_scope_flushes_on_error() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let batch = StatementBatch::new(conn.raw_batch().unwrap(), &BatchConfig::new()).unwrap();
        let result = batch.scope(|b| {
            b.add("update t set x = 1")?;
            Err::<(), _>(Error::illegal_state("stop"))
        });
        assert!(result.unwrap_err().is_illegal_state());
        assert_eq!(log.borrow().raw_batches.len(), 1);
        assert_eq!(log.borrow().raw_batches_closed, 1);
    }
}
