//! The batch accumulator: counting, threshold flushes and single release.
//!
//! ```text
//! OPEN --add()--> OPEN (flush when pending == max) --close()--> CLOSED
//! ```
//!
//! The accumulator owns exactly one [`BatchSink`] and is the only place the
//! sink is released, so composing types never close the resource themselves.

use serde::Serialize;
use sqlbridge_core::{Error, ResourceKind, Result};

use crate::config::BatchConfig;

/// The resource a batch writes through.
pub trait BatchSink {
    /// Execute the `pending` rows accumulated since the last flush.
    /// Never called with `pending == 0`.
    fn flush(&mut self, pending: usize) -> Result<()>;

    /// Release the underlying resource. Called exactly once.
    fn release(&mut self) -> Result<()>;

    /// What [`release`](BatchSink::release) closes, for error reporting.
    fn resource_kind(&self) -> ResourceKind {
        ResourceKind::Statement
    }
}

/// Counters reported by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchStats {
    /// Rows added over the batch's lifetime.
    pub total_rows: u64,
    /// Number of times the sink was flushed.
    pub flushes: u64,
    /// Rows added since the last flush.
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
}

/// Counts rows, flushes at an exact threshold, and releases its sink once.
///
/// Dropping an open accumulator closes it best-effort and logs any failure;
/// call [`close`](BatchAccumulator::close) to observe errors.
pub struct BatchAccumulator<S: BatchSink> {
    sink: S,
    max_pending: usize,
    total: u64,
    pending: usize,
    flushes: u64,
    state: State,
}

impl<S: BatchSink> BatchAccumulator<S> {
    pub fn new(sink: S, config: &BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sink,
            max_pending: config.max_batch_size,
            total: 0,
            pending: 0,
            flushes: 0,
            state: State::Open,
        })
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            total_rows: self.total,
            flushes: self.flushes,
            pending: self.pending,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink while the batch is open.
    pub fn sink_mut(&mut self) -> Result<&mut S> {
        self.ensure_open()?;
        Ok(&mut self.sink)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == State::Closed {
            return Err(Error::illegal_state("batch is closed"));
        }
        Ok(())
    }

    /// Register one row. Flushes when the pending count reaches the threshold.
    pub fn add(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.total += 1;
        self.pending += 1;
        if self.pending == self.max_pending {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Flush pending rows now. A no-op when nothing is pending.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_pending()
    }

    fn flush_pending(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        tracing::debug!(
            rows = pending,
            total = self.total,
            flush = self.flushes + 1,
            "Flushing batch"
        );
        self.sink.flush(pending)?;
        self.flushes += 1;
        Ok(())
    }

    /// Flush what is pending, release the sink, and move to CLOSED.
    ///
    /// Calling `close` on a closed batch returns the final stats without
    /// flushing or releasing again. If both the flush and the release fail,
    /// the release error is returned with the flush error attached.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn close(&mut self) -> Result<BatchStats> {
        if self.state == State::Closed {
            return Ok(self.stats());
        }
        self.state = State::Closed;
        let flushed = self.flush_pending();
        let released = self.sink.release().map_err(|e| self.release_error(e));
        let stats = self.stats();
        tracing::debug!(
            total_rows = stats.total_rows,
            flushes = stats.flushes,
            "Closed batch"
        );
        match (flushed, released) {
            (Ok(()), Ok(())) => Ok(stats),
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(release)) => Err(release),
            (Err(e), Err(release)) => Err(release.with_suppressed(e)),
        }
    }

    fn release_error(&self, error: Error) -> Error {
        match error {
            Error::ResourceRelease(_) => error,
            other => Error::resource_release(self.sink.resource_kind(), other, None),
        }
    }

    /// Run `body` against the open batch, then close it whatever `body`
    /// returned. Rows still pending are flushed even when `body` fails.
    ///
    /// A release failure always wins, carrying a body error as suppressed;
    /// otherwise a body error takes precedence over a close error.
    pub fn scope<F, R>(mut self, body: F) -> Result<(R, BatchStats)>
    where
        F: FnOnce(&mut Self) -> Result<R>,
    {
        let outcome = body(&mut self);
        let closed = self.close();
        combine_scope(outcome, closed)
    }
}

/// Merge a scoped body's outcome with the close that followed it.
pub(crate) fn combine_scope<R>(
    outcome: Result<R>,
    closed: Result<BatchStats>,
) -> Result<(R, BatchStats)> {
    match (outcome, closed) {
        (Ok(value), Ok(stats)) => Ok((value, stats)),
        (Ok(_), Err(close)) => Err(close),
        (Err(body), Ok(_)) => Err(body),
        (Err(body), Err(close @ Error::ResourceRelease(_))) => Err(close.with_suppressed(body)),
        (Err(body), Err(close)) => {
            tracing::debug!(error = %close, "Close failed after batch body error");
            Err(body)
        }
    }
}

impl<S: BatchSink> Drop for BatchAccumulator<S> {
    fn drop(&mut self) {
        if self.state == State::Open {
            tracing::warn!(
                pending = self.pending,
                total = self.total,
                "Batch dropped without close; closing"
            );
            if let Err(e) = self.close() {
                tracing::error!(error = %e, "Best-effort batch close failed");
            }
        }
    }
}
