//! Scriptable in-memory driver for tests.
//!
//! [`MockCursor`] serves canned rows and counts every accessor call.
//! [`MockConnection`] hands out statements that record binds, batches and
//! closes into a shared [`MockLog`]; querying a mock statement echoes the
//! current parameters back as a single row.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::Read;
use std::rc::Rc;

use crate::driver::{ColumnMeta, Connection, Cursor, ParameterSink, RawBatch, Statement};
use crate::error::{DriverOperation, Error, Result};
use crate::types::{ColumnType, TypeCode};
use crate::value::{Value, ValueKind};

/// Per-accessor call counters of a [`MockCursor`].
#[derive(Debug, Default)]
pub struct MockCalls {
    pub advances: Cell<usize>,
    pub null_checks: Cell<usize>,
    pub reads: Cell<usize>,
    pub typed_reads: Cell<usize>,
    pub timestamp_reads: Cell<usize>,
    pub lob_reads: Cell<usize>,
    pub metadata_reads: Cell<usize>,
    pub closes: Cell<usize>,
}

fn bump(cell: &Cell<usize>) {
    cell.set(cell.get() + 1);
}

/// The type code a mock column gets for a value kind.
pub fn type_code_for(kind: ValueKind) -> TypeCode {
    match kind {
        ValueKind::Null => TypeCode::Null,
        ValueKind::Bool => TypeCode::Boolean,
        ValueKind::TinyInt => TypeCode::TinyInt,
        ValueKind::SmallInt => TypeCode::SmallInt,
        ValueKind::Int => TypeCode::Integer,
        ValueKind::BigInt => TypeCode::BigInt,
        ValueKind::Float => TypeCode::Real,
        ValueKind::Double => TypeCode::Double,
        ValueKind::Decimal => TypeCode::Decimal,
        ValueKind::Text => TypeCode::VarChar,
        ValueKind::Bytes => TypeCode::VarBinary,
        ValueKind::Date => TypeCode::Date,
        ValueKind::Time => TypeCode::Time,
        ValueKind::Timestamp => TypeCode::Timestamp,
        ValueKind::TimestampTz => TypeCode::TimestampWithTimeZone,
        ValueKind::Array => TypeCode::Array,
        ValueKind::Json => TypeCode::Struct,
        ValueKind::Interval | ValueKind::Point | ValueKind::Uuid => TypeCode::Other,
    }
}

/// A cursor over canned rows.
#[derive(Debug)]
pub struct MockCursor {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
    failing_column: Option<usize>,
    fail_close: bool,
    calls: Rc<MockCalls>,
}

impl MockCursor {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
            failing_column: None,
            fail_close: false,
            calls: Rc::new(MockCalls::default()),
        }
    }

    /// Shorthand: one column per `(label, declared type)` pair.
    pub fn with_declared(columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> Self {
        let columns = columns
            .iter()
            .map(|(label, declared)| ColumnMeta::new(*label, ColumnType::from_declared(declared)))
            .collect();
        Self::new(columns, rows)
    }

    /// Every read of `index` fails with a driver error.
    pub fn fail_column(mut self, index: usize) -> Self {
        self.failing_column = Some(index);
        self
    }

    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn calls(&self) -> Rc<MockCalls> {
        Rc::clone(&self.calls)
    }

    fn cell(&self, index: usize) -> Result<&Value> {
        if self.failing_column == Some(index) {
            return Err(Error::driver(
                DriverOperation::Read,
                format!("mock read failure at column {}", index),
            ));
        }
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| Error::driver(DriverOperation::Read, "cursor is not on a row"))?;
        row.get(index).ok_or_else(|| {
            Error::driver(
                DriverOperation::Read,
                format!("column index {} out of range", index),
            )
        })
    }
}

impl Cursor for MockCursor {
    fn columns(&self) -> Result<Vec<ColumnMeta>> {
        bump(&self.calls.metadata_reads);
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> Result<bool> {
        bump(&self.calls.advances);
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        bump(&self.calls.null_checks);
        Ok(self.cell(index)?.is_null())
    }

    fn read(&self, index: usize) -> Result<Value> {
        bump(&self.calls.reads);
        self.cell(index).cloned()
    }

    fn read_as(&self, index: usize, kind: ValueKind) -> Result<Value> {
        bump(&self.calls.typed_reads);
        self.cell(index)?.clone().coerce(kind)
    }

    fn read_timestamp_utc(&self, index: usize) -> Result<i64> {
        bump(&self.calls.timestamp_reads);
        match self.cell(index)? {
            Value::Timestamp(v) | Value::TimestampTz(v) => Ok(*v),
            other => Err(Error::driver(
                DriverOperation::Read,
                format!("not a timestamp: {}", other.kind()),
            )),
        }
    }

    fn read_lob(&self, index: usize) -> Result<Box<dyn Read + '_>> {
        bump(&self.calls.lob_reads);
        match self.cell(index)? {
            Value::Bytes(b) => Ok(Box::new(b.as_slice())),
            Value::Text(s) => Ok(Box::new(s.as_bytes())),
            other => Err(Error::driver(
                DriverOperation::Read,
                format!("not a large object: {}", other.kind()),
            )),
        }
    }

    fn close(&mut self) -> Result<()> {
        bump(&self.calls.closes);
        if self.fail_close {
            return Err(Error::driver(DriverOperation::Close, "mock cursor refused to close"));
        }
        Ok(())
    }
}

/// Everything the mock driver observed.
#[derive(Debug, Default)]
pub struct MockLog {
    pub prepared: Vec<String>,
    pub binds: Vec<(usize, Value)>,
    /// One entry per `execute_batch` call, holding the flushed parameter sets.
    pub batches: Vec<Vec<Vec<Value>>>,
    pub executed: Vec<Vec<Value>>,
    /// One entry per raw `execute_batch` call.
    pub raw_batches: Vec<Vec<String>>,
    pub statements_closed: usize,
    pub raw_batches_closed: usize,
    pub transactions: Vec<&'static str>,
}

impl MockLog {
    /// Flushed parameter sets across every batch, in flush order.
    pub fn flushed_rows(&self) -> Vec<Vec<Value>> {
        self.batches.iter().flatten().cloned().collect()
    }
}

/// Failure switches for the mock driver.
#[derive(Debug, Clone, Default)]
pub struct MockFailures {
    pub fail_close: bool,
    /// Fail the n-th (zero-based) `execute_batch` call.
    pub fail_execute_batch_at: Option<usize>,
    /// Fail any bind of a value of this kind.
    pub fail_bind_kind: Option<ValueKind>,
}

/// A connection whose statements record into a shared [`MockLog`].
#[derive(Debug)]
pub struct MockConnection {
    url: String,
    log: Rc<RefCell<MockLog>>,
    failures: MockFailures,
}

impl MockConnection {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            log: Rc::new(RefCell::new(MockLog::default())),
            failures: MockFailures::default(),
        }
    }

    pub fn with_failures(mut self, failures: MockFailures) -> Self {
        self.failures = failures;
        self
    }

    pub fn log(&self) -> Rc<RefCell<MockLog>> {
        Rc::clone(&self.log)
    }
}

impl Connection for MockConnection {
    type Statement<'c> = MockStatement;
    type RawBatch<'c> = MockRawBatch;

    fn url(&self) -> &str {
        &self.url
    }

    fn prepare(&self, sql: &str) -> Result<MockStatement> {
        self.log.borrow_mut().prepared.push(sql.to_string());
        Ok(MockStatement::new(sql, Rc::clone(&self.log), self.failures.clone()))
    }

    fn raw_batch(&self) -> Result<MockRawBatch> {
        Ok(MockRawBatch {
            pending: Vec::new(),
            log: Rc::clone(&self.log),
            failures: self.failures.clone(),
        })
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        self.log.borrow_mut().executed.push(vec![Value::Text(sql.to_string())]);
        Ok(0)
    }

    fn begin(&self) -> Result<()> {
        self.log.borrow_mut().transactions.push("begin");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.log.borrow_mut().transactions.push("commit");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.log.borrow_mut().transactions.push("rollback");
        Ok(())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

/// A statement that records instead of executing.
#[derive(Debug)]
pub struct MockStatement {
    sql: String,
    params: BTreeMap<usize, Value>,
    pending: Vec<Vec<Value>>,
    batch_calls: usize,
    log: Rc<RefCell<MockLog>>,
    failures: MockFailures,
}

impl MockStatement {
    pub fn new(sql: &str, log: Rc<RefCell<MockLog>>, failures: MockFailures) -> Self {
        Self {
            sql: sql.to_string(),
            params: BTreeMap::new(),
            pending: Vec::new(),
            batch_calls: 0,
            log,
            failures,
        }
    }

    /// A standalone statement with its own log.
    pub fn standalone(sql: &str) -> Self {
        Self::new(sql, Rc::new(RefCell::new(MockLog::default())), MockFailures::default())
    }

    pub fn log(&self) -> Rc<RefCell<MockLog>> {
        Rc::clone(&self.log)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn current_params(&self) -> Vec<Value> {
        let len = self.params.keys().next_back().copied().unwrap_or(0);
        (1..=len)
            .map(|i| self.params.get(&i).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

impl ParameterSink for MockStatement {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        if index == 0 {
            return Err(Error::driver(DriverOperation::Bind, "parameter index is one-based"));
        }
        if self.failures.fail_bind_kind == Some(value.kind()) {
            return Err(Error::driver(
                DriverOperation::Bind,
                format!("mock refuses {} parameters", value.kind()),
            )
            .with_sql(&self.sql));
        }
        self.log.borrow_mut().binds.push((index, value.clone()));
        self.params.insert(index, value);
        Ok(())
    }
}

impl Statement for MockStatement {
    type Cursor<'a> = MockCursor;

    fn sql(&self) -> &str {
        &self.sql
    }

    fn parameter_count(&self) -> usize {
        self.sql.matches('?').count()
    }

    fn clear_parameters(&mut self) -> Result<()> {
        self.params.clear();
        Ok(())
    }

    fn add_batch(&mut self) -> Result<()> {
        let params = self.current_params();
        self.pending.push(params);
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let call = self.batch_calls;
        self.batch_calls += 1;
        let flushed = std::mem::take(&mut self.pending);
        if self.failures.fail_execute_batch_at == Some(call) {
            return Err(
                Error::driver(DriverOperation::ExecuteBatch, "mock batch failure").with_sql(&self.sql),
            );
        }
        let counts = vec![1; flushed.len()];
        self.log.borrow_mut().batches.push(flushed);
        Ok(counts)
    }

    fn execute(&mut self) -> Result<u64> {
        let params = self.current_params();
        self.log.borrow_mut().executed.push(params);
        Ok(1)
    }

    fn query(&mut self) -> Result<MockCursor> {
        let params = self.current_params();
        let columns = params
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let code = type_code_for(v.kind());
                ColumnMeta::new(format!("P{}", i + 1), ColumnType::new(code, code.to_string()))
            })
            .collect();
        Ok(MockCursor::new(columns, vec![params]))
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().statements_closed += 1;
        if self.failures.fail_close {
            return Err(
                Error::driver(DriverOperation::Close, "mock statement refused to close")
                    .with_sql(&self.sql),
            );
        }
        Ok(())
    }
}

/// Raw SQL batch that records instead of executing.
#[derive(Debug)]
pub struct MockRawBatch {
    pending: Vec<String>,
    log: Rc<RefCell<MockLog>>,
    failures: MockFailures,
}

impl RawBatch for MockRawBatch {
    fn add_sql(&mut self, sql: &str) -> Result<()> {
        self.pending.push(sql.to_string());
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let flushed = std::mem::take(&mut self.pending);
        let counts = vec![0; flushed.len()];
        self.log.borrow_mut().raw_batches.push(flushed);
        Ok(counts)
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().raw_batches_closed += 1;
        if self.failures.fail_close {
            return Err(Error::driver(DriverOperation::Close, "mock batch refused to close"));
        }
        Ok(())
    }
}
