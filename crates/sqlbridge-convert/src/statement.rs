//! The write side of the conversion pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use sqlbridge_core::{Error, ParameterSink, ResourceKind, Result, Statement, Value, ValueKind};
use sqlbridge_dialect::{Dialect, Setter};

use crate::cursor::ConvertingCursor;

/// A prepared statement whose parameters are bound through dialect setters.
///
/// Setters are resolved by [`ValueKind`] on first use and cached for the
/// life of the statement. NULL bypasses resolution and binds through the
/// driver's untyped NULL path.
pub struct ConvertingStatement<S> {
    inner: S,
    dialect: Arc<dyn Dialect>,
    setters: HashMap<ValueKind, Setter>,
    closed: bool,
}

impl<S: Statement> ConvertingStatement<S> {
    pub fn new(inner: S, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            inner,
            dialect,
            setters: HashMap::new(),
            closed: false,
        }
    }

    pub fn sql(&self) -> &str {
        self.inner.sql()
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Number of distinct value kinds a setter has been resolved for.
    pub fn cached_setters(&self) -> usize {
        self.setters.len()
    }

    fn setter_for(&mut self, kind: ValueKind) -> Setter {
        if let Some(setter) = self.setters.get(&kind) {
            return Arc::clone(setter);
        }
        tracing::trace!(kind = %kind, dialect = self.dialect.name(), "Resolving parameter setter");
        let setter = self.dialect.setter(kind);
        self.setters.insert(kind, Arc::clone(&setter));
        setter
    }

    /// Bind `value` at one-based `index`.
    pub fn bind(&mut self, index: usize, value: &Value) -> Result<()> {
        self.ensure_open()?;
        let result = if value.is_null() {
            self.inner.bind_null(index)
        } else {
            let setter = self.setter_for(value.kind());
            setter(&mut self.inner, index, value)
        };
        result.map_err(|e| e.with_sql(self.inner.sql()))
    }

    /// Bind `values` positionally: element `i` goes to parameter `i + 1`.
    pub fn bind_all(&mut self, values: &[Value]) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            self.bind(i + 1, value)?;
        }
        Ok(())
    }

    pub fn clear_parameters(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.clear_parameters()
    }

    pub fn add_batch(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.add_batch()
    }

    pub fn execute_batch(&mut self) -> Result<Vec<u64>> {
        self.ensure_open()?;
        self.inner.execute_batch()
    }

    pub fn execute(&mut self) -> Result<u64> {
        self.ensure_open()?;
        self.inner.execute()
    }

    /// Run as a query; the cursor converts through the same dialect.
    pub fn query(&mut self) -> Result<ConvertingCursor<S::Cursor<'_>>> {
        self.ensure_open()?;
        let dialect = Arc::clone(&self.dialect);
        let cursor = self.inner.query()?;
        ConvertingCursor::new(cursor, dialect)
    }

    /// Release the statement. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner
            .close()
            .map_err(|e| Error::resource_release(ResourceKind::Statement, e, None))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::illegal_state("statement is closed"));
        }
        Ok(())
    }
}

impl<S: Statement> ParameterSink for ConvertingStatement<S> {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        ConvertingStatement::bind(self, index, &value)
    }

    fn bind_null(&mut self, index: usize) -> Result<()> {
        self.ensure_open()?;
        self.inner.bind_null(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::{MockFailures, MockLog, MockStatement};
    use sqlbridge_core::{Cursor, Interval};
    use sqlbridge_dialect::{GenericDialect, PostgresDialect};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_setters_cached_per_kind() {
        let stmt = MockStatement::standalone("insert into t values (?,?,?)");
        let mut stmt = ConvertingStatement::new(stmt, Arc::new(PostgresDialect));
        stmt.bind_all(&[Value::BigInt(1), Value::BigInt(2), Value::Text("x".into())])
            .unwrap();
        stmt.bind(1, &Value::BigInt(3)).unwrap();
        assert_eq!(stmt.cached_setters(), 2);
        stmt.bind(2, &Value::Null).unwrap();
        assert_eq!(stmt.cached_setters(), 2);
    }

    #[test]
    fn test_null_bypasses_setter_resolution() {
        let log = Rc::new(RefCell::new(MockLog::default()));
        let inner = MockStatement::new("select ?", Rc::clone(&log), MockFailures::default());
        let mut stmt = ConvertingStatement::new(inner, Arc::new(PostgresDialect));
        stmt.bind(1, &Value::Null).unwrap();
        assert_eq!(stmt.cached_setters(), 0);
        assert_eq!(log.borrow().binds, vec![(1, Value::Null)]);
    }

    #[test]
    fn test_dialect_setter_applied_and_query_converts() {
        let stmt = MockStatement::standalone("select ?");
        let mut stmt = ConvertingStatement::new(stmt, Arc::new(PostgresDialect));
        stmt.bind(1, &Value::Interval(Interval::new(0, 2, 0))).unwrap();
        let mut cursor = stmt.query().unwrap();
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.get(0).unwrap(), Value::Text("P2D".into()));
        cursor.close().unwrap();
    }

    #[test]
    fn test_bind_failure_carries_sql() {
        let failures = MockFailures {
            fail_bind_kind: Some(ValueKind::Double),
            ..MockFailures::default()
        };
        let inner = MockStatement::new(
            "insert into m values (?)",
            Rc::new(RefCell::new(MockLog::default())),
            failures,
        );
        let mut stmt = ConvertingStatement::new(inner, GenericDialect::shared());
        let err = stmt.bind(1, &Value::Double(1.0)).unwrap_err();
        assert_eq!(err.sql(), Some("insert into m values (?)"));
    }

    #[test]
    fn test_close_once() {
        let stmt = MockStatement::standalone("select 1");
        let log = stmt.log();
        let mut stmt = ConvertingStatement::new(stmt, GenericDialect::shared());
        stmt.close().unwrap();
        stmt.close().unwrap();
        assert_eq!(log.borrow().statements_closed, 1);
        assert!(stmt.execute().unwrap_err().is_illegal_state());
    }

    #[test]
    fn test_mock_cursor_columns_visible() {
        let stmt = MockStatement::standalone("select ?");
        let mut stmt = ConvertingStatement::new(stmt, GenericDialect::shared());
        stmt.bind(1, &Value::BigInt(9)).unwrap();
        let cursor = stmt.query().unwrap();
        assert_eq!(cursor.column_metas()[0].label, "P1");
        let mut inner = cursor.into_inner();
        assert!(inner.advance().unwrap());
    }
}
