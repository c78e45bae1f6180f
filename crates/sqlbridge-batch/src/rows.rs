//! Row-object batches: each caller row becomes one parameter set.

use sqlbridge_core::{Error, Result, Statement, Value};
use sqlbridge_convert::ConvertingStatement;

use crate::accumulator::{BatchAccumulator, BatchStats, combine_scope};
use crate::config::BatchConfig;
use crate::prepared::StatementSink;

/// Binds all parameters of one row on the statement.
pub type RowSetter<'f, S, T> = Box<dyn FnMut(&mut ConvertingStatement<S>, &T) -> Result<()> + 'f>;

/// Maps one row to its positional parameter values.
pub type RowMapFn<'f, T> = Box<dyn FnMut(&T) -> Vec<Value> + 'f>;

/// How a row's parameters get onto the statement.
pub enum RowBinder<'f, S: Statement, T> {
    /// The callback binds every parameter itself.
    Setter(RowSetter<'f, S, T>),
    /// Values are bound positionally through the dialect's setters.
    Mapper(RowMapFn<'f, T>),
}

impl<S: Statement, T> RowBinder<'_, S, T> {
    fn bind(&mut self, stmt: &mut ConvertingStatement<S>, row: &T) -> Result<()> {
        match self {
            RowBinder::Setter(setter) => setter(stmt, row),
            RowBinder::Mapper(map) => {
                let values = map(row);
                let expected = stmt.inner().parameter_count();
                if expected > 0 && values.len() != expected {
                    return Err(Error::config(format!(
                        "row mapper produced {} values for {} parameters",
                        values.len(),
                        expected
                    )));
                }
                stmt.bind_all(&values)
            }
        }
    }
}

/// A batch of caller rows written through one prepared statement.
pub struct RowBatch<'f, S: Statement, T> {
    acc: BatchAccumulator<StatementSink<S>>,
    binder: RowBinder<'f, S, T>,
}

impl<'f, S: Statement, T> RowBatch<'f, S, T> {
    pub fn new(
        stmt: ConvertingStatement<S>,
        binder: RowBinder<'f, S, T>,
        config: &BatchConfig,
    ) -> Result<Self> {
        Ok(Self {
            acc: BatchAccumulator::new(StatementSink::new(stmt), config)?,
            binder,
        })
    }

    pub fn sql(&self) -> &str {
        self.acc.sink().statement().sql()
    }

    /// Bind `row`, append it to the pending batch, and count it.
    pub fn add(&mut self, row: &T) -> Result<()> {
        let stmt = self.acc.sink_mut()?.statement_mut();
        self.binder.bind(stmt, row)?;
        stmt.add_batch()?;
        self.acc.add()
    }

    /// Add every row in order, stopping at the first failure.
    pub fn add_all<'r, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'r T>,
        T: 'r,
    {
        for row in rows {
            self.add(row)?;
        }
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::Connection;
    use sqlbridge_core::mock::{MockConnection, MockStatement};
    use sqlbridge_dialect::{GenericDialect, PostgresDialect};
    use std::sync::Arc;

    struct Person {
        id: i64,
        name: &'static str,
    }

    const PEOPLE: [Person; 3] = [
        Person { id: 1, name: "a" },
        Person { id: 2, name: "b" },
        Person { id: 3, name: "c" },
    ];

    fn statement(conn: &MockConnection) -> ConvertingStatement<MockStatement> {
        let stmt = conn.prepare("insert into \"P\" (\"ID\",\"NAME\") values (?,?)").unwrap();
        ConvertingStatement::new(stmt, GenericDialect::shared())
    }

    #[test]
    fn test_mapper_binds_positionally() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let binder = RowBinder::Mapper(Box::new(|p: &Person| {
            vec![Value::BigInt(p.id), Value::Text(p.name.to_string())]
        }));
        let mut batch =
            RowBatch::new(statement(&conn), binder, &BatchConfig::new().max_batch_size(2)).unwrap();
        batch.add_all(&PEOPLE).unwrap();
        let stats = batch.close().unwrap();
        assert_eq!(stats.flushes, 2);
        assert_eq!(
            log.borrow().flushed_rows(),
            vec![
                vec![Value::BigInt(1), Value::Text("a".into())],
                vec![Value::BigInt(2), Value::Text("b".into())],
                vec![Value::BigInt(3), Value::Text("c".into())],
            ]
        );
        assert_eq!(log.borrow().statements_closed, 1);
    }

    #[test]
    fn test_setter_callback_binds_row() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let binder = RowBinder::Setter(Box::new(
            |stmt: &mut ConvertingStatement<MockStatement>, p: &Person| {
                stmt.bind(2, &Value::Text(p.name.to_uppercase()))?;
                stmt.bind(1, &Value::BigInt(p.id * 10))
            },
        ));
        let mut batch = RowBatch::new(statement(&conn), binder, &BatchConfig::new()).unwrap();
        batch.add(&PEOPLE[0]).unwrap();
        batch.close().unwrap();
        assert_eq!(
            log.borrow().flushed_rows(),
            vec![vec![Value::BigInt(10), Value::Text("A".into())]]
        );
    }

    #[test]
    fn test_mapper_value_count_checked() {
        let conn = MockConnection::new("mock:");
        let binder = RowBinder::Mapper(Box::new(|p: &Person| vec![Value::BigInt(p.id)]));
        let mut batch = RowBatch::new(statement(&conn), binder, &BatchConfig::new()).unwrap();
        let err = batch.add(&PEOPLE[0]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(batch.stats().total_rows, 0);
    }

    #[test]
    fn test_mapper_values_use_dialect_setters() {
        let conn = MockConnection::new("postgresql://db");
        let log = conn.log();
        let stmt = ConvertingStatement::new(
            conn.prepare("insert into j values (?)").unwrap(),
            Arc::new(PostgresDialect),
        );
        let binder = RowBinder::Mapper(Box::new(|v: &serde_json::Value| vec![Value::Json(v.clone())]));
        let mut batch = RowBatch::new(stmt, binder, &BatchConfig::new()).unwrap();
        batch.add(&serde_json::json!({"k": 1})).unwrap();
        batch.close().unwrap();
        assert_eq!(
            log.borrow().flushed_rows(),
            vec![vec![Value::Text("{\"k\":1}".into())]]
        );
    }

    #[test]
    fn test_dropped_batch_flushes_and_releases_once() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        {
            let binder = RowBinder::Mapper(Box::new(|p: &Person| {
                vec![Value::BigInt(p.id), Value::Text(p.name.to_string())]
            }));
            let mut batch = RowBatch::new(statement(&conn), binder, &BatchConfig::new()).unwrap();
            batch.add(&PEOPLE[1]).unwrap();
        }
        assert_eq!(log.borrow().batches.len(), 1);
        assert_eq!(log.borrow().statements_closed, 1);
    }
}
