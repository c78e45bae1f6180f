//! A connection paired with its resolved dialect.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlbridge_batch::{BatchBuilder, BatchConfig, BatchStats, PreparedBatch, RowBatch, StatementBatch};
use sqlbridge_convert::{ConvertingStatement, GenericRowMapper, RowMapper};
use sqlbridge_core::{Connection, Error, Identifier, ResourceKind, Result, Row, Value};
use sqlbridge_dialect::{Dialect, DialectRegistry};

use crate::transaction::Transaction;

/// Session-wide defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Configuration applied to every batch the session opens.
    pub batch: BatchConfig,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default flush threshold for batches.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.batch.max_batch_size = size;
        self
    }
}

/// A connection plus the dialect resolved from its URL.
///
/// Every statement the session prepares converts parameters and cells
/// through that dialect.
pub struct Session<C: Connection> {
    conn: C,
    dialect: Arc<dyn Dialect>,
    config: SessionConfig,
}

impl<C: Connection> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.conn.url())
            .field("dialect", &self.dialect.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> Session<C> {
    /// Wrap `conn`, resolving its dialect through the global registry.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, SessionConfig::default())
    }

    pub fn with_config(conn: C, config: SessionConfig) -> Self {
        Self::with_registry(conn, DialectRegistry::global(), config)
    }

    /// Wrap `conn`, resolving its dialect through `registry`.
    pub fn with_registry(conn: C, registry: &DialectRegistry, config: SessionConfig) -> Self {
        let dialect = registry.resolve(conn.url());
        Self::with_dialect(conn, dialect, config)
    }

    /// Wrap `conn` with an explicit dialect.
    pub fn with_dialect(conn: C, dialect: Arc<dyn Dialect>, config: SessionConfig) -> Self {
        tracing::debug!(url = %conn.url(), dialect = dialect.name(), "Opened session");
        Self {
            conn,
            dialect,
            config,
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn into_connection(self) -> C {
        self.conn
    }

    /// Prepare `sql` as a converting statement.
    pub fn prepare(&self, sql: &str) -> Result<ConvertingStatement<C::Statement<'_>>> {
        tracing::trace!(sql = %sql, "Preparing statement");
        let stmt = self.conn.prepare(sql).map_err(|e| e.with_sql(sql))?;
        Ok(ConvertingStatement::new(stmt, Arc::clone(&self.dialect)))
    }

    /// Run a query and materialize every row.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.query_map(sql, params, GenericRowMapper::new())
    }

    /// Run a query and map every row through `mapper`.
    pub fn query_map<M: RowMapper>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: M,
    ) -> Result<Vec<M::Output>> {
        self.run_query(sql, params, mapper, usize::MAX)
    }

    /// Run a query and return its first row, if any.
    pub fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut rows = self.run_query(sql, params, GenericRowMapper::new(), 1)?;
        Ok(rows.pop())
    }

    /// Bind, query, map at most `limit` rows, then release the cursor and
    /// the statement.
    fn run_query<M: RowMapper>(
        &self,
        sql: &str,
        params: &[Value],
        mapper: M,
        limit: usize,
    ) -> Result<Vec<M::Output>> {
        let mut stmt = self.prepare(sql)?;
        let outcome = stmt.bind_all(params).and_then(|()| {
            let mut cursor = stmt.query()?;
            let mapped = cursor
                .map_rows(mapper)
                .and_then(|rows| rows.take(limit).collect::<Result<Vec<_>>>());
            release_after(mapped, cursor.close())
        });
        release_after(outcome, stmt.close())
    }

    /// Execute one statement with positional parameters.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut stmt = self.prepare(sql)?;
        let outcome = stmt.bind_all(params).and_then(|()| stmt.execute());
        release_after(outcome, stmt.close())
    }

    /// Open a prepared-statement batch over `sql`.
    pub fn prepared_batch(&self, sql: &str) -> Result<PreparedBatch<C::Statement<'_>>> {
        PreparedBatch::new(self.prepare(sql)?, &self.config.batch)
    }

    /// Open a batch of unparameterized statements.
    pub fn statement_batch(&self) -> Result<StatementBatch<C::RawBatch<'_>>> {
        StatementBatch::new(self.conn.raw_batch()?, &self.config.batch)
    }

    /// Start building an INSERT batch into `table`.
    pub fn insert_batch<'f, T, I, S>(
        &self,
        table: impl Into<Identifier>,
        columns: I,
    ) -> BatchBuilder<'_, 'f, C, T>
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
    {
        BatchBuilder::new(&self.conn, Arc::clone(&self.dialect))
            .config(self.config.batch)
            .table(table)
            .columns(columns)
    }

    /// Insert rows produced by `body` into `table`, then always close the
    /// batch. Rows pending when `body` fails are still flushed.
    pub fn batch_scope<'s, 'f, T, I, S, M, F, R>(
        &'s self,
        table: impl Into<Identifier>,
        columns: I,
        mapper: M,
        body: F,
    ) -> Result<(R, BatchStats)>
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
        M: FnMut(&T) -> Vec<Value> + 'f,
        F: FnOnce(&mut RowBatch<'f, C::Statement<'s>, T>) -> Result<R>,
    {
        self.insert_batch(table, columns)
            .mapper(mapper)
            .build()?
            .scope(body)
    }

    /// Begin a transaction. It rolls back unless committed.
    pub fn transaction(&self) -> Result<Transaction<'_, C>> {
        Transaction::begin(self)
    }

    /// Run `body` in a transaction: commit on success, roll back on error.
    pub fn in_transaction<F, R>(&self, body: F) -> Result<R>
    where
        F: FnOnce(&Transaction<'_, C>) -> Result<R>,
    {
        let mut tx = self.transaction()?;
        match body(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::error!(error = %rollback, "Rollback after failed body failed");
                }
                Err(e)
            }
        }
    }

    /// Close the underlying connection.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|e| Error::resource_release(ResourceKind::Connection, e, None))
    }
}

/// Combine an operation's outcome with the release that followed it. A
/// release failure wins and keeps the operation's error as suppressed.
fn release_after<T>(outcome: Result<T>, released: Result<()>) -> Result<T> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release)) => Err(release),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release)) => Err(release.with_suppressed(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::{MockConnection, MockFailures};

    #[test]
    fn test_dialect_resolved_from_url() {
        let session = Session::new(MockConnection::new("jdbc:postgresql://db/app"));
        assert_eq!(session.dialect().name(), "postgresql");
        let session = Session::new(MockConnection::new("unknown://x"));
        assert_eq!(session.dialect().name(), "generic");
    }

    #[test]
    fn test_dialect_resolved_from_custom_registry() {
        let mut registry = DialectRegistry::new();
        registry.register(
            "mock:",
            Arc::new(|| Arc::new(sqlbridge_dialect::PostgresDialect) as Arc<dyn Dialect>),
        );
        let session = Session::with_registry(
            MockConnection::new("mock:inventory"),
            &registry,
            SessionConfig::new().max_batch_size(7),
        );
        assert_eq!(session.dialect().name(), "postgresql");
        assert_eq!(session.config().batch.max_batch_size, 7);

        let session = Session::with_registry(
            MockConnection::new("jdbc:mysql://db/app"),
            &registry,
            SessionConfig::default(),
        );
        assert_eq!(session.dialect().name(), "generic");
    }

    #[test]
    fn test_query_binds_and_closes() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let session = Session::new(conn);
        let rows = session
            .query("select ?, ?", &[Value::BigInt(4), Value::Text("x".into())])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<i64>(0).unwrap(), 4);
        assert_eq!(rows[0].get_by_label::<String>("P2").unwrap(), "x");
        assert_eq!(log.borrow().statements_closed, 1);
    }

    #[test]
    fn test_query_one() {
        let session = Session::new(MockConnection::new("mock:"));
        let row = session.query_one("select ?", &[Value::Int(1)]).unwrap();
        assert!(row.is_some());
    }

    #[test]
    fn test_statement_release_failure_surfaces() {
        let conn = MockConnection::new("mock:").with_failures(MockFailures {
            fail_close: true,
            ..MockFailures::default()
        });
        let session = Session::new(conn);
        let err = session.execute("delete from t", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceRelease(ref e) if e.resource == ResourceKind::Statement
        ));
    }

    #[test]
    fn test_session_batch_threshold() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let session = Session::with_config(conn, SessionConfig::new().max_batch_size(2));
        let mut batch = session.prepared_batch("insert into t values (?)").unwrap();
        for i in 0..5 {
            batch.add(&[Value::BigInt(i)]).unwrap();
        }
        assert_eq!(batch.close().unwrap().flushes, 3);
        assert_eq!(log.borrow().batches.len(), 3);
    }

    #[test]
    fn test_batch_scope_flushes_after_body_error() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let session = Session::new(conn);
        let err = session
            .batch_scope(
                "T",
                ["ID"],
                |id: &i64| vec![Value::BigInt(*id)],
                |batch| {
                    batch.add(&1)?;
                    batch.add(&2)?;
                    Err::<(), _>(Error::illegal_state("producer stopped"))
                },
            )
            .unwrap_err();
        assert!(err.is_illegal_state());
        assert_eq!(log.borrow().flushed_rows().len(), 2);
        assert_eq!(log.borrow().statements_closed, 1);
    }

    #[test]
    fn test_statement_batch_from_session() {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        let session = Session::new(conn);
        let mut batch = session.statement_batch().unwrap();
        batch.add("delete from a").unwrap();
        batch.close().unwrap();
        assert_eq!(log.borrow().raw_batches, vec![vec!["delete from a".to_string()]]);
    }

    #[test]
    fn test_config_serde() {
        let config = SessionConfig::new().max_batch_size(10);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"batch":{"max_batch_size":10}}"#);
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
