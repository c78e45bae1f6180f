//! SQLite connection.

use rusqlite::OpenFlags;
use sqlbridge_core::{Connection, DriverOperation, Error, Result};

use crate::config::{SqliteConfig, SqliteTarget};
use crate::statement::{SqliteRawBatch, SqliteStatement};

/// A blocking connection to one SQLite database.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    config: SqliteConfig,
    url: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("url", &self.url)
            .field("read_only", &self.config.read_only)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a connection as described by `config`.
    #[tracing::instrument(level = "debug", skip(config), fields(url = %config.url()))]
    pub fn open(config: SqliteConfig) -> Result<Self> {
        let flags: OpenFlags = config.open_flags();
        let conn = match &config.target {
            SqliteTarget::Memory => rusqlite::Connection::open_in_memory_with_flags(flags),
            SqliteTarget::File(path) => rusqlite::Connection::open_with_flags(path, flags),
        }
        .map_err(|e| Error::driver_source(DriverOperation::Connect, e))?;
        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| Error::driver_source(DriverOperation::Connect, e))?;
        let url = config.url();
        tracing::debug!(url = %url, "Opened sqlite connection");
        Ok(Self { conn, config, url })
    }

    /// Open a connection from a `sqlite:` URL.
    pub fn open_url(url: &str) -> Result<Self> {
        Self::open(SqliteConfig::from_url(url)?)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn control(&self, sql: &str) -> Result<()> {
        tracing::trace!(sql = %sql, "Transaction control");
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::driver_source(DriverOperation::Transaction, e).with_sql(sql))
    }
}

impl Connection for SqliteConnection {
    type Statement<'c> = SqliteStatement<'c>;
    type RawBatch<'c> = SqliteRawBatch<'c>;

    fn url(&self) -> &str {
        &self.url
    }

    fn prepare(&self, sql: &str) -> Result<SqliteStatement<'_>> {
        tracing::trace!(sql = %sql, "Preparing statement");
        let stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| Error::driver_source(DriverOperation::Prepare, e).with_sql(sql))?;
        Ok(SqliteStatement::new(stmt, sql))
    }

    fn raw_batch(&self) -> Result<SqliteRawBatch<'_>> {
        Ok(SqliteRawBatch::new(&self.conn))
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        tracing::trace!(sql = %sql, "Executing statement");
        self.conn
            .execute(sql, [])
            .map(|n| n as u64)
            .map_err(|e| Error::driver_source(DriverOperation::Execute, e).with_sql(sql))
    }

    fn begin(&self) -> Result<()> {
        self.control("BEGIN")
    }

    fn commit(&self) -> Result<()> {
        self.control("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.control("ROLLBACK")
    }

    fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::driver_source(DriverOperation::Close, e))
    }
}
