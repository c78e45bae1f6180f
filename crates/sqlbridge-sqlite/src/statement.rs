//! Prepared statements, cursors and raw batches over rusqlite.

use std::collections::BTreeMap;

use rusqlite::Rows;
use rusqlite::types::Value as SqlValue;
use sqlbridge_core::{
    ColumnMeta, Cursor, DriverOperation, Error, ParameterSink, RawBatch, Result, Statement, Value,
};

use crate::types::{Cell, column_meta, to_sql_value};

fn driver(operation: DriverOperation, source: rusqlite::Error) -> Error {
    Error::driver_source(operation, source)
}

/// A prepared SQLite statement.
///
/// Parameters are buffered and bound to the native statement when it runs,
/// so each pending batch entry keeps its own parameter set.
pub struct SqliteStatement<'c> {
    stmt: Option<rusqlite::Statement<'c>>,
    sql: String,
    params: BTreeMap<usize, Value>,
    pending: Vec<BTreeMap<usize, Value>>,
}

impl<'c> SqliteStatement<'c> {
    pub(crate) fn new(stmt: rusqlite::Statement<'c>, sql: &str) -> Self {
        Self {
            stmt: Some(stmt),
            sql: sql.to_string(),
            params: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    /// Parameter sets appended and not yet executed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn native(&mut self) -> Result<&mut rusqlite::Statement<'c>> {
        let sql = &self.sql;
        self.stmt.as_mut().ok_or_else(|| {
            Error::driver(DriverOperation::Execute, "statement is closed").with_sql(sql)
        })
    }

    /// Bind every declared parameter; unset ones bind NULL.
    fn bind_native(
        stmt: &mut rusqlite::Statement<'c>,
        params: &BTreeMap<usize, Value>,
    ) -> Result<()> {
        let count = stmt.parameter_count();
        if let Some(&index) = params.keys().find(|&&i| i > count) {
            return Err(Error::driver(
                DriverOperation::Bind,
                format!("parameter index {} out of range (1..={})", index, count),
            ));
        }
        for index in 1..=count {
            let native = match params.get(&index) {
                Some(value) => to_sql_value(value)?,
                None => SqlValue::Null,
            };
            stmt.raw_bind_parameter(index, native)
                .map_err(|e| driver(DriverOperation::Bind, e))?;
        }
        Ok(())
    }

    fn run(&mut self, params: &BTreeMap<usize, Value>) -> Result<u64> {
        let stmt = self.native()?;
        Self::bind_native(stmt, params)?;
        let changed = stmt
            .raw_execute()
            .map_err(|e| driver(DriverOperation::Execute, e))?;
        Ok(changed as u64)
    }
}

impl ParameterSink for SqliteStatement<'_> {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        if index == 0 {
            return Err(
                Error::driver(DriverOperation::Bind, "parameter index is one-based")
                    .with_sql(&self.sql),
            );
        }
        self.params.insert(index, value);
        Ok(())
    }
}

impl<'c> Statement for SqliteStatement<'c> {
    type Cursor<'a>
        = SqliteCursor<'a>
    where
        Self: 'a;

    fn sql(&self) -> &str {
        &self.sql
    }

    fn parameter_count(&self) -> usize {
        self.stmt.as_ref().map_or(0, |s| s.parameter_count())
    }

    fn clear_parameters(&mut self) -> Result<()> {
        self.params.clear();
        Ok(())
    }

    fn add_batch(&mut self) -> Result<()> {
        self.native()?;
        self.pending.push(self.params.clone());
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let pending = std::mem::take(&mut self.pending);
        let mut counts = Vec::with_capacity(pending.len());
        for params in &pending {
            let count = self
                .run(params)
                .map_err(|e| e.with_sql(&self.sql))?;
            counts.push(count);
        }
        tracing::trace!(sql = %self.sql, rows = counts.len(), "Executed sqlite batch");
        Ok(counts)
    }

    fn execute(&mut self) -> Result<u64> {
        let params = self.params.clone();
        self.run(&params).map_err(|e| e.with_sql(&self.sql))
    }

    fn query(&mut self) -> Result<SqliteCursor<'_>> {
        let sql = self.sql.clone();
        let params = &self.params;
        let Some(stmt) = self.stmt.as_mut() else {
            return Err(Error::driver(DriverOperation::Query, "statement is closed").with_sql(sql));
        };
        Self::bind_native(stmt, params).map_err(|e| e.with_sql(&sql))?;
        let columns = stmt
            .columns()
            .iter()
            .map(|c| column_meta(c.name(), c.decl_type()))
            .collect();
        Ok(SqliteCursor {
            rows: Some(stmt.raw_query()),
            columns,
            current: None,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.pending.clear();
        match self.stmt.take() {
            Some(stmt) => stmt
                .finalize()
                .map_err(|e| driver(DriverOperation::Close, e).with_sql(&self.sql)),
            None => Ok(()),
        }
    }
}

/// A forward-only cursor over a running query.
///
/// Each advance copies the whole row, so reads never touch the native
/// statement. Text is decoded when a column is read.
pub struct SqliteCursor<'s> {
    rows: Option<Rows<'s>>,
    columns: Vec<ColumnMeta>,
    current: Option<Vec<Cell>>,
}

impl SqliteCursor<'_> {
    fn cell(&self, index: usize) -> Result<&Cell> {
        let Some(row) = &self.current else {
            return Err(Error::driver(DriverOperation::Read, "cursor is not on a row"));
        };
        row.get(index).ok_or_else(|| {
            Error::driver(
                DriverOperation::Read,
                format!("column index {} out of range (0..{})", index, row.len()),
            )
        })
    }
}

impl Cursor for SqliteCursor<'_> {
    fn columns(&self) -> Result<Vec<ColumnMeta>> {
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> Result<bool> {
        let Some(rows) = self.rows.as_mut() else {
            return Err(Error::driver(DriverOperation::Fetch, "cursor is closed"));
        };
        let width = self.columns.len();
        match rows.next().map_err(|e| driver(DriverOperation::Fetch, e))? {
            Some(row) => {
                let cells = (0..width)
                    .map(|i| {
                        row.get_ref(i)
                            .map(Cell::from)
                            .map_err(|e| driver(DriverOperation::Fetch, e))
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.current = Some(cells);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.cell(index)?.is_null())
    }

    fn read(&self, index: usize) -> Result<Value> {
        self.cell(index)?.decode()
    }

    fn close(&mut self) -> Result<()> {
        self.rows = None;
        self.current = None;
        Ok(())
    }
}

/// Unparameterized statements executed one after another on flush.
pub struct SqliteRawBatch<'c> {
    conn: &'c rusqlite::Connection,
    pending: Vec<String>,
    closed: bool,
}

impl<'c> SqliteRawBatch<'c> {
    pub(crate) fn new(conn: &'c rusqlite::Connection) -> Self {
        Self {
            conn,
            pending: Vec::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::driver(DriverOperation::AddBatch, "batch is closed"));
        }
        Ok(())
    }
}

impl RawBatch for SqliteRawBatch<'_> {
    fn add_sql(&mut self, sql: &str) -> Result<()> {
        self.ensure_open()?;
        self.pending.push(sql.to_string());
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>> {
        self.ensure_open()?;
        let pending = std::mem::take(&mut self.pending);
        pending
            .iter()
            .map(|sql| {
                self.conn
                    .execute(sql, [])
                    .map(|n| n as u64)
                    .map_err(|e| driver(DriverOperation::ExecuteBatch, e).with_sql(sql))
            })
            .collect()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }
}
