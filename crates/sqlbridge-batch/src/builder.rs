//! Builder for row-object INSERT batches.

use std::sync::Arc;

use sqlbridge_core::{Connection, Error, Identifier, Result, Value};
use sqlbridge_convert::ConvertingStatement;
use sqlbridge_dialect::Dialect;

use crate::config::BatchConfig;
use crate::insert::InsertSql;
use crate::rows::{RowBatch, RowBinder, RowMapFn, RowSetter};

/// Assembles a [`RowBatch`] over a connection.
///
/// A batch needs exactly one of [`setter`](Self::setter) or
/// [`mapper`](Self::mapper). The INSERT text is generated once from the
/// table and columns unless [`sql`](Self::sql) supplies it.
///
/// ```
/// use sqlbridge_batch::BatchBuilder;
/// use sqlbridge_core::Value;
/// use sqlbridge_core::mock::MockConnection;
///
/// let conn = MockConnection::new("sqlite::memory:");
/// let mut batch = BatchBuilder::for_connection(&conn)
///     .table("T")
///     .columns(["ID", "NAME"])
///     .max_batch_size(2)
///     .mapper(|row: &(i64, &'static str)| vec![Value::BigInt(row.0), Value::Text(row.1.into())])
///     .build()
///     .unwrap();
/// batch.add_all(&[(1, "a"), (2, "b"), (3, "c")]).unwrap();
/// assert_eq!(batch.close().unwrap().flushes, 2);
/// ```
pub struct BatchBuilder<'c, 'f, C: Connection + 'c, T> {
    conn: &'c C,
    dialect: Arc<dyn Dialect>,
    table: Option<Identifier>,
    columns: Vec<Identifier>,
    sql: Option<String>,
    config: BatchConfig,
    setter: Option<RowSetter<'f, C::Statement<'c>, T>>,
    mapper: Option<RowMapFn<'f, T>>,
}

impl<'c, 'f, C: Connection + 'c, T> BatchBuilder<'c, 'f, C, T> {
    pub fn new(conn: &'c C, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            conn,
            dialect,
            table: None,
            columns: Vec::new(),
            sql: None,
            config: BatchConfig::default(),
            setter: None,
            mapper: None,
        }
    }

    /// Builder whose dialect is resolved from the connection URL.
    pub fn for_connection(conn: &'c C) -> Self {
        let dialect = sqlbridge_dialect::resolve(conn.url());
        Self::new(conn, dialect)
    }

    pub fn table(mut self, table: impl Into<Identifier>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<Identifier>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Use `sql` verbatim instead of generating an INSERT.
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.config.max_batch_size = size;
        self
    }

    pub fn config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind each row with a full parameter-setter callback.
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: FnMut(&mut ConvertingStatement<C::Statement<'c>>, &T) -> Result<()> + 'f,
    {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Bind each row positionally from the values `mapper` returns.
    pub fn mapper<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&T) -> Vec<Value> + 'f,
    {
        self.mapper = Some(Box::new(mapper));
        self
    }

    fn insert_sql(&self) -> Result<String> {
        if let Some(sql) = &self.sql {
            return Ok(sql.clone());
        }
        let Some(table) = &self.table else {
            return Err(Error::config("batch requires a table or explicit SQL"));
        };
        InsertSql::new(table.clone())
            .columns(self.columns.iter().cloned())
            .build_with(self.dialect.as_ref())
    }

    /// Validate, prepare the statement, and return the open batch.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build(self) -> Result<RowBatch<'f, C::Statement<'c>, T>> {
        self.config.validate()?;
        let sql = self.insert_sql()?;
        let binder = match (self.setter, self.mapper) {
            (Some(setter), None) => RowBinder::Setter(setter),
            (None, Some(mapper)) => RowBinder::Mapper(mapper),
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "batch takes either a setter or a mapper, not both",
                ));
            }
            (None, None) => {
                return Err(Error::config("batch requires a setter or a mapper"));
            }
        };
        tracing::trace!(
            sql = %sql,
            dialect = self.dialect.name(),
            max_batch_size = self.config.max_batch_size,
            "Preparing batch statement"
        );
        let stmt = self.conn.prepare(&sql).map_err(|e| e.with_sql(&sql))?;
        RowBatch::new(
            ConvertingStatement::new(stmt, self.dialect),
            binder,
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::{MockConnection, MockStatement};

    #[derive(Debug)]
    struct Item {
        id: i64,
        label: String,
    }

    fn items() -> Vec<Item> {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, label)| Item {
                id: i as i64 + 1,
                label: (*label).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_build_prepares_generated_insert() {
        let conn = MockConnection::new("sqlite::memory:");
        let log = conn.log();
        let mut batch = BatchBuilder::for_connection(&conn)
            .table("T")
            .columns(["ID", "NAME"])
            .max_batch_size(2)
            .mapper(|item: &Item| vec![Value::BigInt(item.id), Value::Text(item.label.clone())])
            .build()
            .unwrap();
        assert_eq!(batch.sql(), "insert into \"T\" (\"ID\",\"NAME\") values (?,?)");
        batch.add_all(&items()).unwrap();
        let stats = batch.close().unwrap();
        assert_eq!(stats.flushes, 2);
        assert_eq!(stats.total_rows, 3);
        let log = log.borrow();
        assert_eq!(log.prepared, vec!["insert into \"T\" (\"ID\",\"NAME\") values (?,?)"]);
        assert_eq!(log.batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(log.statements_closed, 1);
    }

    #[test]
    fn test_setter_callback() {
        let conn = MockConnection::new("h2:mem");
        let log = conn.log();
        let mut batch = BatchBuilder::for_connection(&conn)
            .table("T")
            .column("ID")
            .setter(|stmt: &mut ConvertingStatement<MockStatement>, item: &Item| {
                stmt.bind(1, &Value::BigInt(item.id))
            })
            .build()
            .unwrap();
        batch.add(&items()[2]).unwrap();
        batch.close().unwrap();
        assert_eq!(log.borrow().flushed_rows(), vec![vec![Value::BigInt(3)]]);
    }

    #[test]
    fn test_explicit_sql_used_verbatim() {
        let conn = MockConnection::new("mock:");
        let batch = BatchBuilder::for_connection(&conn)
            .sql("insert into t(a) values (?)")
            .mapper(|item: &Item| vec![Value::BigInt(item.id)])
            .build()
            .unwrap();
        assert_eq!(batch.sql(), "insert into t(a) values (?)");
        batch.close().unwrap();
    }

    #[test]
    fn test_setter_and_mapper_are_exclusive() {
        let conn = MockConnection::new("mock:");
        let both = BatchBuilder::for_connection(&conn)
            .table("T")
            .column("ID")
            .setter(|_: &mut ConvertingStatement<MockStatement>, _: &Item| Ok(()))
            .mapper(|item: &Item| vec![Value::BigInt(item.id)])
            .build();
        assert!(matches!(both, Err(Error::Config(_))));

        let neither = BatchBuilder::<_, Item>::for_connection(&conn)
            .table("T")
            .column("ID")
            .build();
        assert!(matches!(neither, Err(Error::Config(_))));
        assert!(conn.log().borrow().prepared.is_empty());
    }

    #[test]
    fn test_invalid_configuration_rejected_before_prepare() {
        let conn = MockConnection::new("mock:");
        let zero = BatchBuilder::for_connection(&conn)
            .table("T")
            .column("ID")
            .max_batch_size(0)
            .mapper(|item: &Item| vec![Value::BigInt(item.id)])
            .build();
        assert!(matches!(zero, Err(Error::Config(_))));

        let no_table = BatchBuilder::for_connection(&conn)
            .mapper(|item: &Item| vec![Value::BigInt(item.id)])
            .build();
        assert!(matches!(no_table, Err(Error::Config(_))));
        assert!(conn.log().borrow().prepared.is_empty());
    }
}
