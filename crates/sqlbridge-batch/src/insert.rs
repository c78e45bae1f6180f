//! INSERT statement generation.

use sqlbridge_core::{Error, Identifier, Result};
use sqlbridge_dialect::Dialect;

/// Builds `insert into <table> (<columns>) values (?,...)`.
///
/// Identifiers are quoted verbatim; no case folding is applied.
///
/// ```
/// use sqlbridge_batch::InsertSql;
///
/// let sql = InsertSql::new("T").columns(["A", "B"]).build().unwrap();
/// assert_eq!(sql, r#"insert into "T" ("A","B") values (?,?)"#);
/// ```
#[derive(Debug, Clone)]
pub struct InsertSql {
    table: Identifier,
    columns: Vec<Identifier>,
}

impl InsertSql {
    pub fn new(table: impl Into<Identifier>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: impl Into<Identifier>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Identifier>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Render with standard double-quote quoting.
    pub fn build(&self) -> Result<String> {
        self.render(Identifier::quoted)
    }

    /// Render with `dialect`'s identifier quoting.
    pub fn build_with(&self, dialect: &dyn Dialect) -> Result<String> {
        self.render(|ident| {
            ident
                .parts()
                .iter()
                .map(|part| dialect.quote_ident(part))
                .collect::<Vec<_>>()
                .join(".")
        })
    }

    fn render(&self, quote: impl Fn(&Identifier) -> String) -> Result<String> {
        if self.table.name().is_empty() {
            return Err(Error::config("insert requires a table name"));
        }
        if self.columns.is_empty() {
            return Err(Error::config(format!(
                "insert into {} requires at least one column",
                self.table
            )));
        }
        let columns = self.columns.iter().map(&quote).collect::<Vec<_>>().join(",");
        let placeholders = vec!["?"; self.columns.len()].join(",");
        Ok(format!(
            "insert into {} ({}) values ({})",
            quote(&self.table),
            columns,
            placeholders
        ))
    }
}
