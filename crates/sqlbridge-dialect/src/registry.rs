//! URL-driven dialect selection.
//!
//! Dialects are registered explicitly as `(url predicate, factory)` pairs.
//! Resolution walks the registrations in order and returns the first match,
//! falling back to [`GenericDialect`]. Resolution never fails.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::dialect::{Dialect, GenericDialect, starts_with_ignore_case};
use crate::h2::H2Dialect;
use crate::mysql::MySqlDialect;
use crate::oracle::OracleDialect;
use crate::postgres::PostgresDialect;
use crate::sqlite::SqliteDialect;

/// Produces the dialect instance for a matched URL.
pub type DialectFactory = Arc<dyn Fn() -> Arc<dyn Dialect> + Send + Sync>;

/// Decides whether a registration claims a connection URL.
pub type UrlPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
struct Registration {
    label: String,
    matches: UrlPredicate,
    factory: DialectFactory,
}

/// An ordered list of dialect registrations.
#[derive(Clone, Default)]
pub struct DialectRegistry {
    entries: Vec<Registration>,
}

impl DialectRegistry {
    /// An empty registry; every URL resolves to the generic dialect.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in dialects.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register_dialect(PostgresDialect)
            .register_dialect(OracleDialect)
            .register_dialect(MySqlDialect)
            .register_dialect(SqliteDialect)
            .register_dialect(H2Dialect);
        registry
    }

    /// The process-wide registry of built-in dialects.
    pub fn global() -> &'static DialectRegistry {
        static GLOBAL: OnceLock<DialectRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DialectRegistry::builtin)
    }

    /// Register `dialect` under each of its declared URL prefixes.
    pub fn register_dialect<D: Dialect + 'static>(&mut self, dialect: D) -> &mut Self {
        let shared: Arc<dyn Dialect> = Arc::new(dialect);
        for prefix in shared.url_prefixes() {
            let instance = Arc::clone(&shared);
            self.register(*prefix, Arc::new(move || Arc::clone(&instance)));
        }
        self
    }

    /// Register `factory` for URLs starting with `prefix` (ASCII case-insensitive).
    pub fn register(&mut self, prefix: impl Into<String>, factory: DialectFactory) -> &mut Self {
        let prefix = prefix.into();
        let matched = prefix.clone();
        self.register_matcher(
            prefix,
            Arc::new(move |url: &str| starts_with_ignore_case(url, &matched)),
            factory,
        )
    }

    /// Register `factory` for URLs accepted by an arbitrary predicate.
    pub fn register_matcher(
        &mut self,
        label: impl Into<String>,
        matches: UrlPredicate,
        factory: DialectFactory,
    ) -> &mut Self {
        let label = label.into();
        tracing::trace!(label = %label, position = self.entries.len(), "Registering dialect");
        self.entries.push(Registration {
            label,
            matches,
            factory,
        });
        self
    }

    /// Labels of every registration, in resolution order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select the dialect for `url`: first matching registration wins,
    /// otherwise the generic dialect.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn resolve(&self, url: &str) -> Arc<dyn Dialect> {
        if let Some(entry) = self.entries.iter().find(|e| (e.matches)(url)) {
            let dialect = (entry.factory)();
            tracing::debug!(
                matched = %entry.label,
                dialect = dialect.name(),
                "Resolved dialect"
            );
            return dialect;
        }
        tracing::debug!(
            candidates = self.entries.len(),
            "No dialect matched connection URL; using generic dialect"
        );
        GenericDialect::shared()
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("entries", &self.labels().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolve `url` against the global built-in registry.
pub fn resolve(url: &str) -> Arc<dyn Dialect> {
    DialectRegistry::global().resolve(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::{MockCursor, MockStatement};
    use sqlbridge_core::{ColumnMeta, ColumnType, Cursor, Statement, TypeCode, Value};

    #[test]
    fn test_null_cells_skip_typed_reads_in_every_dialect() {
        let dialects: Vec<Arc<dyn Dialect>> = vec![
            Arc::new(GenericDialect),
            Arc::new(PostgresDialect),
            Arc::new(OracleDialect),
            Arc::new(MySqlDialect),
            Arc::new(SqliteDialect),
            Arc::new(H2Dialect),
        ];
        let mut column_types: Vec<ColumnType> = TypeCode::ALL
            .iter()
            .map(|code| ColumnType::new(*code, code.to_string()))
            .collect();
        column_types.extend(
            [
                "INTERVAL", "POINT", "JSON", "JSONB", "UUID", "NUMBER(1)", "TINYINT(1)",
                "BIT(1)", "BOOLEAN", "DATETIME", "TIMESTAMP WITH TIME ZONE", "LONGTEXT",
                "LONGBLOB", "CLOB", "NCLOB", "BLOB",
            ]
            .iter()
            .map(|declared| ColumnType::from_declared(declared)),
        );

        for dialect in &dialects {
            for column_type in &column_types {
                let mut cursor = MockCursor::new(
                    vec![ColumnMeta::new("C", column_type.clone())],
                    vec![vec![Value::Null]],
                );
                assert!(cursor.advance().unwrap());
                let read = dialect.extractor(column_type)(&cursor, 0).unwrap();
                let calls = cursor.calls();
                assert_eq!(
                    read,
                    Value::Null,
                    "{} / {}",
                    dialect.name(),
                    column_type.type_name
                );
                assert_eq!(
                    (
                        calls.typed_reads.get(),
                        calls.timestamp_reads.get(),
                        calls.lob_reads.get()
                    ),
                    (0, 0, 0),
                    "{} / {}",
                    dialect.name(),
                    column_type.type_name
                );
            }
        }
    }

    #[test]
    fn test_builtin_resolution() {
        let registry = DialectRegistry::builtin();
        assert_eq!(registry.resolve("postgresql://h/db").name(), "postgresql");
        assert_eq!(registry.resolve("JDBC:ORACLE:thin:@h:1521:x").name(), "oracle");
        assert_eq!(registry.resolve("mariadb://h/db").name(), "mysql");
        assert_eq!(registry.resolve("sqlite::memory:").name(), "sqlite");
        assert_eq!(registry.resolve("jdbc:h2:mem:x").name(), "h2");
    }

    #[test]
    fn test_unmatched_url_falls_back_to_generic() {
        assert_eq!(resolve("db2://host/x").name(), "generic");
        assert_eq!(resolve("").name(), "generic");
        assert_eq!(DialectRegistry::new().resolve("sqlite:x").name(), "generic");
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = DialectRegistry::new();
        registry
            .register("sqlite:", Arc::new(|| Arc::new(H2Dialect) as Arc<dyn Dialect>))
            .register_dialect(SqliteDialect);
        assert_eq!(registry.resolve("sqlite:file.db").name(), "h2");
        assert_eq!(registry.labels().next(), Some("sqlite:"));
    }

    #[test]
    fn test_custom_predicate() {
        let mut registry = DialectRegistry::new();
        registry.register_matcher(
            "contains-pg",
            Arc::new(|url: &str| url.contains("pg")),
            Arc::new(|| Arc::new(PostgresDialect) as Arc<dyn Dialect>),
        );
        assert_eq!(registry.resolve("custom+pg://h").name(), "postgresql");
    }

    #[test]
    fn test_generic_round_trip_is_identity() {
        let dialect = resolve("unknown://nowhere");
        let values = vec![
            Value::BigInt(42),
            Value::Text("hello".into()),
            Value::Double(1.25),
            Value::Bool(true),
            Value::Null,
        ];

        let mut stmt = MockStatement::standalone("select ?, ?, ?, ?, ?");
        for (i, value) in values.iter().enumerate() {
            dialect.setter(value.kind())(&mut stmt, i + 1, value).unwrap();
        }
        let mut cursor = stmt.query().unwrap();
        assert!(cursor.advance().unwrap());
        let columns = cursor.columns().unwrap();

        let read: Vec<Value> = columns
            .iter()
            .enumerate()
            .map(|(i, meta)| dialect.extractor(&meta.column_type)(&cursor, i).unwrap())
            .collect();
        assert_eq!(read, values);

        let any_column = ColumnType::from_declared("TIMESTAMP");
        assert_eq!(dialect.extractor(&any_column)(&cursor, 4).unwrap(), Value::Null);
    }
}
