//! Database dialects for sqlbridge.
//!
//! A [`Dialect`] turns column metadata into [`Extractor`]s and parameter
//! kinds into [`Setter`]s. The [`DialectRegistry`] picks one dialect per
//! connection from its URL:
//!
//! | Dialect | URL prefixes |
//! |---------|--------------|
//! | [`PostgresDialect`] | `postgresql:`, `postgres:`, `jdbc:postgresql:` |
//! | [`OracleDialect`] | `oracle:`, `jdbc:oracle:` |
//! | [`MySqlDialect`] | `mysql:`, `mariadb:`, `jdbc:mysql:`, `jdbc:mariadb:` |
//! | [`SqliteDialect`] | `sqlite:`, `jdbc:sqlite:` |
//! | [`H2Dialect`] | `h2:`, `jdbc:h2:` |
//!
//! Anything else gets [`GenericDialect`], which reads and binds untyped.
//!
//! ```
//! use sqlbridge_dialect::resolve;
//!
//! assert_eq!(resolve("postgresql://localhost/app").name(), "postgresql");
//! assert_eq!(resolve("db2://localhost/app").name(), "generic");
//! ```

pub mod codec;
pub mod dialect;
pub mod h2;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod registry;
pub mod sqlite;

pub use dialect::{Dialect, Extractor, GenericDialect, Setter, untyped_extractor, untyped_setter};
pub use h2::H2Dialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use registry::{DialectFactory, DialectRegistry, UrlPredicate, resolve};
pub use sqlite::SqliteDialect;
