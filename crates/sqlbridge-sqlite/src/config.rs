//! SQLite connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};
use sqlbridge_core::{Error, Result};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqliteTarget {
    /// A private in-memory database, discarded on close.
    Memory,
    /// A database file.
    File(PathBuf),
}

/// SQLite connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    pub target: SqliteTarget,
    /// How long a locked database is retried before failing (default: 5s).
    pub busy_timeout: Duration,
    /// Open without write access.
    pub read_only: bool,
    /// Create the file when it does not exist (default: true).
    pub create_if_missing: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            target: SqliteTarget::Memory,
            busy_timeout: Duration::from_secs(5),
            read_only: false,
            create_if_missing: true,
        }
    }
}

impl SqliteConfig {
    /// An in-memory database with default options.
    pub fn memory() -> Self {
        Self::default()
    }

    /// A file database with default options.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: SqliteTarget::File(path.into()),
            ..Self::default()
        }
    }

    /// Parse `sqlite:<path>`, `sqlite://<path>` or `sqlite::memory:`.
    /// A leading `jdbc:` is accepted.
    pub fn from_url(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let rest = strip_prefix_ignore_case(trimmed, "jdbc:").unwrap_or(trimmed);
        let Some(rest) = strip_prefix_ignore_case(rest, "sqlite:") else {
            return Err(Error::config(format!("not a sqlite URL: {}", url)));
        };
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        match rest {
            "" | ":memory:" | "memory:" => Ok(Self::memory()),
            path => Ok(Self::file(path)),
        }
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.target == SqliteTarget::Memory
    }

    /// The connection URL this configuration corresponds to.
    pub fn url(&self) -> String {
        match &self.target {
            SqliteTarget::Memory => "sqlite::memory:".to_string(),
            SqliteTarget::File(path) => format!("sqlite:{}", path.display()),
        }
    }

    pub(crate) fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
            if self.create_if_missing {
                flags |= OpenFlags::SQLITE_OPEN_CREATE;
            }
        }
        flags
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
