//! Backend connection abstraction.
//!
//! The engine depends on a connection/statement abstraction capable of
//! acquiring a connection with a chosen commit mode, executing parameterized
//! statements, committing batches, and querying catalog metadata for table
//! existence. It does not depend on any specific backend product beyond the
//! statement text generated by the [dialect layer](crate::dialect).
//!
//! Backends are resolved through an open/closed registry keyed by
//! [`DialectKind`]: new backends are added by registering a [`Connector`],
//! never by modifying call sites. SQLite (via `rusqlite`) is built in.
//!
//! Connections are never shared across threads: each operator or installer
//! call acquires, uses, and releases its own connection within the call's
//! dynamic scope. Calls block until the backend answers; cancellation and
//! timeouts are a caller-level concern.

mod sqlite;

pub use sqlite::SqliteConnector;

use crate::error::{Result, ScrubError};
use crate::model::Value;
use crate::security::SecureString;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Backend family tag used to select a dialect and a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// SQLite (built-in, file or in-memory).
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    MySql,
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectKind::Sqlite => write!(f, "sqlite"),
            DialectKind::Postgres => write!(f, "postgres"),
            DialectKind::MySql => write!(f, "mysql"),
        }
    }
}

impl FromStr for DialectKind {
    type Err = ScrubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DialectKind::Sqlite),
            "postgres" | "postgresql" => Ok(DialectKind::Postgres),
            "mysql" => Ok(DialectKind::MySql),
            other => Err(ScrubError::Configuration(format!(
                "Unsupported backend dialect: '{other}'"
            ))),
        }
    }
}

/// Immutable connection descriptor shared by read and write paths.
///
/// For SQLite the url is a file path (or `:memory:`); for server backends it
/// is the server URL. The password is held in a zeroizing wrapper and masked
/// in debug output.
#[derive(Debug, Clone)]
pub struct DbConfig {
    dialect: DialectKind,
    url: String,
    username: Option<String>,
    password: Option<SecureString>,
}

impl DbConfig {
    /// Creates a connection descriptor without credentials.
    pub fn new(dialect: DialectKind, url: impl Into<String>) -> Self {
        Self {
            dialect,
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Attaches credentials, builder-style.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// The backend family tag.
    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    /// The connection url (file path for SQLite).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The user name, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The password, if any.
    pub fn password(&self) -> Option<&SecureString> {
        self.password.as_ref()
    }
}

/// Commit discipline for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Every statement is committed as it executes.
    Auto,
    /// Work accumulates in a transaction until [`Connection::commit`] is
    /// called; dropping the connection rolls back uncommitted work.
    Manual,
}

/// A lightweight result row: shared column-name list plus values.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row over a shared column list.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// The column names, in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the value of a named column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Returns the value at a positional index, if present.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// An open backend connection.
///
/// Execution is synchronous: calls block only on backend I/O. Implementations
/// should cache prepared statements so repeated parameterized executions of
/// the same text (the batching writers) do not re-plan.
pub trait Connection: Send + std::fmt::Debug {
    /// The backend family this connection talks to.
    fn dialect(&self) -> DialectKind;

    /// Executes a statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Runs a query, materializing all result rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Commits accumulated work. A no-op in [`CommitMode::Auto`].
    fn commit(&mut self) -> Result<()>;

    /// Rolls back uncommitted work. A no-op in [`CommitMode::Auto`].
    fn rollback(&mut self) -> Result<()>;

    /// Catalog lookup: does the named table exist?
    fn table_exists(&mut self, table: &str) -> Result<bool>;
}

/// Opens connections for one backend family.
pub trait Connector: Send + Sync {
    /// Opens a connection to the configured backend.
    fn connect(&self, config: &DbConfig, mode: CommitMode) -> Result<Box<dyn Connection>>;
}

static CONNECTORS: Lazy<RwLock<HashMap<DialectKind, Arc<dyn Connector>>>> = Lazy::new(|| {
    let mut connectors: HashMap<DialectKind, Arc<dyn Connector>> = HashMap::new();
    connectors.insert(DialectKind::Sqlite, Arc::new(SqliteConnector));
    RwLock::new(connectors)
});

/// Registers a connector for a backend family, replacing any existing one.
///
/// This is how host processes plug in server backends (PostgreSQL, MySQL)
/// without the engine depending on their drivers.
pub fn register_connector(kind: DialectKind, connector: Arc<dyn Connector>) {
    let mut connectors = CONNECTORS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    connectors.insert(kind, connector);
}

/// Opens a connection described by `config` through the connector registry.
///
/// Fails with a configuration error when no connector is registered for the
/// config's dialect.
pub fn connect(config: &DbConfig, mode: CommitMode) -> Result<Box<dyn Connection>> {
    let connector = {
        let connectors = CONNECTORS
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        connectors.get(&config.dialect()).cloned()
    };

    match connector {
        Some(connector) => connector.connect(config, mode),
        None => Err(ScrubError::Configuration(format!(
            "No connector registered for dialect '{}'",
            config.dialect()
        ))),
    }
}
