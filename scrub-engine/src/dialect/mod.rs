//! Backend-specific statement generation for schema operations.
//!
//! A [`SqlDialect`] translates the engine's abstract schema/DML operations
//! (create the violation/repair/audit tables, delete-all, drop) into
//! backend-specific statement text. Dialects are resolved through an
//! open/closed registry keyed by [`DialectKind`]: new backends are added by
//! registering an implementation, never by modifying call sites.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::backend::DialectKind;
use crate::error::{Result, ScrubError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Backend-specific statement-generation strategy for schema operations.
///
/// Every method returns statement text for one abstract operation. Table
/// names are validated and escaped before interpolation; implementations
/// receive the caller-supplied name and are responsible for that step (the
/// provided implementations route through
/// [`SqlSecurity`](crate::security::SqlSecurity)).
pub trait SqlDialect: Send + Sync {
    /// DDL creating the violation table.
    fn create_violation_table(&self, table: &str) -> Result<String>;

    /// DDL creating the repair table.
    fn create_repair_table(&self, table: &str) -> Result<String>;

    /// DDL creating the audit table. The audit schema is backend-specific
    /// and opaque to the engine beyond existence.
    fn create_audit_table(&self, table: &str) -> Result<String>;

    /// DML removing every row of a table, leaving its schema intact.
    fn delete_all(&self, table: &str) -> Result<String>;

    /// DDL dropping a table.
    fn drop_table(&self, table: &str) -> Result<String>;
}

static DIALECTS: Lazy<RwLock<HashMap<DialectKind, Arc<dyn SqlDialect>>>> = Lazy::new(|| {
    let mut dialects: HashMap<DialectKind, Arc<dyn SqlDialect>> = HashMap::new();
    dialects.insert(DialectKind::Sqlite, Arc::new(SqliteDialect));
    dialects.insert(DialectKind::Postgres, Arc::new(PostgresDialect));
    dialects.insert(DialectKind::MySql, Arc::new(MySqlDialect));
    RwLock::new(dialects)
});

/// Registers a dialect for a backend family, replacing any existing one.
pub fn register_dialect(kind: DialectKind, dialect: Arc<dyn SqlDialect>) {
    let mut dialects = DIALECTS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    dialects.insert(kind, dialect);
}

/// Resolves the dialect for a backend family.
///
/// Fails with a configuration error for unregistered families.
pub fn dialect_for(kind: DialectKind) -> Result<Arc<dyn SqlDialect>> {
    let dialects = DIALECTS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    dialects.get(&kind).cloned().ok_or_else(|| {
        ScrubError::Configuration(format!("No dialect registered for backend '{kind}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dialects_are_registered() {
        for kind in [DialectKind::Sqlite, DialectKind::Postgres, DialectKind::MySql] {
            assert!(dialect_for(kind).is_ok(), "missing dialect for {kind}");
        }
    }

    #[test]
    fn test_all_dialects_reject_malicious_table_names() {
        for kind in [DialectKind::Sqlite, DialectKind::Postgres, DialectKind::MySql] {
            let dialect = dialect_for(kind).unwrap();
            assert!(dialect.create_violation_table("v; DROP TABLE x--").is_err());
            assert!(dialect.delete_all("v; DROP TABLE x--").is_err());
            assert!(dialect.drop_table("v; DROP TABLE x--").is_err());
        }
    }

    #[test]
    fn test_delete_all_keeps_schema() {
        let dialect = dialect_for(DialectKind::Sqlite).unwrap();
        let sql = dialect.delete_all("violation").unwrap();
        assert!(sql.starts_with("DELETE FROM"));
        assert!(!sql.contains("DROP"));
    }
}
