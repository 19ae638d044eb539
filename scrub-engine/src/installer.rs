//! Idempotent installation of the engine's persisted tables.
//!
//! The engine persists its state in three tables on the execution backend:
//! violation, repair, and audit. [`install`] creates whichever of them are
//! missing, [`uninstall`] drops whichever exist, and [`clean_execution_db`]
//! truncates violation/repair between runs without touching the schema.
//! All three acquire exactly one connection per call and release it on every
//! exit path.

use crate::backend::{connect, CommitMode, Connection, DbConfig};
use crate::dialect::{dialect_for, SqlDialect};
use crate::error::{Result, ScrubError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Names of the engine's persisted tables on the execution backend.
///
/// Injected into the installer and the persistence-writing stages so hosts
/// can namespace engine state (e.g. per tenant) without global configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTables {
    /// Violation table name.
    pub violation: String,
    /// Repair table name.
    pub repair: String,
    /// Audit table name.
    pub audit: String,
}

impl Default for ExecutionTables {
    fn default() -> Self {
        Self {
            violation: "violation".to_string(),
            repair: "repair".to_string(),
            audit: "audit".to_string(),
        }
    }
}

impl ExecutionTables {
    /// Prefixes all three table names, for namespaced installations.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            violation: format!("{prefix}_violation"),
            repair: format!("{prefix}_repair"),
            audit: format!("{prefix}_audit"),
        }
    }
}

fn create_if_absent(
    conn: &mut dyn Connection,
    table: &str,
    create_sql: &str,
) -> Result<()> {
    if conn.table_exists(table)? {
        debug!(target.table = %table, "Table already installed, skipping");
        return Ok(());
    }
    conn.execute(create_sql, &[])
        .map_err(|e| ScrubError::schema(table, e.to_string()))?;
    info!(target.table = %table, "Installed table");
    Ok(())
}

/// Installs the violation, repair, and audit tables on the target backend.
///
/// Already-installed tables are silently skipped, so calling this twice is a
/// no-op the second time. Any statement failure aborts the whole call with a
/// schema error; a single commit happens at the end.
#[instrument(skip(config, tables), fields(backend.url = %config.url()))]
pub fn install(config: &DbConfig, tables: &ExecutionTables) -> Result<()> {
    let dialect = dialect_for(config.dialect())?;
    let mut conn = connect(config, CommitMode::Manual)?;

    create_if_absent(
        conn.as_mut(),
        &tables.violation,
        &dialect.create_violation_table(&tables.violation)?,
    )?;
    create_if_absent(
        conn.as_mut(),
        &tables.repair,
        &dialect.create_repair_table(&tables.repair)?,
    )?;
    create_if_absent(
        conn.as_mut(),
        &tables.audit,
        &dialect.create_audit_table(&tables.audit)?,
    )?;

    conn.commit()?;
    Ok(())
}

fn drop_if_present(
    conn: &mut dyn Connection,
    dialect: &Arc<dyn SqlDialect>,
    table: &str,
) -> Result<()> {
    if !conn.table_exists(table)? {
        debug!(target.table = %table, "Table not installed, nothing to drop");
        return Ok(());
    }
    conn.execute(&dialect.drop_table(table)?, &[])
        .map_err(|e| ScrubError::schema(table, e.to_string()))?;
    info!(target.table = %table, "Dropped table");
    Ok(())
}

/// Drops the violation, repair, and audit tables from the target backend.
///
/// Tables that do not exist are skipped, so uninstalling an empty backend is
/// a no-op.
#[instrument(skip(config, tables), fields(backend.url = %config.url()))]
pub fn uninstall(config: &DbConfig, tables: &ExecutionTables) -> Result<()> {
    let dialect = dialect_for(config.dialect())?;
    let mut conn = connect(config, CommitMode::Manual)?;

    drop_if_present(conn.as_mut(), &dialect, &tables.violation)?;
    drop_if_present(conn.as_mut(), &dialect, &tables.repair)?;
    drop_if_present(conn.as_mut(), &dialect, &tables.audit)?;

    conn.commit()?;
    Ok(())
}

/// Deletes all rows from the violation and repair tables, leaving the schema
/// intact; used to reset state between pipeline runs without reinstalling.
#[instrument(skip(config, tables), fields(backend.url = %config.url()))]
pub fn clean_execution_db(config: &DbConfig, tables: &ExecutionTables) -> Result<()> {
    let dialect = dialect_for(config.dialect())?;
    let mut conn = connect(config, CommitMode::Auto)?;

    for table in [&tables.violation, &tables.repair] {
        if conn.table_exists(table)? {
            let removed = conn
                .execute(&dialect.delete_all(table)?, &[])
                .map_err(|e| ScrubError::schema(table, e.to_string()))?;
            debug!(target.table = %table, rows.removed = removed, "Cleaned table");
        } else {
            debug!(target.table = %table, "Table not yet installed");
        }
    }
    Ok(())
}
