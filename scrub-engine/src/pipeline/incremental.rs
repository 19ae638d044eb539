//! Incremental maintenance of the persisted violation set.
//!
//! After fixes are applied, the violations tied to the repaired tuples are
//! stale: a later detection run would re-derive whatever still holds. This
//! stage deletes every violation touching a tuple referenced by an applied
//! fix's left cell, so detection runs stay incremental instead of
//! re-reporting already-fixed issues.

use super::{Operator, COMMIT_BATCH_SIZE};
use crate::backend::{connect, CommitMode, DbConfig};
use crate::error::{Result, ScrubError};
use crate::installer::ExecutionTables;
use crate::model::{Fix, Value};
use crate::security::SqlSecurity;
use tracing::{debug, error, instrument};

/// Deletes stale violations for a batch of applied fixes.
///
/// For each fix, the (table name, tuple id) pair is derived from the fix's
/// left cell and a batched delete removes every violation whose id matches
/// that pair, via a sub-select of distinct violation ids. Statements are
/// committed every [`COMMIT_BATCH_SIZE`] operations.
///
/// On a mid-batch failure the error is logged and then propagated; batches
/// committed before the failure stay committed, and the error message states
/// how many operations had been committed. The output is the affected tuple
/// id per input fix, index-aligned: `out[i]` is `fixes[i]`'s left-cell tuple
/// id.
pub struct IncrementalUpdater {
    config: DbConfig,
    tables: ExecutionTables,
}

impl IncrementalUpdater {
    /// Creates an updater targeting the given execution backend.
    pub fn new(config: DbConfig, tables: ExecutionTables) -> Self {
        Self { config, tables }
    }
}

impl Operator for IncrementalUpdater {
    type Input = Vec<Fix>;
    type Output = Vec<i64>;

    #[instrument(skip(self, fixes), fields(fixes.count = fixes.len()))]
    fn execute(&mut self, fixes: Vec<Fix>) -> Result<Vec<i64>> {
        if fixes.is_empty() {
            return Ok(Vec::new());
        }

        let table = SqlSecurity::escape_identifier(&self.tables.violation)?;
        let delete = format!(
            "DELETE FROM {table} WHERE vid IN \
             (SELECT DISTINCT vid FROM {table} WHERE tablename = ?1 AND tupleid = ?2)"
        );

        let mut conn = connect(&self.config, CommitMode::Manual)?;

        let mut affected = Vec::with_capacity(fixes.len());
        let mut pending = 0usize;
        let mut committed = 0usize;

        let abort = |committed: usize, e: ScrubError| {
            error!(
                error = %e,
                operations.committed = committed,
                "Incremental deletion failed"
            );
            ScrubError::backend(format!(
                "incremental update aborted after {committed} committed operations: {e}"
            ))
        };

        for fix in &fixes {
            let tid = fix.left().tid();
            let table_name = fix.left().table().to_string();

            conn.execute(&delete, &[Value::Text(table_name), Value::Int(tid)])
                .map_err(|e| abort(committed, e))?;
            affected.push(tid);

            pending += 1;
            if pending == COMMIT_BATCH_SIZE {
                conn.commit().map_err(|e| abort(committed, e))?;
                committed += pending;
                pending = 0;
            }
        }

        conn.commit().map_err(|e| abort(committed, e))?;
        committed += pending;

        debug!(
            operations.committed = committed,
            "Incremental deletion finished"
        );
        Ok(affected)
    }

    fn name(&self) -> &str {
        "incremental_updater"
    }
}
