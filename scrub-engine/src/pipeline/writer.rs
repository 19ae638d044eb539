//! Persistence stages: write violations and fixes to the execution backend.

use super::{Operator, COMMIT_BATCH_SIZE};
use crate::backend::{connect, CommitMode, Connection, DbConfig};
use crate::error::Result;
use crate::installer::ExecutionTables;
use crate::model::{Cell, Fix, FixTarget, Value, Violation};
use crate::security::SqlSecurity;
use tracing::info;

fn text_or_null(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

fn next_id(conn: &mut dyn Connection, table: &str, column: &str) -> Result<i64> {
    let rows = conn.query(&format!("SELECT MAX({column}) AS max_id FROM {table}"), &[])?;
    let max = rows
        .first()
        .and_then(|row| row.get("max_id"))
        .and_then(|value| match value {
            Value::Int(v) => Some(*v),
            _ => None,
        })
        .unwrap_or(0);
    Ok(max + 1)
}

/// Persists detected violations, assigning violation ids.
///
/// Each violation flattens to one row per implicated cell. Ids continue from
/// the persisted maximum so concurrent runs against the same table never
/// reuse an id within one writer's batch. Inserts are batched and committed
/// every [`COMMIT_BATCH_SIZE`] rows.
pub struct ViolationWriter {
    config: DbConfig,
    tables: ExecutionTables,
}

impl ViolationWriter {
    /// Creates a writer targeting the given execution backend.
    pub fn new(config: DbConfig, tables: ExecutionTables) -> Self {
        Self { config, tables }
    }
}

impl Operator for ViolationWriter {
    type Input = Vec<Violation>;
    type Output = Vec<Violation>;

    fn execute(&mut self, mut violations: Vec<Violation>) -> Result<Vec<Violation>> {
        if violations.is_empty() {
            return Ok(violations);
        }

        let table = SqlSecurity::escape_identifier(&self.tables.violation)?;
        let mut conn = connect(&self.config, CommitMode::Manual)?;
        let mut vid = next_id(conn.as_mut(), &table, "vid")?;

        let insert = format!(
            "INSERT INTO {table} (vid, rid, tablename, tupleid, attribute, value) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );

        let mut pending = 0usize;
        let mut rows_written = 0usize;
        for violation in &mut violations {
            violation.assign_vid(vid);
            vid += 1;
            for cell in violation.cells() {
                conn.execute(
                    &insert,
                    &[
                        Value::Int(violation.vid()),
                        Value::Text(violation.rule_id().to_string()),
                        Value::Text(cell.table().to_string()),
                        Value::Int(cell.tid()),
                        Value::Text(cell.attribute().to_string()),
                        text_or_null(cell.value()),
                    ],
                )?;
                pending += 1;
                rows_written += 1;
                if pending == COMMIT_BATCH_SIZE {
                    conn.commit()?;
                    pending = 0;
                }
            }
        }
        conn.commit()?;

        info!(
            target.table = %self.tables.violation,
            violations.persisted = violations.len(),
            rows.written = rows_written,
            "Persisted violations"
        );
        Ok(violations)
    }

    fn name(&self) -> &str {
        "violation_writer"
    }
}

/// Persists candidate fixes to the repair table.
///
/// Follows the same id-assignment and batching discipline as
/// [`ViolationWriter`]. A literal repair target leaves the right-cell columns
/// null and stores only the value.
pub struct RepairWriter {
    config: DbConfig,
    tables: ExecutionTables,
}

impl RepairWriter {
    /// Creates a writer targeting the given execution backend.
    pub fn new(config: DbConfig, tables: ExecutionTables) -> Self {
        Self { config, tables }
    }

    fn right_columns(fix: &Fix) -> (Value, Value, Value, Value) {
        match fix.right() {
            FixTarget::Cell(cell) => (
                Value::Int(cell.tid()),
                Value::Text(cell.table().to_string()),
                Value::Text(cell.attribute().to_string()),
                text_or_null(cell.value()),
            ),
            FixTarget::Literal(value) => {
                (Value::Null, Value::Null, Value::Null, text_or_null(value))
            }
        }
    }
}

impl Operator for RepairWriter {
    type Input = Vec<Fix>;
    type Output = usize;

    fn execute(&mut self, fixes: Vec<Fix>) -> Result<usize> {
        if fixes.is_empty() {
            return Ok(0);
        }

        let table = SqlSecurity::escape_identifier(&self.tables.repair)?;
        let mut conn = connect(&self.config, CommitMode::Manual)?;
        let mut id = next_id(conn.as_mut(), &table, "id")?;

        let insert = format!(
            "INSERT INTO {table} (id, vid, c1_tupleid, c1_tablename, c1_attribute, \
             c1_value, op, c2_tupleid, c2_tablename, c2_attribute, c2_value) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );

        let mut pending = 0usize;
        for fix in &fixes {
            let left: &Cell = fix.left();
            let (c2_tid, c2_table, c2_attribute, c2_value) = Self::right_columns(fix);
            conn.execute(
                &insert,
                &[
                    Value::Int(id),
                    Value::Int(fix.vid()),
                    Value::Int(left.tid()),
                    Value::Text(left.table().to_string()),
                    Value::Text(left.attribute().to_string()),
                    text_or_null(left.value()),
                    Value::Int(fix.op().code()),
                    c2_tid,
                    c2_table,
                    c2_attribute,
                    c2_value,
                ],
            )?;
            id += 1;
            pending += 1;
            if pending == COMMIT_BATCH_SIZE {
                conn.commit()?;
                pending = 0;
            }
        }
        conn.commit()?;

        info!(
            target.table = %self.tables.repair,
            fixes.persisted = fixes.len(),
            "Persisted fixes"
        );
        Ok(fixes.len())
    }

    fn name(&self) -> &str {
        "repair_writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DialectKind;
    use crate::installer;
    use crate::model::{Column, FixOp};

    fn installed_config(dir: &tempfile::TempDir) -> (DbConfig, ExecutionTables) {
        let path = dir.path().join("exec.db");
        let config = DbConfig::new(DialectKind::Sqlite, path.to_string_lossy().to_string());
        let tables = ExecutionTables::default();
        installer::install(&config, &tables).unwrap();
        (config, tables)
    }

    fn manager_violation(rule: &str, tid_a: i64, tid_b: i64) -> Violation {
        Violation::new(
            rule,
            vec![
                Cell::new(Column::new("emp", "manager"), tid_a, Value::from("X")),
                Cell::new(Column::new("emp", "manager"), tid_b, Value::from("Y")),
            ],
        )
    }

    #[test]
    fn test_writer_assigns_sequential_vids_from_persisted_max() {
        let dir = tempfile::tempdir().unwrap();
        let (config, tables) = installed_config(&dir);

        let mut writer = ViolationWriter::new(config.clone(), tables.clone());
        let first = writer
            .execute(vec![manager_violation("r1", 1, 2)])
            .unwrap();
        assert_eq!(first[0].vid(), 1);

        let second = writer
            .execute(vec![
                manager_violation("r1", 3, 4),
                manager_violation("r1", 5, 6),
            ])
            .unwrap();
        assert_eq!(second[0].vid(), 2);
        assert_eq!(second[1].vid(), 3);

        let mut conn = connect(&config, CommitMode::Auto).unwrap();
        let rows = conn
            .query("SELECT vid, tupleid FROM violation ORDER BY vid, tupleid", &[])
            .unwrap();
        // Three violations, two cells each.
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (config, tables) = installed_config(&dir);

        let mut writer = ViolationWriter::new(config.clone(), tables);
        assert!(writer.execute(Vec::new()).unwrap().is_empty());

        let mut conn = connect(&config, CommitMode::Auto).unwrap();
        assert!(conn.query("SELECT vid FROM violation", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_repair_writer_persists_cell_and_literal_targets() {
        let dir = tempfile::tempdir().unwrap();
        let (config, tables) = installed_config(&dir);

        let left = Cell::new(Column::new("emp", "manager"), 2, Value::from("Y"));
        let right = Cell::new(Column::new("emp", "manager"), 1, Value::from("X"));
        let fixes = vec![
            Fix::assign(7, left.clone(), right),
            Fix::set_value(8, left, "Z"),
        ];

        let mut writer = RepairWriter::new(config.clone(), tables);
        assert_eq!(writer.execute(fixes).unwrap(), 2);

        let mut conn = connect(&config, CommitMode::Auto).unwrap();
        let rows = conn
            .query(
                "SELECT id, vid, c1_tupleid, op, c2_tupleid, c2_value FROM repair ORDER BY id",
                &[],
            )
            .unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].get("vid"), Some(&Value::Int(7)));
        assert_eq!(rows[0].get("c2_tupleid"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get("op"), Some(&Value::Int(FixOp::Eq.code())));

        assert_eq!(rows[1].get("vid"), Some(&Value::Int(8)));
        assert_eq!(rows[1].get("c2_tupleid"), Some(&Value::Null));
        assert_eq!(rows[1].get("c2_value"), Some(&Value::from("Z")));
    }
}
