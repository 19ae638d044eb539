//! Source stage: reads tuples out of a backend table.

use super::Operator;
use crate::backend::{connect, CommitMode, DbConfig};
use crate::error::{Result, ScrubError};
use crate::model::{Tuple, Value};
use crate::security::SqlSecurity;
use tracing::debug;

/// Reads every tuple of one source table.
///
/// Source tables carry the ingestion-assigned `tid` surrogate column; rows
/// are read in `tid` order and every other column becomes a tuple attribute.
pub struct TupleReader {
    config: DbConfig,
    table: String,
}

impl TupleReader {
    /// Creates a reader for the given source table.
    pub fn new(config: DbConfig, table: impl Into<String>) -> Self {
        Self {
            config,
            table: table.into(),
        }
    }
}

impl Operator for TupleReader {
    type Input = ();
    type Output = Vec<Tuple>;

    fn execute(&mut self, _input: ()) -> Result<Vec<Tuple>> {
        let escaped = SqlSecurity::escape_identifier(&self.table)?;
        let mut conn = connect(&self.config, CommitMode::Auto)?;

        let rows = conn.query(&format!("SELECT * FROM {escaped} ORDER BY tid"), &[])?;

        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let tid = match row.get("tid") {
                Some(Value::Int(tid)) => *tid,
                _ => {
                    return Err(ScrubError::backend(format!(
                        "table '{}' has no integer tid column; sources must be \
                         ingested with a tuple-id surrogate",
                        self.table
                    )))
                }
            };
            let mut tuple = Tuple::new(self.table.clone(), tid);
            for (index, column) in row.columns().iter().enumerate() {
                if column == "tid" {
                    continue;
                }
                if let Some(value) = row.value(index) {
                    tuple.set(column.clone(), value.clone());
                }
            }
            tuples.push(tuple);
        }

        debug!(
            source.table = %self.table,
            tuples.read = tuples.len(),
            "Read source tuples"
        );
        Ok(tuples)
    }

    fn name(&self) -> &str {
        "tuple_reader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DialectKind;

    fn seeded_config(dir: &tempfile::TempDir) -> DbConfig {
        let path = dir.path().join("source.db");
        let config = DbConfig::new(DialectKind::Sqlite, path.to_string_lossy().to_string());
        let mut conn = connect(&config, CommitMode::Auto).unwrap();
        conn.execute("CREATE TABLE emp (tid int, dept text, manager text)", &[])
            .unwrap();
        for (tid, dept, manager) in [(2, "A", "Y"), (1, "A", "X")] {
            conn.execute(
                "INSERT INTO emp (tid, dept, manager) VALUES (?1, ?2, ?3)",
                &[Value::Int(tid), Value::from(dept), Value::from(manager)],
            )
            .unwrap();
        }
        config
    }

    #[test]
    fn test_reads_tuples_in_tid_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = seeded_config(&dir);

        let mut reader = TupleReader::new(config, "emp");
        let tuples = reader.execute(()).unwrap();

        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].tid(), 1);
        assert_eq!(tuples[1].tid(), 2);
        assert_eq!(tuples[0].get("manager"), Some(&Value::from("X")));
        assert!(tuples[0].get("tid").is_none());
    }

    #[test]
    fn test_missing_tid_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        let config = DbConfig::new(DialectKind::Sqlite, path.to_string_lossy().to_string());
        let mut conn = connect(&config, CommitMode::Auto).unwrap();
        conn.execute("CREATE TABLE bare (x int)", &[]).unwrap();
        conn.execute("INSERT INTO bare (x) VALUES (1)", &[]).unwrap();
        drop(conn);

        let mut reader = TupleReader::new(config, "bare");
        assert!(reader.execute(()).is_err());
    }
}
