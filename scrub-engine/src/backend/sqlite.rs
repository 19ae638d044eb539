//! Built-in SQLite backend over `rusqlite`.

use super::{CommitMode, Connection, Connector, DbConfig, DialectKind, Row};
use crate::error::Result;
use crate::model::Value;
use rusqlite::types::Value as SqliteValue;
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens SQLite connections from a [`DbConfig`] whose url is a file path or
/// `:memory:`.
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, config: &DbConfig, mode: CommitMode) -> Result<Box<dyn Connection>> {
        let conn = rusqlite::Connection::open(config.url())?;
        debug!(backend.url = %config.url(), backend.mode = ?mode, "Opened SQLite connection");

        if mode == CommitMode::Manual {
            conn.execute_batch("BEGIN")?;
        }

        Ok(Box::new(SqliteConnection { conn, mode }))
    }
}

#[derive(Debug)]
struct SqliteConnection {
    conn: rusqlite::Connection,
    mode: CommitMode,
}

fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Int(v) => SqliteValue::Integer(*v),
        Value::Real(v) => SqliteValue::Real(*v),
        Value::Text(v) => SqliteValue::Text(v.clone()),
    }
}

fn from_sqlite(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(v) => Value::Int(v),
        SqliteValue::Real(v) => Value::Real(v),
        SqliteValue::Text(v) => Value::Text(v),
        SqliteValue::Blob(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let affected = stmt.execute(rusqlite::params_from_iter(params.iter().map(to_sqlite)))?;
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let columns: Arc<Vec<String>> = Arc::new(
            stmt.column_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
        );
        let column_count = columns.len();

        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter().map(to_sqlite)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(from_sqlite(row.get::<_, SqliteValue>(i)?));
            }
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn commit(&mut self) -> Result<()> {
        if self.mode == CommitMode::Manual {
            // Reopen the transaction so the next batch accumulates again.
            self.conn.execute_batch("COMMIT")?;
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.mode == CommitMode::Manual {
            self.conn.execute_batch("ROLLBACK")?;
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        let exists = stmt.exists(rusqlite::params![table])?;
        Ok(exists)
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if self.mode == CommitMode::Manual {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback on connection release failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::connect;

    fn memory_config() -> DbConfig {
        DbConfig::new(DialectKind::Sqlite, ":memory:")
    }

    #[test]
    fn test_execute_and_query_round_trip() {
        let mut conn = connect(&memory_config(), CommitMode::Auto).unwrap();
        conn.execute("CREATE TABLE emp (tid int, dept text, salary real)", &[])
            .unwrap();
        conn.execute(
            "INSERT INTO emp (tid, dept, salary) VALUES (?1, ?2, ?3)",
            &[Value::Int(1), Value::from("A"), Value::Real(10.5)],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO emp (tid, dept, salary) VALUES (?1, ?2, ?3)",
            &[Value::Int(2), Value::Null, Value::Real(11.0)],
        )
        .unwrap();

        let rows = conn.query("SELECT tid, dept, salary FROM emp ORDER BY tid", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("tid"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get("dept"), Some(&Value::from("A")));
        assert_eq!(rows[1].get("dept"), Some(&Value::Null));
    }

    #[test]
    fn test_manual_mode_commits_at_batch_boundary() {
        let mut conn = connect(&memory_config(), CommitMode::Manual).unwrap();
        conn.execute("CREATE TABLE t (x int)", &[]).unwrap();
        conn.execute("INSERT INTO t (x) VALUES (?1)", &[Value::Int(1)])
            .unwrap();
        conn.commit().unwrap();

        // Work after the boundary can still be rolled back.
        conn.execute("INSERT INTO t (x) VALUES (?1)", &[Value::Int(2)])
            .unwrap();
        conn.rollback().unwrap();

        let rows = conn.query("SELECT x FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_table_exists_catalog_lookup() {
        let mut conn = connect(&memory_config(), CommitMode::Auto).unwrap();
        assert!(!conn.table_exists("emp").unwrap());
        conn.execute("CREATE TABLE emp (tid int)", &[]).unwrap();
        assert!(conn.table_exists("emp").unwrap());
    }
}
