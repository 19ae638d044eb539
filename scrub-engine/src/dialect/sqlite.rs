//! SQLite statement generation.

use super::SqlDialect;
use crate::error::Result;
use crate::security::SqlSecurity;

/// Dialect for SQLite backends.
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn create_violation_table(&self, table: &str) -> Result<String> {
        let table = SqlSecurity::escape_identifier(table)?;
        Ok(format!(
            "CREATE TABLE {table} (\
             vid INTEGER, \
             rid TEXT, \
             tablename TEXT, \
             tupleid INTEGER, \
             attribute TEXT, \
             value TEXT)"
        ))
    }

    fn create_repair_table(&self, table: &str) -> Result<String> {
        let table = SqlSecurity::escape_identifier(table)?;
        Ok(format!(
            "CREATE TABLE {table} (\
             id INTEGER, \
             vid INTEGER, \
             c1_tupleid INTEGER, \
             c1_tablename TEXT, \
             c1_attribute TEXT, \
             c1_value TEXT, \
             op INTEGER, \
             c2_tupleid INTEGER, \
             c2_tablename TEXT, \
             c2_attribute TEXT, \
             c2_value TEXT)"
        ))
    }

    fn create_audit_table(&self, table: &str) -> Result<String> {
        let table = SqlSecurity::escape_identifier(table)?;
        Ok(format!(
            "CREATE TABLE {table} (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             vid INTEGER, \
             tupleid INTEGER, \
             tablename TEXT, \
             attribute TEXT, \
             oldvalue TEXT, \
             newvalue TEXT, \
             time TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"
        ))
    }

    fn delete_all(&self, table: &str) -> Result<String> {
        let table = SqlSecurity::escape_identifier(table)?;
        Ok(format!("DELETE FROM {table}"))
    }

    fn drop_table(&self, table: &str) -> Result<String> {
        let table = SqlSecurity::escape_identifier(table)?;
        Ok(format!("DROP TABLE {table}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_table_columns() {
        let sql = SqliteDialect.create_violation_table("violation").unwrap();
        for column in ["vid", "rid", "tablename", "tupleid", "attribute", "value"] {
            assert!(sql.contains(column), "missing column {column} in {sql}");
        }
    }

    #[test]
    fn test_audit_table_uses_autoincrement() {
        let sql = SqliteDialect.create_audit_table("audit").unwrap();
        assert!(sql.contains("AUTOINCREMENT"));
    }
}
