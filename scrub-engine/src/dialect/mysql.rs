//! MySQL statement generation.

use super::SqlDialect;
use crate::error::Result;
use crate::security::SqlSecurity;

/// Dialect for MySQL backends.
pub struct MySqlDialect;

// MySQL quotes identifiers with backticks rather than ANSI double quotes.
fn backtick(identifier: &str) -> Result<String> {
    SqlSecurity::validate_identifier(identifier)?;
    Ok(format!("`{identifier}`"))
}

impl SqlDialect for MySqlDialect {
    fn create_violation_table(&self, table: &str) -> Result<String> {
        let table = backtick(table)?;
        Ok(format!(
            "CREATE TABLE {table} (\
             vid int, \
             rid varchar(255), \
             tablename varchar(63), \
             tupleid int, \
             attribute varchar(63), \
             value text)"
        ))
    }

    fn create_repair_table(&self, table: &str) -> Result<String> {
        let table = backtick(table)?;
        Ok(format!(
            "CREATE TABLE {table} (\
             id int, \
             vid int, \
             c1_tupleid int, \
             c1_tablename varchar(63), \
             c1_attribute varchar(63), \
             c1_value text, \
             op int, \
             c2_tupleid int, \
             c2_tablename varchar(63), \
             c2_attribute varchar(63), \
             c2_value text)"
        ))
    }

    fn create_audit_table(&self, table: &str) -> Result<String> {
        let table = backtick(table)?;
        Ok(format!(
            "CREATE TABLE {table} (\
             id int AUTO_INCREMENT PRIMARY KEY, \
             vid int, \
             tupleid int, \
             tablename varchar(63), \
             attribute varchar(63), \
             oldvalue text, \
             newvalue text, \
             time timestamp DEFAULT current_timestamp)"
        ))
    }

    fn delete_all(&self, table: &str) -> Result<String> {
        let table = backtick(table)?;
        Ok(format!("DELETE FROM {table}"))
    }

    fn drop_table(&self, table: &str) -> Result<String> {
        let table = backtick(table)?;
        Ok(format!("DROP TABLE {table}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_table_uses_auto_increment() {
        let sql = MySqlDialect.create_audit_table("audit").unwrap();
        assert!(sql.contains("AUTO_INCREMENT"));
    }
}
