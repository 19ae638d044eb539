//! Security utilities for the scrub engine.
//!
//! Rule specifications and clean-plan documents carry user-provided table and
//! attribute names that end up interpolated into generated SQL. This module
//! validates and escapes those identifiers before they reach a statement.

use crate::error::{Result, ScrubError};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::ZeroizeOnDrop;

/// A secure string that automatically clears its contents when dropped.
///
/// Used for backend credentials held inside a connection descriptor.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and escapes a SQL identifier (table name, column name, etc.).
    ///
    /// # Examples
    /// ```rust
    /// use scrub_engine::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::escape_identifier("customer_id").is_ok());
    /// assert!(SqlSecurity::escape_identifier("id; DROP TABLE users--").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;

        // Validation rejects embedded quotes, but escape anyway so the output
        // is safe even if the rules above are ever loosened.
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates a SQL identifier without escaping it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.is_empty() || identifier.trim().is_empty() {
            return Err(ScrubError::Security(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > 128 {
            return Err(ScrubError::Security(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        if identifier.contains('\0') {
            return Err(ScrubError::Security(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        // Letters, numbers, underscores, dots for qualified names; must start
        // with a letter or underscore.
        static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(ScrubError::Security(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a \
                 letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Ok(())
    }
}
