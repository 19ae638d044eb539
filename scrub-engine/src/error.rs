//! Error types for the scrub data cleaning engine.
//!
//! This module provides a comprehensive error handling strategy using `thiserror`
//! for automatic error trait implementations. All errors in the engine are
//! represented by the `ScrubError` enum.

use thiserror::Error;

/// The main error type for the scrub engine.
#[derive(Error, Debug)]
pub enum ScrubError {
    /// Error that occurs when a clean-plan document is malformed or inconsistent.
    ///
    /// Plan construction is all-or-nothing: any failure anywhere during parsing
    /// is wrapped into this variant carrying the underlying cause's message.
    #[error("Invalid clean plan: {0}")]
    InvalidCleanPlan(String),

    /// Error that occurs when a rule specification is malformed or the rule
    /// declares an invalid table set.
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule {
        /// Id of the rule that failed to construct
        rule: String,
        /// Detailed error message
        message: String,
    },

    /// Error that occurs when user-supplied detection logic cannot be resolved
    /// or does not satisfy the rule contract.
    #[error("Rule load error for '{reference}': {message}")]
    RuleLoad {
        /// The reference name that failed to resolve
        reference: String,
        /// Detailed error message
        message: String,
    },

    /// Error from schema installation or removal.
    #[error("Schema error on table '{table}': {message}")]
    Schema {
        /// The table the failing statement targeted
        table: String,
        /// Detailed error message
        message: String,
    },

    /// Generic backend error for connection/statement failures not otherwise
    /// classified.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Error from the underlying SQLite driver.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error related to configuration, including unsupported dialect tags.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Security-related error, such as a rejected SQL identifier.
    #[error("Security error: {0}")]
    Security(String),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A type alias for `Result<T, ScrubError>`.
///
/// This is the standard `Result` type used throughout the engine.
pub type Result<T> = std::result::Result<T, ScrubError>;

impl ScrubError {
    /// Creates a new invalid-rule error.
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates a new rule-load error.
    pub fn rule_load(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleLoad {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Creates a new schema error.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a new backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Wraps any error into an `InvalidCleanPlan`, preserving its message.
    ///
    /// Plan construction deliberately collapses the error taxonomy at this
    /// boundary: the caller sees a single failure kind with the cause's text.
    pub fn into_plan_error(self) -> Self {
        match self {
            Self::InvalidCleanPlan(_) => self,
            other => Self::InvalidCleanPlan(other.to_string()),
        }
    }
}
