//! Structured error types for the data-access layer.
//!
//! Uses `thiserror` for better API surface and error composition.
//! The key split is transient vs. everything else: only transient
//! storage failures are eligible for retry by the executor.

use thiserror::Error;

/// Main error type for data-access operations
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection, pool, or network failure that may heal on retry
    #[error("transient storage error: {source}")]
    Transient { source: sqlx::Error },

    /// Referential or uniqueness violation; never retried
    #[error("constraint violation: {source}")]
    Constraint { source: sqlx::Error },

    /// Any other storage-engine failure
    #[error("storage error: {source}")]
    Storage { source: sqlx::Error },

    /// Filter shape the layer does not understand
    #[error("unsupported filter operation '{operator}' on field '{field}'")]
    UnsupportedFilter { field: String, operator: String },

    /// Strict-mode filter referencing a column outside the kind's registry
    #[error("unknown field '{field}' for table '{table}'")]
    UnknownField { table: &'static str, field: String },

    /// Eager-load request naming a relation the kind does not declare
    #[error("unknown relation '{relation}' for table '{table}'")]
    UnknownRelation { table: &'static str, relation: String },

    /// `update` on a record that was never persisted
    #[error("record for table '{table}' has no id")]
    MissingId { table: &'static str },

    /// `delete` whose filter set contains no recognized column
    #[error("refusing to delete from '{table}' without a recognized filter")]
    EmptyFilter { table: &'static str },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for data-access operations
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Transient,
    Constraint,
    Storage,
}

/// Classify a SQLSTATE code.
///
/// Class 08 (connection), 53300 (too many connections), 57014
/// (statement timeout cancel), 57P01 (admin shutdown), 40001
/// (serialization failure), and 40P01 (deadlock) heal on retry.
/// Class 23 is a constraint violation and must surface immediately.
fn classify_code(code: &str) -> Class {
    if code.starts_with("08") {
        return Class::Transient;
    }
    if code.starts_with("23") {
        return Class::Constraint;
    }
    match code {
        "53300" | "57014" | "57P01" | "40001" | "40P01" => Class::Transient,
        _ => Class::Storage,
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let class = match &err {
            sqlx::Error::Database(db) => db
                .code()
                .map(|code| classify_code(&code))
                .unwrap_or(Class::Storage),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => Class::Transient,
            _ => Class::Storage,
        };
        match class {
            Class::Transient => DbError::Transient { source: err },
            Class::Constraint => DbError::Constraint { source: err },
            Class::Storage => DbError::Storage { source: err },
        }
    }
}

impl DbError {
    /// Whether the retrying executor should try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_classification() {
        assert_eq!(classify_code("08006"), Class::Transient);
        assert_eq!(classify_code("08001"), Class::Transient);
        assert_eq!(classify_code("53300"), Class::Transient);
        assert_eq!(classify_code("57014"), Class::Transient);
        assert_eq!(classify_code("40001"), Class::Transient);
        assert_eq!(classify_code("23505"), Class::Constraint);
        assert_eq!(classify_code("23503"), Class::Constraint);
        assert_eq!(classify_code("42P01"), Class::Storage);
        assert_eq!(classify_code("22001"), Class::Storage);
    }

    #[test]
    fn pool_errors_are_transient() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_transient());
    }

    #[test]
    fn row_not_found_is_not_transient() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_transient());
        assert!(matches!(err, DbError::Storage { .. }));
    }

    #[test]
    fn usage_errors_display() {
        let err = DbError::UnknownField {
            table: "courses",
            field: "nme".into(),
        };
        assert_eq!(err.to_string(), "unknown field 'nme' for table 'courses'");
        assert!(!err.is_transient());
    }
}
