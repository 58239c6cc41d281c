//! Error types for spanorm

use thiserror::Error;

/// Result type alias for spanorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for store and mapping operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Key lookup or single-row query matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-row query matched more rows than expected
    #[error("Too many rows: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// An INSERT/UPDATE/DELETE statement affected zero rows
    #[error("{operation} on '{table}' affected no rows")]
    NoRowsAffected {
        operation: &'static str,
        table: String,
    },

    /// Row already exists (duplicate primary key)
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Transaction aborted by a concurrent commit
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    /// The store rejected a statement or mutation as malformed
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// Any other error reported by the store
    #[error("Store error: {0}")]
    Store(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Statement timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a too-many-rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Create a zero-rows-affected error
    pub fn no_rows_affected(operation: &'static str, table: impl Into<String>) -> Self {
        Self::NoRowsAffected {
            operation,
            table: table.into(),
        }
    }

    /// Create an invalid statement error
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a too-many-rows error
    pub fn is_too_many_rows(&self) -> bool {
        matches!(self, Self::TooManyRows { .. })
    }

    /// Check if this is a zero-rows-affected error
    pub fn is_no_rows_affected(&self) -> bool {
        matches!(self, Self::NoRowsAffected { .. })
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if the store aborted the transaction (retryable)
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Returns `true` when `result` failed because the row was absent.
///
/// Convenience for callers that hold an `OrmResult` rather than the error.
pub fn is_not_found<T>(result: &OrmResult<T>) -> bool {
    matches!(result, Err(e) if e.is_not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_their_variants() {
        assert!(OrmError::not_found("users").is_not_found());
        assert!(OrmError::too_many_rows(1, 2).is_too_many_rows());
        assert!(OrmError::no_rows_affected("UPDATE", "users").is_no_rows_affected());
        assert!(!OrmError::Other("x".into()).is_not_found());
        assert!(is_not_found::<()>(&Err(OrmError::not_found("x"))));
        assert!(!is_not_found(&Ok(())));
    }

    #[test]
    fn no_rows_affected_message() {
        let err = OrmError::no_rows_affected("DELETE", "users");
        assert_eq!(err.to_string(), "DELETE on 'users' affected no rows");
    }
}
