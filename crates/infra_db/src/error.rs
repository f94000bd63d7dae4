//! Database error types
//!
//! This module defines the error types that can occur during database operations
//! and their translation into the `PortError` the domain understands.

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Optimistic concurrency check failed
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped to a domain value
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Expense", "EXP-123");
    /// assert!(error.to_string().contains("Expense"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Creates a duplicate entry error
    pub fn duplicate(entity: &str, field: &str, value: impl std::fmt::Display) -> Self {
        DatabaseError::DuplicateEntry(format!(
            "{} with {} '{}' already exists",
            entity, field, value
        ))
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        DatabaseError::SerializationError(message.into())
    }

    /// Classifies a PostgreSQL error by its SQLSTATE code
    ///
    /// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>
    pub fn from_sqlstate(code: Option<&str>, message: String) -> Self {
        match code {
            Some("23505") => DatabaseError::DuplicateEntry(message),
            Some("23503") => DatabaseError::ForeignKeyViolation(message),
            // 22003: numeric_value_out_of_range
            Some("23514") | Some("22003") => DatabaseError::ConstraintViolation(message),
            _ => DatabaseError::QueryFailed(message),
        }
    }
}

/// Converts SQLx errors to more specific DatabaseError variants
///
/// The mapping is driven by the PostgreSQL SQLSTATE code.
impl From<&sqlx::Error> for DatabaseError {
    fn from(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                DatabaseError::from_sqlstate(db_err.code().as_deref(), db_err.message().to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::SerializationError(error.to_string())
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        DatabaseError::from(&error)
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::NotFound {
                entity_type: entity,
                id,
            },
            DatabaseError::DuplicateEntry(message) | DatabaseError::VersionConflict(message) => {
                PortError::Conflict { message }
            }
            DatabaseError::ForeignKeyViolation(message) | DatabaseError::ConstraintViolation(message) => {
                PortError::Validation { message, field: None }
            }
            DatabaseError::ConnectionFailed(message) => PortError::Connection {
                message,
                source: None,
            },
            DatabaseError::PoolExhausted => PortError::ServiceUnavailable {
                service: "postgres".to_string(),
            },
            other => PortError::Internal {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_port_not_found() {
        let port: PortError = DatabaseError::not_found("Expense", "EXP-1").into();
        assert!(port.is_not_found());
        assert!(port.to_string().contains("EXP-1"));
    }

    #[test]
    fn test_conflicts_map_to_port_conflict() {
        let duplicate: PortError = DatabaseError::duplicate("User", "email", "a@b.c").into();
        assert!(duplicate.is_conflict());

        let stale: PortError = DatabaseError::VersionConflict("expense moved on".to_string()).into();
        assert!(stale.is_conflict());
    }

    #[test]
    fn test_pool_exhaustion_is_unavailable() {
        let port: PortError = DatabaseError::PoolExhausted.into();
        assert!(matches!(port, PortError::ServiceUnavailable { .. }));
    }

    #[test]
    fn test_numeric_overflow_is_validation() {
        let error = DatabaseError::from_sqlstate(Some("22003"), "numeric field overflow".to_string());
        assert!(matches!(error, DatabaseError::ConstraintViolation(_)));

        let port: PortError = error.into();
        assert!(matches!(port, PortError::Validation { .. }));
    }

    #[test]
    fn test_unknown_sqlstate_is_query_failure() {
        let error = DatabaseError::from_sqlstate(Some("42P01"), "relation does not exist".to_string());
        assert!(matches!(error, DatabaseError::QueryFailed(_)));
    }

    #[test]
    fn test_row_not_found() {
        let error = DatabaseError::from(&sqlx::Error::RowNotFound);
        assert!(matches!(error, DatabaseError::NotFound { .. }));
    }
}
