//! # Database Error Types
//!
//! Error types for ledger storage and stock operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        CoreError (stockbook-core)          │
//! │       │                                 │                               │
//! │       ▼                                 ▼                               │
//! │  DbError (this module) ← categorized storage failures + domain errors  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller (HTTP controller) ← maps kind to status/message                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Special Mappings
//! - Immutability trigger aborts → `CoreError::ImmutabilityViolation`
//! - `SQLITE_BUSY` / `SQLITE_LOCKED` / pool timeouts → `ConcurrencyConflict`

use stockbook_core::{CoreError, ValidationError};
use thiserror::Error;
use tracing::error;

/// Marker raised by the immutability triggers in the initial migration.
const IMMUTABLE_MARKER: &str = "stock ledger entries are immutable";

/// Database operation errors.
///
/// These errors wrap sqlx errors and domain errors, providing
/// categorization for retry decisions and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Domain error from stockbook-core (validation, not found,
    /// insufficient stock, no batches, immutability).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate batch number for a tenant
    /// - Duplicate SKU or branch code
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent product, branch or batch row
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another writer held the database lock past the busy timeout.
    ///
    /// Safe to retry the whole operation from scratch. Remove and pick
    /// operations must first check the operation journal by reference.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Metadata column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::Core(CoreError::not_found(entity, id))
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if the operation may succeed when retried from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::ConcurrencyConflict(_))
    }

    /// Returns true for NotFound domain errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::Core(CoreError::NotFound { .. }))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            DbError::InvalidConfig(_) | DbError::ConfigLoadFailed(_)
        )
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → NotFound
/// sqlx::Error::Database       → Analyze code/message:
///     immutability trigger    → Core(ImmutabilityViolation)
///     BUSY / LOCKED           → ConcurrencyConflict
///     UNIQUE                  → UniqueViolation
///     FOREIGN KEY             → ForeignKeyViolation
/// sqlx::Error::PoolTimedOut   → ConcurrencyConflict
/// Other                       → Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains(IMMUTABLE_MARKER) {
                    error!(message = %msg, "Rejected mutation of an immutable ledger row");
                    return DbError::Core(CoreError::immutable("unknown", "modified"));
                }

                // Extended result codes keep the primary code in the low byte
                let primary_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);

                if matches!(primary_code, Some(5) | Some(6))
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::ConcurrencyConflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed") {
                    // "UNIQUE constraint failed: <table>.<column>[, ...]"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::ConcurrencyConflict("timed out waiting for a connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::Quantity;

    #[test]
    fn test_retryable_errors() {
        assert!(DbError::ConcurrencyConflict("database is locked".into()).is_retryable());
        assert!(DbError::from(sqlx::Error::PoolTimedOut).is_retryable());

        assert!(!DbError::not_found("Product", 7).is_retryable());
        assert!(!DbError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_core_errors_are_transparent() {
        let err: DbError = CoreError::InsufficientStock {
            available: Quantity::from_units(30),
            required: Quantity::from_units(50),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Insufficient stock. Available: 30, Required: 50"
        );
    }

    #[test]
    fn test_not_found_helper() {
        let err = DbError::not_found("Branch", 3);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Branch not found: 3");
    }

    #[test]
    fn test_validation_converts() {
        let err: DbError = ValidationError::Required {
            field: "batch_number".into(),
        }
        .into();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }
}
