use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        column: Option<String>,
        /// The conflicting value that caused the violation (if known)
        value: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation, including a missing or dangling
    /// relation value caught before the statement reaches the store
    #[error("Foreign key constraint violation: {message}")]
    ForeignKeyViolation { column: Option<String>, message: String },

    /// A payload attempted to set or change a primary key column
    #[error("Cannot create or change primary key '{column}'")]
    PrimaryKeyImmutable { column: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using sqlx's error categorization. Unique and
/// foreign-key violations are recoverable and surfaced as their own variants;
/// everything else is opaque.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        column: None,
                        value: None,
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        column: None,
                        message: db_err.message().to_string(),
                    }
                } else {
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
