use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database configuration: {0}")]
    ConnectionConfigError(String),

    /// The pool could not hand out a connection.
    #[error("Unable to connect to the database: {0}")]
    ConnectionError(String),

    /// A key, foreign-key, not-null or check constraint rejected the statement.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database error: {0}")]
    QueryError(#[source] sqlx::Error),

    #[error("{entity} {key} was not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Failed to read schema script {path}: {source}")]
    ScriptReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Reinitialization stopped at a statement; everything before it was rolled back.
    #[error("Schema statement #{index} failed ({message}): {statement}")]
    ScriptError {
        index: usize,
        statement: String,
        message: String,
    },
}

impl DbError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(
                db_err.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) {
                return DbError::ConstraintViolation(db_err.message().to_string());
            }
        }

        match err {
            e @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)) => DbError::ConnectionError(e.to_string()),
            e => DbError::QueryError(e),
        }
    }
}
