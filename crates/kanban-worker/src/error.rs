//! Worker startup and runtime errors.

use kanban_messaging::MessagingError;
use thiserror::Error;

/// Errors that stop the worker process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Broker configuration or connection error.
    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messaging_errors_convert_with_context() {
        let err: AppError = MessagingError::Connection("refused".into()).into();

        assert!(matches!(err, AppError::Messaging(_)));
        assert_eq!(
            err.to_string(),
            "messaging error: broker connection failed: refused"
        );
    }

    #[test]
    fn test_io_errors_are_server_errors() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();

        assert!(matches!(err, AppError::Server(_)));
    }
}
