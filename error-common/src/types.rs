use thiserror::Error;

use crate::codes;

/// Top-level error for RxOps binaries and cross-crate plumbing
#[derive(Error, Debug)]
pub enum RxOpsError {
    /// Database operation errors that the error policy let through
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration errors (settings, policy resource)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Filesystem and terminal I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal system errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RxOpsError {
    /// Stable code for log correlation
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => codes::database::QUERY_FAILED,
            Self::ConfigError(_) => codes::configuration::INVALID_SETTINGS,
            Self::ValidationError(_) => codes::validation::INVALID_INPUT,
            Self::IoError(_) => codes::internal::IO_ERROR,
            Self::InternalError(_) | Self::Other(_) => codes::internal::UNEXPECTED,
        }
    }
}

/// Result type alias for RxOps operations
pub type Result<T> = std::result::Result<T, RxOpsError>;

/// Log an error that is about to terminate an operation
pub fn log_error(context: &str, error: &RxOpsError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error = %error,
        "RxOps error occurred"
    );
}
