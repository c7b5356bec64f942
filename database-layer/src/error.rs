use error_common::codes;
use thiserror::Error;

use crate::transport::DatabaseTarget;

/// Data-layer failure.
///
/// Driver failures display the driver's own message so error policy rules
/// match the text operators see in the database logs.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("{message}")]
    ConnectionFailed {
        target: DatabaseTarget,
        message: String,
    },

    #[error("{message}")]
    Driver {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{0}")]
    QueryFailed(String),

    #[error("Invalid value for parameter @{name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid database settings: {0}")]
    Settings(#[from] config::ConfigError),
}

impl DatabaseError {
    pub fn connection(target: DatabaseTarget, err: &sqlx::Error) -> Self {
        Self::ConnectionFailed {
            target,
            message: driver_message(err),
        }
    }

    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => codes::database::CONNECTION_FAILED,
            Self::Driver { .. } => codes::database::DRIVER_ERROR,
            Self::QueryFailed(_) => codes::database::QUERY_FAILED,
            Self::InvalidParameter { .. } => codes::database::INVALID_PARAMETER,
            Self::Settings(_) => codes::configuration::INVALID_SETTINGS,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(source: sqlx::Error) -> Self {
        Self::Driver {
            message: driver_message(&source),
            source,
        }
    }
}

impl From<DatabaseError> for error_common::RxOpsError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Settings(e) => Self::ConfigError(e.to_string()),
            other => Self::DatabaseError(format!("[{}] {other}", other.code())),
        }
    }
}

/// The server's message without sqlx's category prefix.
fn driver_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        sqlx::Error::Io(io) => io.to_string(),
        other => other.to_string(),
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
