use error_common::codes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Policy resource {resource} could not be read: {source}")]
    Unreadable {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Policy resource {resource} could not be written: {source}")]
    PersistFailed {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Policy document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid regex pattern {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Cannot watch {0}: not a file path")]
    WatchTarget(String),
}

impl PolicyError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreadable { .. } | Self::Malformed(_) => codes::policy::CONFIG_UNREADABLE,
            Self::PersistFailed { .. } => codes::policy::PERSIST_FAILED,
            Self::InvalidRegex { .. } => codes::policy::INVALID_REGEX,
            Self::Watcher(_) | Self::WatchTarget(_) => codes::policy::WATCHER_FAILED,
        }
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
