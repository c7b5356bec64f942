//! Logging bootstrap with automatic redaction of sensitive error text
//!
//! Pharmacy databases hold patient contact details and the error messages
//! they raise echo those values back. Everything in RxOps that logs a
//! driver or policy error passes the text through [`redact`] first.
//!
//! # Detected Data Types
//!
//! - **Connection credentials**: `postgres://rx:secret@db` → `postgres://rx:[REDACTED]@db`
//! - **Credential assignments**: `Password=hunter2` → `Password=[REDACTED]`
//! - **Email Addresses**: patient7@example.com → p***@e***
//! - **SSN**: 123-45-6789 → ***-**-****
//! - **Phone Numbers**: (555) 123-4567 → (***) ***-****
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, redact, LoggerConfig};
//!
//! init_tracing(&LoggerConfig::from_env()).ok();
//! tracing::warn!(error = %redact("login failed for jane@example.com"), "query failed");
//! ```

pub mod redactor;
pub mod config;

pub use redactor::*;
pub use config::*;

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use error_common::{Result, RxOpsError};
use lazy_static::lazy_static;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static REDACTION_ENABLED: AtomicBool = AtomicBool::new(true);

lazy_static! {
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::new(RedactionConfig::default());
}

/// Redact text with the process-wide default redactor.
pub fn redact(text: &str) -> Cow<'_, str> {
    if !REDACTION_ENABLED.load(Ordering::Relaxed) {
        return Cow::Borrowed(text);
    }
    DEFAULT_REDACTOR.redact(text)
}

pub fn set_redaction_enabled(enabled: bool) {
    REDACTION_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. A second call leaves
/// the first subscriber in place and succeeds.
pub fn init_tracing(config: &LoggerConfig) -> Result<()> {
    set_redaction_enabled(config.redaction_enabled);

    let level = &config.log_level;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "rxops={level},error_policy={level},database_layer={level},sqlx=warn"
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(config.development)
                    .with_line_number(config.development)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    match result {
        Ok(()) => Ok(()),
        Err(_) if tracing::dispatcher::has_been_set() => {
            tracing::debug!("Tracing subscriber already installed");
            Ok(())
        }
        Err(e) => Err(RxOpsError::InternalError(format!("Failed to initialise tracing: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_keeps_first_subscriber() {
        let config = LoggerConfig::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config.with_format(LogFormat::Json)).is_ok());
        assert!(tracing::dispatcher::has_been_set());
    }
}
