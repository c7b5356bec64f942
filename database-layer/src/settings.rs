// Connection settings for the primary and warehouse databases.
use std::time::Duration;

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::DatabaseResult;
use crate::transport::DatabaseTarget;

/// Settings read from `DB_*` environment variables.
///
/// | Variable | Default |
/// |---|---|
/// | `DB_SERVER` | `localhost` |
/// | `DB_PORT` | `5432` |
/// | `DB_USER` | `postgres` |
/// | `DB_PASSWORD` | empty |
/// | `DB_NAME` | `rxops` |
/// | `DB_WAREHOUSE_NAME` | `dw_production` |
/// | `DB_ENCRYPT` | `false` |
/// | `DB_TRUST_SERVER_CERTIFICATE` | `false` |
/// | `DB_MAX_CONNECTIONS` | `10` |
/// | `DB_MIN_CONNECTIONS` | `0` |
/// | `DB_IDLE_TIMEOUT_SECS` | `30` |
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "empty_secret")]
    pub password: Secret<String>,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_warehouse_name")]
    pub warehouse_name: String,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub trust_server_certificate: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub min_connections: u32,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_name() -> String {
    "rxops".to_string()
}

fn default_warehouse_name() -> String {
    "dw_production".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_idle_timeout_secs() -> u64 {
    30
}

impl DatabaseSettings {
    /// Load `.env` (if present) and then the process environment.
    ///
    /// # Errors
    ///
    /// A variable is present but cannot be converted, e.g. a non-numeric port.
    pub fn from_env() -> DatabaseResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_environment(config::Environment::with_prefix("DB"))
    }

    pub(crate) fn from_environment(environment: config::Environment) -> DatabaseResult<Self> {
        let settings = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn database_for(&self, target: DatabaseTarget) -> &str {
        match target {
            DatabaseTarget::Primary => &self.name,
            DatabaseTarget::Warehouse => &self.warehouse_name,
        }
    }

    /// Unencrypted setups still upgrade to TLS when the server offers it;
    /// an untrusted certificate must verify against the host name.
    pub fn ssl_mode(&self) -> PgSslMode {
        match (self.encrypt, self.trust_server_certificate) {
            (false, _) => PgSslMode::Prefer,
            (true, true) => PgSslMode::Require,
            (true, false) => PgSslMode::VerifyFull,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn connect_options(&self, target: DatabaseTarget) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.server)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
            .database(self.database_for(target))
            .ssl_mode(self.ssl_mode())
            .application_name("rxops")
    }
}
