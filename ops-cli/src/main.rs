use std::io;
use std::sync::Arc;

use clap::Parser;
use database_layer::{DatabaseSettings, PgConnector, ResilientDataAccess};
use error_common::{log_error, Result};
use logger_redacted::{init_tracing, LogFormat, LoggerConfig};

use rxops::{db, exceptions, policy, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logger = LoggerConfig::from_env()
        .with_format(LogFormat::Pretty)
        .with_log_level(if cli.verbose { "debug" } else { "warn" });
    init_tracing(&logger)?;

    let (store, _watch) = policy::open_watched(&cli.policy, logger.development).await;

    let mut out = io::stdout();
    let result = match cli.command {
        Commands::Exceptions(command) => exceptions::execute(&store, command, &mut out).await,
        Commands::Db(command) => {
            let settings = DatabaseSettings::from_env()?;
            let access = ResilientDataAccess::new(Arc::new(PgConnector::new(settings)), Arc::clone(&store));
            let result = db::execute(&access, command, &mut out).await;
            access.close().await;
            result
        }
    };

    if let Err(e) = &result {
        log_error("rxops", e);
    }
    result
}
