use std::{env, sync::Arc};

use pgdb_core::PasswordGenerator;
use pgdb_operator::config::loader::{DEFAULT_CONFIG_FILE, load_config};
use pgdb_operator::{AppState, ServerBuilder, observability};
use pgdb_postgres::PostgresServer;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From PGDB_OPERATOR_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (pgdb-operator.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (PGDB_OPERATOR_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        persist_policy = ?cfg.secret.persist_policy,
        "Configuration loaded"
    );

    if !observability::apply_logging_level(&cfg.logging.level) {
        tracing::debug!("Logging level left to RUST_LOG");
    }

    // Read once; never consulted again after startup.
    let pg_config = match cfg.postgres_config(|key| env::var(key).ok()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("PostgreSQL configuration error: {e}");
            std::process::exit(2);
        }
    };

    let server = match PostgresServer::connect(&pg_config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("PostgreSQL initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let credentials = match PasswordGenerator::new(cfg.credentials.clone()) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            eprintln!("Password policy error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(config = ?pg_config, "Administrative connection configured");

    let state = AppState::postgres(server, credentials, cfg.secret.persist_policy);
    let app = ServerBuilder::new(state).with_config(cfg).build();

    if let Err(err) = app.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: PGDB_OPERATOR_CONFIG
/// 3. Default: pgdb-operator.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("PGDB_OPERATOR_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default)
}
