use std::net::SocketAddr;

use pgdb_core::{PasswordPolicy, SecretPersistPolicy};
use pgdb_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Administrative connection. When the section is absent, the libpq
    /// variables are used instead; see [`AppConfig::postgres_config`].
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
    #[serde(default)]
    pub credentials: PasswordPolicy,
    #[serde(default)]
    pub secret: SecretConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub persist_policy: SecretPersistPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if let Some(pg) = &self.postgres {
            if pg.pool_size == 0 {
                return Err("postgres.pool_size must be > 0".into());
            }
            if pg.connect_timeout_ms == 0 {
                return Err("postgres.connect_timeout_ms must be > 0".into());
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }
        self.credentials
            .validate()
            .map_err(|e| format!("credentials: {e}"))?;
        Ok(())
    }

    /// Resolves the administrative connection.
    ///
    /// The `[postgres]` section wins when present. Otherwise the connection
    /// is read through `lookup` from `PG_DB_OPERATOR_CONNECTION_STRING` or
    /// the libpq variables.
    pub fn postgres_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<PostgresConfig, String> {
        match &self.postgres {
            Some(pg) => Ok(pg.clone()),
            None => PostgresConfig::from_env_lookup(lookup).map_err(|e| e.to_string()),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "pgdb-operator.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., PGDB_OPERATOR__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("PGDB_OPERATOR")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
