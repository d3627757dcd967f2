//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be set via the
//! `-f` flag or `NIDCTL_CONFIG`.
//!
//! Sources are merged in order (later overrides earlier):
//!
//! 1. **YAML config file** — base configuration
//! 2. **Environment variables** — `NIDCTL_`-prefixed, `__` for nesting
//!    (e.g. `NIDCTL_RATE_LIMIT__MAX_REQUESTS=5`)
//! 3. **DATABASE_URL** — special case: overrides `database.url` if set
//!
//! ```bash
//! NIDCTL_PORT=8080
//! DATABASE_URL="sqlite:nidctl.db"
//! NIDCTL_RATE_LIMIT__WINDOW_SECS=60
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "NIDCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g. "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Shorthand override for `database.url`, kept for `DATABASE_URL`
    /// compatibility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Admission-gate settings
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite connection URL; the file is created if missing
    pub url: String,
    /// Connection pool size
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Sliding-window length in seconds
    pub window_secs: u64,
    /// Maximum requests one identity may make per window
    pub max_requests: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            database: DatabaseConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:nidctl.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 100,
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("NIDCTL_").split("__"));

        let mut config: Config = figment.extract()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        } else if let Some(url) = config.database_url.clone() {
            config.database.url = url;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
