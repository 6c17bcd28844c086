//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `BLOCKFOUR_*` environment variables, then command-line overrides.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Environment variable overriding [`ServerConfig::host`].
pub const ENV_HOST: &str = "BLOCKFOUR_HOST";
/// Environment variable overriding [`ServerConfig::port`].
pub const ENV_PORT: &str = "BLOCKFOUR_PORT";
/// Environment variable overriding [`ServerConfig::database`].
pub const ENV_DATABASE: &str = "BLOCKFOUR_DATABASE";

/// Runtime configuration for the game server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    host: String,
    /// Port to bind.
    port: u16,
    /// SQLite database path; `:memory:` keeps everything in process.
    database: String,
    /// Default number of scoreboard rows.
    scoreboard_limit: usize,
    /// Rebuild live sessions from the event log at startup.
    restore_sessions: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database: "blockfour.db".to_string(),
            scoreboard_limit: 5,
            restore_sessions: false,
        }
    }
}

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Address to bind.
    pub host: Option<String>,
    /// Port to bind.
    pub port: Option<u16>,
    /// SQLite database path.
    pub database: Option<String>,
    /// Force session restore on.
    pub restore_sessions: bool,
}

impl ServerConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Builds the effective configuration from every source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unreadable file or a malformed
    /// environment value.
    #[instrument(skip(file, overrides))]
    pub fn load(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base
            .apply_vars(|key| std::env::var(key).ok())?
            .apply_overrides(overrides);
        debug!(?config, "Effective configuration");
        Ok(config)
    }

    /// Applies `BLOCKFOUR_*` variables obtained through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the port is not a number.
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid {ENV_PORT} '{port}': {e}")))?;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.database = database;
        }
        Ok(self)
    }

    /// Applies command-line overrides.
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(database) = overrides.database {
            self.database = database;
        }
        self.restore_sessions |= overrides.restore_sessions;
        self
    }

    /// `host:port` string for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
