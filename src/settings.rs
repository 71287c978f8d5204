//! Handles settings for the application. Configuration is read from an
//! optional `tabkeeper.toml` and from `TABKEEPER__<SECTION>__<KEY>`
//! environment variables, on top of built-in defaults.
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::ParticipantPolicy;
use crate::storage::StorageBackend;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tabkeeper.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct App {
    /// Log level used for the crate's tracing filter
    pub level: String,
    /// Register unknown owers instead of rejecting the transaction
    pub allow_implicit_participants: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub storage: Storage,
}

impl Settings {
    /// Load settings. An explicit `path` must exist; otherwise
    /// [`DEFAULT_CONFIG_FILE`] is used when present.
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("app.allow_implicit_participants", false)?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "file")?
            .set_default("storage.path", ".db/tabs.json")?
            .add_source(file)
            .add_source(Environment::with_prefix("TABKEEPER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn participant_policy(&self) -> ParticipantPolicy {
        ParticipantPolicy::from_allow_implicit(self.app.allow_implicit_participants)
    }

    /// Address the HTTP server binds to.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
