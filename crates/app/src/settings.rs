//! Handles settings for the application. Configuration is read from
//! `config/tandem.toml`, then overridden by `TANDEM__*` environment
//! variables, e.g. `TANDEM__SERVER__PORT=8080`.
use config::{Config, ConfigError, Environment, File};
use engine::LedgerSettings;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    /// Path of the database file.
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/tandem").required(false))
            .add_source(
                Environment::with_prefix("TANDEM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

impl Server {
    /// Basic auth credentials, only when both halves are configured.
    pub fn credentials(&self) -> Option<server::Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(server::Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}
