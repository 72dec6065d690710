//! Configuration for the mediator, its stores and the HTTP server.
//!
//! Everything is read once at startup through [`AppConfig::from_env`] and
//! handed down explicitly; nothing reads the environment after that.

use core::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::common::errors::{ConfigError, ConfigResult};

/// Default OpenAI-compatible API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Fine-tuned mediator persona model.
pub const DEFAULT_PRIMARY_MODEL: &str = "ft:gpt-4.1-nano-2025-04-14:personal:drponz:Cuia45yO";
/// General-purpose model used when the fine-tuned one is not accessible.
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";
/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

const API_KEY_ENV: &str = "SYNAPSE_OPENAI_API_KEY";
const API_KEY_LEGACY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "SYNAPSE_OPENAI_BASE_URL";
const PRIMARY_MODEL_ENV: &str = "SYNAPSE_PRIMARY_MODEL";
const FALLBACK_MODEL_ENV: &str = "SYNAPSE_FALLBACK_MODEL";
const DB_PATH_ENV: &str = "SYNAPSE_DB_PATH";
const PORT_ENV: &str = "SYNAPSE_PORT";
const REPLY_TIMEOUT_ENV: &str = "SYNAPSE_REPLY_TIMEOUT_SECS";

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model provider settings.
    pub mediator: MediatorConfig,
    /// `SQLite` settings.
    pub storage: StorageConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the process environment and validate it.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup and validate it.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup(API_KEY_ENV).or_else(|| lookup(API_KEY_LEGACY_ENV)) {
            config.mediator.api_key = key;
        }
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.mediator.base_url = base_url;
        }
        if let Some(model) = lookup(PRIMARY_MODEL_ENV) {
            config.mediator.primary_model = model;
        }
        if let Some(model) = lookup(FALLBACK_MODEL_ENV) {
            config.mediator.fallback_model = model;
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.server.port = parse_number(PORT_ENV, &port)?;
        }
        if let Some(secs) = lookup(REPLY_TIMEOUT_ENV) {
            config.server.reply_timeout_secs = parse_number(REPLY_TIMEOUT_ENV, &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        self.mediator.validate()?;
        self.storage.validate()?;
        self.server.validate()
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

/// Model provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// Bearer credential for the provider.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model tried first.
    pub primary_model: String,
    /// Model tried once when the primary is not accessible.
    pub fallback_model: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for MediatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("primary_model", &self.primary_model)
            .field("fallback_model", &self.fallback_model)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl MediatorConfig {
    /// Validate provider settings.
    ///
    /// # Errors
    /// Returns an error if the credential or a model id is blank, or the URL is invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        if self.primary_model.trim().is_empty() {
            return Err(ConfigError::Empty("mediator.primary_model"));
        }
        if self.fallback_model.trim().is_empty() {
            return Err(ConfigError::Empty("mediator.fallback_model"));
        }
        Url::parse(&self.base_url)?;
        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Quiz response table name.
    pub responses_table: String,
    /// Airlock message table name.
    pub messages_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("synapse.sqlite"),
            responses_table: "quiz_responses".to_string(),
            messages_table: "airlock_messages".to_string(),
        }
    }
}

impl StorageConfig {
    /// Validate that table names are safe to interpolate into SQL.
    ///
    /// # Errors
    /// Returns an error if a table name is not a plain identifier.
    pub fn validate(&self) -> ConfigResult<()> {
        for table in [&self.responses_table, &self.messages_table] {
            if !is_identifier(table) {
                return Err(ConfigError::InvalidTableName(table.clone()));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Upper bound on one mediator exchange, in seconds.
    pub reply_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reply_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Validate server settings.
    ///
    /// # Errors
    /// Returns an error if the reply timeout is zero.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.reply_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.reply_timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Reply timeout as a [`Duration`].
    #[must_use]
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_need_a_credential() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }

    #[test]
    fn test_defaults_with_credential() {
        let config = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.mediator.api_key, "sk-test");
        assert_eq!(config.mediator.primary_model, DEFAULT_PRIMARY_MODEL);
        assert_eq!(config.mediator.fallback_model, DEFAULT_FALLBACK_MODEL);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.reply_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_specific_key_wins_over_legacy() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "legacy"),
            ("SYNAPSE_OPENAI_API_KEY", "preferred"),
        ]))
        .unwrap();
        assert_eq!(config.mediator.api_key, "preferred");
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SYNAPSE_OPENAI_BASE_URL", "http://127.0.0.1:8080/v1"),
            ("SYNAPSE_PRIMARY_MODEL", "primary"),
            ("SYNAPSE_FALLBACK_MODEL", "fallback"),
            ("SYNAPSE_DB_PATH", "/tmp/x.sqlite"),
            ("SYNAPSE_PORT", "8081"),
            ("SYNAPSE_REPLY_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.mediator.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.mediator.primary_model, "primary");
        assert_eq!(config.mediator.fallback_model, "fallback");
        assert_eq!(config.storage.sqlite_path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.reply_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SYNAPSE_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "SYNAPSE_PORT", .. }));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SYNAPSE_OPENAI_BASE_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Url(_)));
    }

    #[test]
    fn test_table_names_are_identifiers() {
        let mut storage = StorageConfig::default();
        assert!(storage.validate().is_ok());
        storage.messages_table = "messages; DROP TABLE x".to_string();
        assert!(matches!(
            storage.validate(),
            Err(ConfigError::InvalidTableName(_))
        ));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = MediatorConfig {
            api_key: "sk-secret".to_string(),
            ..MediatorConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
