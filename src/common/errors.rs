//! Error types for configuration and storage.

use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No provider credential was supplied.
    #[error("missing provider credential: set SYNAPSE_OPENAI_API_KEY or OPENAI_API_KEY")]
    MissingCredential,
    /// A required text value is blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// A value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Raw value as supplied.
        value: String,
    },
    /// A table name is not a plain SQL identifier.
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Storage error type shared by the assessment and airlock stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A stored row could not be decoded.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
    /// The module id is not part of the assessment catalog.
    #[error("unknown assessment module: {0}")]
    UnknownModule(String),
    /// The question id does not belong to the module.
    #[error("question {question_id} is not part of module {module_id}")]
    UnknownQuestion {
        /// Module the response was filed under.
        module_id: String,
        /// Offending question id.
        question_id: u32,
    },
}

impl StoreError {
    /// Whether the error was caused by the caller's input rather than storage.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownModule(_) | Self::UnknownQuestion { .. })
    }
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
