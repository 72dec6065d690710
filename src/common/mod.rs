//! Shared building blocks: configuration, error types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{AppConfig, MediatorConfig, ServerConfig, StorageConfig};
pub use errors::{ConfigError, ConfigResult, StoreError, StoreResult};
pub use ids::{IdParseError, MessageId, UserId};
