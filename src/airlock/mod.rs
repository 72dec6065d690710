//! Airlock: the couple's mediated conversation log.

pub mod message;
pub mod store;

pub use message::{AirlockMessage, SenderType};
pub use store::{AirlockStore, SqliteAirlockStore};
