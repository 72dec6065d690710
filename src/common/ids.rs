//! Identifier types.
//!
//! User ids come from the authentication layer and are opaque strings, so
//! they are only checked for blankness. Message ids are generated here.
//!
//! With feature `uuid_v7` enabled, message ids are time-ordered `UUIDv7`
//! for better insert locality; otherwise they are random `UUIDv4`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    /// The id was empty or whitespace only.
    #[error("identifier must not be blank")]
    Blank,
    /// The id is not a valid UUID.
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),
}

/// Identifier of an application user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Wrap a raw id, rejecting blank input.
    ///
    /// # Errors
    /// Returns [`IdParseError::Blank`] if the id is empty after trimming.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdParseError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::Blank);
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// Identifier of a logged airlock message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        #[cfg(feature = "uuid_v7")]
        {
            Self(Uuid::now_v7())
        }
        #[cfg(not(feature = "uuid_v7"))]
        {
            Self(Uuid::new_v4())
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|err| IdParseError::InvalidUuid(err.to_string()))
    }
}
