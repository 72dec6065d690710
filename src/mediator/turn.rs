//! Conversation turns and mediator replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::mediator::errors::MediatorError;

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// A partner speaking.
    User,
    /// The mediator persona.
    #[serde(alias = "assistant")]
    Mediator,
}

impl TurnRole {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Mediator => "mediator",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TurnRole {
    type Err = MediatorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "mediator" | "assistant" => Ok(Self::Mediator),
            other => Err(MediatorError::Validation(format!(
                "unsupported turn role {other:?}"
            ))),
        }
    }
}

/// One prior turn of the conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who said it.
    pub role: TurnRole,
    /// What was said.
    pub content: String,
}

impl ConversationTurn {
    /// Build a partner turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// Build a mediator turn.
    #[must_use]
    pub fn mediator(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Mediator,
            content: content.into(),
        }
    }
}

/// A turn as sent by a conversation client, before validation.
///
/// Clients send string roles and may send `null` content; both are checked
/// when converting into a [`ConversationTurn`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawTurn {
    /// Role tag.
    pub role: String,
    /// Turn text, if any.
    pub content: Option<String>,
}

impl TryFrom<RawTurn> for ConversationTurn {
    type Error = MediatorError;

    fn try_from(raw: RawTurn) -> Result<Self, Self::Error> {
        let role = raw.role.parse::<TurnRole>()?;
        let content = raw.content.ok_or_else(|| {
            MediatorError::Validation(format!("{role} turn has no content"))
        })?;
        Ok(Self { role, content })
    }
}

/// Validate a batch of client turns, preserving order.
///
/// # Errors
/// Returns [`MediatorError::Validation`] on the first malformed turn.
pub fn validate_turns(raw: Vec<RawTurn>) -> Result<Vec<ConversationTurn>, MediatorError> {
    raw.into_iter().map(ConversationTurn::try_from).collect()
}

/// One mediator reply.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorReply {
    /// Reply text.
    pub content: String,
    /// When the reply was produced.
    pub produced_at: DateTime<Utc>,
}

impl MediatorReply {
    /// Stamp a reply with the current time.
    #[must_use]
    pub fn now(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            produced_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(role: &str, content: Option<&str>) -> RawTurn {
        RawTurn {
            role: role.to_string(),
            content: content.map(str::to_string),
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<TurnRole>().unwrap(), TurnRole::User);
        assert_eq!("assistant".parse::<TurnRole>().unwrap(), TurnRole::Mediator);
        assert_eq!("mediator".parse::<TurnRole>().unwrap(), TurnRole::Mediator);
        assert!(matches!(
            "system".parse::<TurnRole>(),
            Err(MediatorError::Validation(_))
        ));
        assert!("drponz".parse::<TurnRole>().is_err());
    }

    #[test]
    fn test_role_deserialize_accepts_assistant_alias() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(turn.role, TurnRole::Mediator);
    }

    #[test]
    fn test_validate_turns_keeps_order() {
        let turns = validate_turns(vec![
            raw("user", Some("first")),
            raw("assistant", Some("second")),
            raw("user", Some("third")),
        ])
        .unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(turns[1].role, TurnRole::Mediator);
    }

    #[test]
    fn test_validate_turns_rejects_unknown_role() {
        let err = validate_turns(vec![raw("user", Some("ok")), raw("system", Some("x"))])
            .unwrap_err();
        assert!(matches!(err, MediatorError::Validation(_)));
    }

    #[test]
    fn test_validate_turns_rejects_null_content() {
        let err = validate_turns(vec![raw("user", None)]).unwrap_err();
        assert!(matches!(err, MediatorError::Validation(_)));
    }

    #[test]
    fn test_reply_serializes_camel_case() {
        let reply = MediatorReply::now("hello");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["content"], "hello");
        assert!(json.get("producedAt").is_some());
    }
}
