//! Airlock message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::ids::{MessageId, UserId};
use crate::mediator::turn::ConversationTurn;

/// Who wrote an airlock message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    /// The requesting partner.
    User,
    /// The other partner.
    Partner,
    /// The mediator.
    Drponz,
}

impl SenderType {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Partner => "partner",
            Self::Drponz => "drponz",
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SenderType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "partner" => Ok(Self::Partner),
            "drponz" => Ok(Self::Drponz),
            _ => Err(value.to_string()),
        }
    }
}

/// One logged message of a couple's airlock conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlockMessage {
    /// Message id.
    pub id: MessageId,
    /// Couple the conversation belongs to.
    pub couple_id: Option<String>,
    /// Human author; absent for mediator messages.
    pub sender_id: Option<UserId>,
    /// Author kind.
    pub sender_type: SenderType,
    /// Message text.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl AirlockMessage {
    /// A message written by a partner.
    #[must_use]
    pub fn user(couple_id: impl Into<String>, sender: UserId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            couple_id: Some(couple_id.into()),
            sender_id: Some(sender),
            sender_type: SenderType::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// A message written by the mediator.
    #[must_use]
    pub fn mediator(couple_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            couple_id: Some(couple_id.into()),
            sender_id: None,
            sender_type: SenderType::Drponz,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// View the message as a prior turn for the mediator.
    #[must_use]
    pub fn to_turn(&self) -> ConversationTurn {
        match self.sender_type {
            SenderType::Drponz => ConversationTurn::mediator(self.content.clone()),
            SenderType::User | SenderType::Partner => ConversationTurn::user(self.content.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediator::turn::TurnRole;

    #[test]
    fn test_sender_type_tags() {
        for sender in [SenderType::User, SenderType::Partner, SenderType::Drponz] {
            assert_eq!(sender.as_str().parse::<SenderType>(), Ok(sender));
        }
        assert!("assistant".parse::<SenderType>().is_err());
        assert!("Drponz".parse::<SenderType>().is_err());
    }

    #[test]
    fn test_constructors() {
        let user = UserId::parse("u1").unwrap();
        let msg = AirlockMessage::user("c1", user.clone(), "hi");
        assert_eq!(msg.sender_type, SenderType::User);
        assert_eq!(msg.sender_id, Some(user));
        assert_eq!(msg.couple_id.as_deref(), Some("c1"));

        let reply = AirlockMessage::mediator("c1", "hello both");
        assert_eq!(reply.sender_type, SenderType::Drponz);
        assert!(reply.sender_id.is_none());
        assert_ne!(msg.id, reply.id);
    }

    #[test]
    fn test_to_turn_maps_roles() {
        let user = UserId::parse("u1").unwrap();
        assert_eq!(
            AirlockMessage::user("c1", user, "hi").to_turn().role,
            TurnRole::User
        );
        assert_eq!(
            AirlockMessage::mediator("c1", "hello").to_turn().role,
            TurnRole::Mediator
        );
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(AirlockMessage::mediator("c1", "hello")).unwrap();
        assert_eq!(json["senderType"], "drponz");
        assert_eq!(json["coupleId"], "c1");
        assert!(json["senderId"].is_null());
        assert!(json.get("createdAt").is_some());
    }
}
