use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ConversationId = i64;
pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who authored a message. Serialized as `user` / `bot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Knowledge category a bot answer drew from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    AwsWaf,
    Confluence,
    General,
}

/// Provenance tag attached to bot messages. Immutable once attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub category: SourceCategory,
}

impl Source {
    pub fn new(name: &str, color: &str, category: SourceCategory) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            category,
        }
    }

    pub fn aws_waf() -> Self {
        Self::new("AWS WAF", "blue", SourceCategory::AwsWaf)
    }

    pub fn confluence() -> Self {
        Self::new("Confluence", "purple", SourceCategory::Confluence)
    }

    pub fn general() -> Self {
        Self::new("General", "gray", SourceCategory::General)
    }
}

/// A persisted chat message. Messages of a conversation are append-only and
/// ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub sources: Option<Vec<Source>>,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

/// Fields the caller supplies when appending a message; the store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub sources: Option<Vec<Source>>,
}
