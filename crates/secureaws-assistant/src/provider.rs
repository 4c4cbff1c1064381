use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use secureaws_types::models::{Role, Source};

use crate::error::GenerationError;

/// Speaker of a history turn, in the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl From<Role> for HistoryRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Bot => Self::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

/// Everything a provider needs for one completion.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system_instruction: &'a str,
    /// Oldest first
    pub history: &'a [HistoryTurn],
    pub utterance: &'a str,
}

/// Structured provider output. `sources` is optional because models omit it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedAnswer {
    pub content: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

/// An external text-generation capability.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GeneratedAnswer, GenerationError>;
}
