use anyhow::Context;
use reqwest::Client;

use secureaws_types::api::{CreateConversationRequest, QuickAction};
use secureaws_types::models::{Conversation, ConversationId, Message};

/// Identity used by the chat window until sign-in exists.
pub const ANONYMOUS_USER: &str = "anonymous";
pub const DEFAULT_TITLE: &str = "AWS Security Chat";

/// REST side of the server: conversations and quick actions.
#[derive(Debug, Clone)]
pub struct ChatApi {
    client: Client,
    base_url: String,
}

impl ChatApi {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The `/ws` endpoint on the same host.
    pub fn ws_url(&self) -> String {
        format!(
            "{}/ws",
            self.base_url
                .replacen("https://", "wss://", 1)
                .replacen("http://", "ws://", 1)
        )
    }

    pub async fn create_conversation(
        &self,
        user_id: Option<&str>,
        title: Option<&str>,
    ) -> anyhow::Result<Conversation> {
        let body = CreateConversationRequest {
            user_id: user_id.map(str::to_string),
            title: title.map(str::to_string),
        };
        let conversation = self
            .client
            .post(format!("{}/api/conversations", self.base_url))
            .json(&body)
            .send()
            .await
            .context("create conversation request failed")?
            .error_for_status()?
            .json()
            .await
            .context("malformed conversation")?;
        Ok(conversation)
    }

    /// What the chat window does when it opens: a fresh anonymous conversation.
    pub async fn start_conversation(&self) -> anyhow::Result<Conversation> {
        self.create_conversation(Some(ANONYMOUS_USER), Some(DEFAULT_TITLE))
            .await
    }

    pub async fn quick_actions(&self) -> anyhow::Result<Vec<QuickAction>> {
        let actions = self
            .client
            .get(format!("{}/api/quick-actions", self.base_url))
            .send()
            .await
            .context("quick actions request failed")?
            .error_for_status()?
            .json()
            .await
            .context("malformed quick actions")?;
        Ok(actions)
    }

    pub async fn messages(&self, conversation_id: ConversationId) -> anyhow::Result<Vec<Message>> {
        let messages = self
            .client
            .get(format!(
                "{}/api/conversations/{}/messages",
                self.base_url, conversation_id
            ))
            .send()
            .await
            .context("messages request failed")?
            .error_for_status()?
            .json()
            .await
            .context("malformed message list")?;
        Ok(messages)
    }
}
