use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConversationId, Feedback, Message, MessageId, Role, Source};

/// Events sent FROM client TO server over the `/ws` socket.
///
/// Wire shape is `{"type": "...", "data": {...}}`. Payloads with fields that
/// don't belong to their tag are rejected rather than passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    /// A user utterance for a conversation
    Message(InboundMessage),

    /// Thumbs up/down on a previously delivered message
    Feedback(InboundFeedback),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InboundMessage {
    pub conversation_id: ConversationId,
    pub content: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InboundFeedback {
    pub message_id: MessageId,
    pub feedback: Feedback,
}

/// Events sent FROM server TO client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A persisted message: the echoed user turn or the bot answer
    Message(OutboundMessage),

    /// Typing indicator for the bot
    Typing(TypingState),

    /// Human-readable failure for the current turn
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn typing(is_typing: bool) -> Self {
        Self::Typing(TypingState { is_typing })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub id: MessageId,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for OutboundMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id,
            role: msg.role,
            content: msg.content.clone(),
            sources: msg.sources.clone(),
            feedback: msg.feedback,
            timestamp: msg.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingState {
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_message() {
        let raw = json!({
            "type": "message",
            "data": { "conversationId": 1, "content": "How do I secure my VPC?", "userId": "anonymous" }
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::Message(InboundMessage {
                conversation_id: 1,
                content: "How do I secure my VPC?".into(),
                user_id: "anonymous".into(),
            })
        );
    }

    #[test]
    fn parses_client_feedback() {
        let raw = r#"{"type":"feedback","data":{"messageId":7,"feedback":"positive"}}"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::Feedback(InboundFeedback {
                message_id: 7,
                feedback: Feedback::Positive,
            })
        );
    }

    #[test]
    fn rejects_payload_shaped_for_another_tag() {
        // feedback payload under the message tag
        let raw = r#"{"type":"message","data":{"messageId":7,"feedback":"positive"}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());

        let raw = r#"{"type":"message","data":{"conversationId":1,"content":"hi","userId":"a","extra":true}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn rejects_server_only_tags_from_client() {
        let raw = r#"{"type":"typing","data":{"isTyping":true}}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }

    #[test]
    fn typing_event_wire_shape() {
        let json = serde_json::to_value(ServerEvent::typing(true)).unwrap();
        assert_eq!(json, json!({ "type": "typing", "data": { "isTyping": true } }));
    }

    #[test]
    fn user_echo_omits_absent_sources() {
        let event = ServerEvent::Message(OutboundMessage {
            id: 3,
            role: Role::User,
            content: "hello".into(),
            sources: None,
            feedback: None,
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["type"], "user");
        assert!(json["data"].get("sources").is_none());
        assert!(json["data"].get("feedback").is_none());
    }
}
