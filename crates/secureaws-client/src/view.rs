use tracing::warn;

use secureaws_types::events::{OutboundMessage, ServerEvent};
use secureaws_types::models::{Feedback, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What the chat window shows: transcript, typing indicator and link status.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub connection: ConnectionState,
    pub messages: Vec<OutboundMessage>,
    pub is_typing: bool,
}

impl Default for ChatView {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Connecting,
            messages: Vec::new(),
            is_typing: false,
        }
    }
}

impl ChatView {
    pub fn is_open(&self) -> bool {
        self.connection == ConnectionState::Open
    }

    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Message(msg) => self.messages.push(msg),
            ServerEvent::Typing(state) => self.is_typing = state.is_typing,
            ServerEvent::Error(err) => warn!("server reported: {}", err.message),
        }
    }

    /// A message can be rated once, and only if we've seen it.
    pub fn can_rate(&self, message_id: MessageId) -> bool {
        self.messages
            .iter()
            .any(|m| m.id == message_id && m.feedback.is_none())
    }

    /// Record feedback locally. Returns false if the message is unknown or
    /// already rated.
    pub fn patch_feedback(&mut self, message_id: MessageId, feedback: Feedback) -> bool {
        match self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.feedback.is_none())
        {
            Some(msg) => {
                msg.feedback = Some(feedback);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use secureaws_types::models::Role;

    use super::*;

    fn bot(id: MessageId) -> ServerEvent {
        ServerEvent::Message(OutboundMessage {
            id,
            role: Role::Bot,
            content: "<p>answer</p>".into(),
            sources: None,
            feedback: None,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn messages_append_in_arrival_order() {
        let mut view = ChatView::default();
        view.apply(bot(2));
        view.apply(bot(1));
        let ids: Vec<_> = view.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, [2, 1]);
    }

    #[test]
    fn typing_is_last_write_wins() {
        let mut view = ChatView::default();
        view.apply(ServerEvent::typing(true));
        assert!(view.is_typing);
        view.apply(ServerEvent::typing(true));
        view.apply(ServerEvent::typing(false));
        assert!(!view.is_typing);
    }

    #[test]
    fn error_leaves_view_untouched() {
        let mut view = ChatView::default();
        view.apply(bot(1));
        let before = view.clone();
        view.apply(ServerEvent::error("Failed to generate response"));
        assert_eq!(view, before);
    }

    #[test]
    fn feedback_is_set_at_most_once() {
        let mut view = ChatView::default();
        view.apply(bot(5));

        assert!(view.can_rate(5));
        assert!(view.patch_feedback(5, Feedback::Positive));
        assert!(!view.can_rate(5));
        assert!(!view.patch_feedback(5, Feedback::Negative));
        assert_eq!(view.messages[0].feedback, Some(Feedback::Positive));
    }

    #[test]
    fn unknown_message_cannot_be_rated() {
        let mut view = ChatView::default();
        assert!(!view.can_rate(9));
        assert!(!view.patch_feedback(9, Feedback::Negative));
    }
}
