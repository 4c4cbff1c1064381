use anyhow::Result;

use secureaws_types::models::{
    Conversation, ConversationId, Feedback, Message, MessageId, NewMessage,
};

use crate::Database;

/// System of record for conversations and their messages.
///
/// Calls are blocking; async callers run them under `spawn_blocking`.
/// Implementations must keep appends within one conversation in arrival order.
pub trait ConversationStore: Send + Sync {
    fn create_conversation(&self, user_id: &str, title: Option<&str>) -> Result<Conversation>;

    fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>>;

    fn create_message(&self, message: NewMessage) -> Result<Message>;

    /// Oldest first.
    fn get_conversation_messages(&self, id: ConversationId) -> Result<Vec<Message>>;

    /// Returns the updated record, or `None` if no such message exists.
    fn update_message_feedback(&self, id: MessageId, feedback: Feedback) -> Result<Option<Message>>;
}

impl ConversationStore for Database {
    fn create_conversation(&self, user_id: &str, title: Option<&str>) -> Result<Conversation> {
        Database::create_conversation(self, user_id, title)
    }

    fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>> {
        Database::get_conversation(self, id)
    }

    fn create_message(&self, message: NewMessage) -> Result<Message> {
        self.insert_message(&message)
    }

    fn get_conversation_messages(&self, id: ConversationId) -> Result<Vec<Message>> {
        self.get_messages(id)
    }

    fn update_message_feedback(&self, id: MessageId, feedback: Feedback) -> Result<Option<Message>> {
        self.set_feedback(id, feedback)
    }
}
