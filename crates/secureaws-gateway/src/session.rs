use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use secureaws_assistant::{HistoryTurn, ResponseResolver};
use secureaws_db::ConversationStore;
use secureaws_types::events::{ClientEvent, InboundFeedback, InboundMessage, ServerEvent};
use secureaws_types::models::{Message, MessageId, NewMessage, Role};

/// Outbound half of a connection. Sends never block; a closed receiver means
/// the client is gone and the event is dropped.
pub type EventSink = mpsc::UnboundedSender<ServerEvent>;

/// Sent when an inbound event can't be parsed or its user turn can't be stored.
pub const PROCESS_FAILED: &str = "Failed to process message";

/// Sent when a stored user turn gets no bot answer.
pub const GENERATE_FAILED: &str = "Failed to generate response";

/// History turns handed to the resolver.
const HISTORY_TURNS: usize = 5;

/// Stateless relay between inbound client events, the resolver and the store.
/// Cheap to clone; every connection gets its own copy.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn ConversationStore>,
    resolver: Arc<ResponseResolver>,
}

impl Session {
    pub fn new(store: Arc<dyn ConversationStore>, resolver: Arc<ResponseResolver>) -> Self {
        Self { store, resolver }
    }

    /// Parse one text frame and handle it. Malformed frames get an `error` reply.
    pub async fn handle_text(&self, text: &str, out: &EventSink) {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(event, out).await,
            Err(e) => {
                warn!("bad client event: {} -- raw: {}", e, truncate(text, 200));
                emit(out, ServerEvent::error(PROCESS_FAILED));
            }
        }
    }

    pub async fn handle_event(&self, event: ClientEvent, out: &EventSink) {
        match event {
            ClientEvent::Message(msg) => self.handle_chat_message(msg, out).await,
            ClientEvent::Feedback(fb) => self.handle_feedback(fb, out).await,
        }
    }

    /// One turn: store the user message, echo it, then answer between a
    /// `typing=true` / `typing=false` pair. Once typing is on, it is always
    /// turned off again.
    async fn handle_chat_message(&self, msg: InboundMessage, out: &EventSink) {
        let InboundMessage {
            conversation_id,
            content,
            user_id,
        } = msg;

        info!("{} -> conversation {} ({} chars)", user_id, conversation_id, content.len());

        let new = NewMessage {
            conversation_id,
            role: Role::User,
            content,
            sources: None,
        };
        let user_message = match self.run_store(move |store| store.create_message(new)).await {
            Ok(message) => message,
            Err(e) => {
                error!("failed to store user message for conversation {}: {:#}", conversation_id, e);
                emit(out, ServerEvent::error(PROCESS_FAILED));
                return;
            }
        };

        emit(out, ServerEvent::Message((&user_message).into()));
        emit(out, ServerEvent::typing(true));

        if let Err(e) = self.answer(&user_message, out).await {
            error!("no answer for message {}: {:#}", user_message.id, e);
            emit(out, ServerEvent::error(GENERATE_FAILED));
        }

        emit(out, ServerEvent::typing(false));
    }

    async fn answer(&self, user_message: &Message, out: &EventSink) -> anyhow::Result<()> {
        let conversation_id = user_message.conversation_id;
        let messages = self
            .run_store(move |store| store.get_conversation_messages(conversation_id))
            .await?;
        let history = recent_history(&messages, user_message.id);

        let answer = self.resolver.resolve(&user_message.content, &history).await?;

        let new = NewMessage {
            conversation_id,
            role: Role::Bot,
            content: answer.content,
            sources: Some(answer.sources),
        };
        let bot_message = self.run_store(move |store| store.create_message(new)).await?;

        emit(out, ServerEvent::Message((&bot_message).into()));
        Ok(())
    }

    /// No acknowledgement on the socket; unknown ids are logged and ignored.
    async fn handle_feedback(&self, fb: InboundFeedback, out: &EventSink) {
        let InboundFeedback {
            message_id,
            feedback,
        } = fb;

        match self
            .run_store(move |store| store.update_message_feedback(message_id, feedback))
            .await
        {
            Ok(Some(_)) => info!("feedback {} on message {}", feedback.as_str(), message_id),
            Ok(None) => warn!("feedback for unknown message {}", message_id),
            Err(e) => {
                error!("failed to store feedback for message {}: {:#}", message_id, e);
                emit(out, ServerEvent::error(PROCESS_FAILED));
            }
        }
    }

    /// Run a blocking store call off the async runtime.
    async fn run_store<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&dyn ConversationStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
    }
}

/// The last few turns up to and including `current`, oldest first, in
/// provider roles.
fn recent_history(messages: &[Message], current: MessageId) -> Vec<HistoryTurn> {
    let upto: Vec<&Message> = messages.iter().filter(|m| m.id <= current).collect();
    upto[upto.len().saturating_sub(HISTORY_TURNS)..]
        .iter()
        .map(|m| HistoryTurn {
            role: m.role.into(),
            content: m.content.clone(),
        })
        .collect()
}

fn emit(out: &EventSink, event: ServerEvent) {
    if out.send(event).is_err() {
        debug!("client gone, dropping outbound event");
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
