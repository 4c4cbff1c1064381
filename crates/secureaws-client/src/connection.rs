use std::sync::Arc;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use secureaws_types::events::{ClientEvent, InboundFeedback, InboundMessage, ServerEvent};
use secureaws_types::models::{ConversationId, Feedback, MessageId};

use crate::view::{ChatView, ConnectionState};

enum Outbound {
    Event(ClientEvent),
    Close,
}

/// One chat session against `/ws`. Events arriving from the server are folded
/// into a [`ChatView`] that observers can [`watch`](ChatClient::watch).
pub struct ChatClient {
    view: Arc<watch::Sender<ChatView>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    reader: JoinHandle<()>,
}

impl ChatClient {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (view, _) = watch::channel(ChatView::default());
        let view = Arc::new(view);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .with_context(|| format!("WS connect to {} failed", url))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        view.send_modify(|v| v.connection = ConnectionState::Open);
        info!("connected to {}", url);

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();

        // Client events -> server
        tokio::spawn(async move {
            while let Some(item) = outbound_rx.recv().await {
                let event = match item {
                    Outbound::Event(event) => event,
                    Outbound::Close => break,
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("failed to encode event: {}", e);
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        // Server events -> view
        let reader_view = view.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_rx.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("connection error: {}", e);
                        break;
                    }
                };
                match serde_json::from_str::<ServerEvent>(text.as_str()) {
                    Ok(event) => reader_view.send_modify(|v| v.apply(event)),
                    Err(e) => debug!("ignoring unrecognised frame: {}", e),
                }
            }
            reader_view.send_modify(|v| v.connection = ConnectionState::Closed);
            info!("connection closed");
        });

        Ok(Self {
            view,
            outbound,
            reader,
        })
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> ChatView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ChatView> {
        self.view.subscribe()
    }

    /// Returns false (and sends nothing) unless the connection is open.
    pub fn send_message(
        &self,
        conversation_id: ConversationId,
        content: impl Into<String>,
        user_id: impl Into<String>,
    ) -> bool {
        if !self.view.borrow().is_open() {
            return false;
        }
        self.send(ClientEvent::Message(InboundMessage {
            conversation_id,
            content: content.into(),
            user_id: user_id.into(),
        }))
    }

    /// Rate a message once. The local copy is updated before the server
    /// confirms anything and is never rolled back.
    pub fn send_feedback(&self, message_id: MessageId, feedback: Feedback) -> bool {
        if !self.view.borrow().is_open() {
            return false;
        }
        if !self
            .view
            .send_if_modified(|v| v.patch_feedback(message_id, feedback))
        {
            debug!("message {} is unknown or already rated", message_id);
            return false;
        }
        self.send(ClientEvent::Feedback(InboundFeedback {
            message_id,
            feedback,
        }))
    }

    /// Close the socket. Later sends are dropped.
    pub fn close(&self) {
        self.view
            .send_modify(|v| v.connection = ConnectionState::Closed);
        let _ = self.outbound.send(Outbound::Close);
    }

    fn send(&self, event: ClientEvent) -> bool {
        self.outbound.send(Outbound::Event(event)).is_ok()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
