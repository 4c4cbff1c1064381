use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use secureaws_types::events::ServerEvent;

use crate::session::{EventSink, PROCESS_FAILED, Session};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_HEARTBEATS: u8 = 2;

/// Frames handed from the socket reader to the turn worker.
enum Inbound {
    Text(String),
    Binary(usize),
}

/// Drive one WebSocket connection until either side closes it.
///
/// Three tasks cooperate:
/// - the reader pulls frames off the socket and tracks pongs,
/// - the turn worker handles events strictly one at a time,
/// - the writer serializes outbound events and sends heartbeats.
///
/// A turn that is in flight when the client leaves still runs to completion;
/// its events are simply dropped.
pub async fn handle_connection(socket: WebSocket, session: Session) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    info!("connection {} open", conn_id);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Inbound>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Outbound events + heartbeat -> client
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("connection {}: failed to encode event: {}", conn_id, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= MAX_MISSED_HEARTBEATS {
                            warn!(
                                "connection {}: heartbeat timeout (missed {} pongs), dropping",
                                conn_id, missed_heartbeats
                            );
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = sender.close().await;
    });

    // Sequential turn processing. Owns its own sink clone so it outlives the
    // reader if the client disconnects mid-turn.
    let worker_session = session.clone();
    let worker_tx: EventSink = event_tx.clone();
    tokio::spawn(async move {
        while let Some(inbound) = inbound_rx.recv().await {
            match inbound {
                Inbound::Text(text) => worker_session.handle_text(&text, &worker_tx).await,
                Inbound::Binary(len) => {
                    warn!("connection {}: unexpected binary frame ({} bytes)", conn_id, len);
                    let _ = worker_tx.send(ServerEvent::error(PROCESS_FAILED));
                }
            }
        }
        debug!("connection {}: turn worker finished", conn_id);
    });
    drop(event_tx);

    // Client frames -> turn worker
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("connection {}: transport error: {}", conn_id, e);
                    break;
                }
            };

            let inbound = match msg {
                Message::Text(text) => Inbound::Text(text.as_str().to_owned()),
                Message::Binary(data) => Inbound::Binary(data.len()),
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                    continue;
                }
                Message::Close(_) => break,
                Message::Ping(_) => continue,
            };

            if inbound_tx.send(inbound).is_err() {
                break;
            }
        }
    });

    // Wait for either side to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("connection {} closed", conn_id);
}
