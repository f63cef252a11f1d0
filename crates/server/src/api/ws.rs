//! WebSocket relay of call lifecycle updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use creatorflow_core::CallSnapshot;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// WebSocket message sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// The call manager state changed.
    CallUpdate { snapshot: CallSnapshot },
    /// A conversation record was rewritten and should be reloaded.
    ConversationChanged { context_id: String },
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::CallUpdate { .. } => "call_update",
            WsMessage::ConversationChanged { .. } => "conversation_changed",
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // No receivers is fine.
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }

    /// Forward a call snapshot, plus a reload hint when stored data changed.
    pub fn call_snapshot(&self, snapshot: &CallSnapshot) {
        if snapshot.data_changed {
            if let Some(ref context_id) = snapshot.changed_context_id {
                self.broadcast(WsMessage::ConversationChanged {
                    context_id: context_id.clone(),
                });
            }
        }
        self.broadcast(WsMessage::CallUpdate {
            snapshot: snapshot.clone(),
        });
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &WsMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => {
            WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
            sender.send(Message::Text(json.into())).await.is_ok()
        }
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            true
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so no update falls in between.
    let mut rx = state.ws_broadcaster().subscribe();
    let current = state.calls().snapshot();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        if !send_json(&mut sender, &WsMessage::CallUpdate { snapshot: current }).await {
            return;
        }

        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if !send_json(&mut sender, &msg).await {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, skipped {} messages", n);
                    WS_LAG_EVENTS.inc();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}
