//! WebSocket transport for bridge calls and scene events

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use magicscript_bridge::{BridgeCall, CommandError, DispatchError};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Frames sent in reply to the client itself
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WsReply {
    Pong,
    Rejected { error: String },
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.subscribe();

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            // Forward scene events to client
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(skipped = n, "Scene event channel lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Scene event channel closed");
                        break;
                    }
                }
            }

            // Bridge calls from client
            msg = receiver.next() => {
                let reply = match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        None
                    }
                    Some(Ok(Message::Text(text))) => {
                        if text.as_str() == "ping" {
                            Some(WsReply::Pong)
                        } else {
                            match handle_call(&state, text.as_str()) {
                                Ok(()) => None,
                                Err(DispatchError::Closed) => {
                                    info!("Scene dispatcher closed, dropping client");
                                    break;
                                }
                                Err(e) => Some(WsReply::Rejected { error: e.to_string() }),
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => None,
                };

                if let Some(reply) = reply {
                    if let Ok(json) = serde_json::to_string(&reply) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

/// Parse and queue one bridge call frame
fn handle_call(state: &AppState, text: &str) -> Result<(), DispatchError> {
    let call: BridgeCall = match serde_json::from_str(text) {
        Ok(call) => call,
        Err(e) => {
            debug!(error = %e, "Malformed bridge call");
            return Err(CommandError::Malformed(e.to_string()).into());
        }
    };
    state.dispatcher.submit_call(call)
}
