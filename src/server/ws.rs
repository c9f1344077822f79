use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::warn;

use crate::sync::{ClientEvent, ServerEvent};

use super::AppState;
use super::auth::Identity;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Close code sent when the upgrade carried a token that failed verification.
const INVALID_TOKEN_CLOSE: u16 = 4001;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // No token means guest access; a present-but-invalid token is rejected
    // after the upgrade with a distinguishable close frame.
    let identity = match query.token.as_deref() {
        None => Ok(Identity::guest()),
        Some(token) => state.verifier.verify(token),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<AppState>,
    identity: Result<Identity, super::auth::AuthError>,
) {
    let identity = match identity {
        Ok(identity) => identity,
        Err(err) => {
            warn!(%err, "rejecting connection with invalid token");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: INVALID_TOKEN_CLOSE,
                    reason: "invalid_token".into(),
                })))
                .await;
            return;
        }
    };
    let (sender, receiver) = socket.split();
    let rx = state.ws_tx.subscribe();
    run_socket_loop(sender, receiver, rx, state, identity).await;
}

/// Core WebSocket loop with ping/pong keepalive.
///
/// Combines broadcast forwarding, client event handling, and periodic
/// ping/pong health checking into a single select loop. Broadcasts are
/// forwarded only for boards this connection has touched, so observers of
/// one board never see another board's traffic. If no Pong is received
/// within [`PONG_TIMEOUT`] after a Ping is sent, the connection is
/// considered dead and the loop exits.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<ServerEvent>,
    state: Arc<AppState>,
    identity: Identity,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;
    let mut observed: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    // Connection is dead — no pong received in time
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Broadcast forwarding ────────────────────────────────
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !observed.contains(event.board_id()) {
                            continue;
                        }
                        let Ok(json) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Missed some messages; the client's next full-state
                        // fetch will cover the gap.
                        continue;
                    }
                }
            }

            // ── Client messages ─────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) =
                            handle_text(&state, &identity, text.as_str(), &mut observed)
                            && sender.send(Message::Text(reply.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Ignore Binary and Ping frames from the client
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best-effort close frame
    let _ = sender.send(Message::Close(None)).await;
}

/// Decode one text frame, run it through the authority, publish any
/// broadcast, and return the serialized direct reply if there is one.
fn handle_text(
    state: &AppState,
    identity: &Identity,
    text: &str,
    observed: &mut HashSet<String>,
) -> Option<String> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "ignoring malformed client frame");
            return None;
        }
    };
    if let Some(board_id) = event.board_id() {
        observed.insert(board_id.to_string());
    }

    let outcome = {
        let mut authority = state.authority.lock().expect("authority mutex poisoned");
        authority.handle(identity, event)
    };
    match outcome {
        Ok(outcome) => {
            if let Some(broadcast) = outcome.broadcast {
                // Ignore error if no receivers
                let _ = state.ws_tx.send(broadcast);
            }
            let reply = outcome.reply?;
            // A fresh board's id is only known from the reply.
            if let ServerEvent::FullState(snapshot) = &reply {
                observed.insert(snapshot.board_id.clone());
            }
            serde_json::to_string(&reply).ok()
        }
        Err(err) => {
            warn!(%err, "event handling failed");
            None
        }
    }
}
