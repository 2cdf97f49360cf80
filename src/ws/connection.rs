//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching subscription commands and forwarding matching audit entries.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{AccountId, AuditLogEntry};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and replies to each.
/// - Forwards committed audit entries that match the subscription.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<AuditLogEntry>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs);
                        let Ok(json) = serde_json::to_string(&reply) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(entry) => {
                        if !subs.matches(&entry) {
                            continue;
                        }
                        let Ok(payload) = serde_json::to_value(&entry) else {
                            continue;
                        };
                        let msg = WsMessage::new(entry.id.to_string(), WsMessageType::Event, payload);
                        let Ok(json) = serde_json::to_string(&msg) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Splits raw ids into parsed account ids and the wildcard flag.
///
/// Unparsable ids are dropped.
fn parse_ids(raw: &[String]) -> (Vec<AccountId>, bool) {
    let mut ids = Vec::new();
    let mut wildcard = false;
    for value in raw {
        if value == "*" {
            wildcard = true;
        } else if let Ok(id) = value.parse::<AccountId>() {
            ids.push(id);
        }
    }
    (ids, wildcard)
}

/// Applies one client message and returns the reply.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> WsMessage {
    let command = match serde_json::from_str::<WsCommand>(text) {
        Ok(command) => command,
        Err(err) => {
            tracing::debug!(error = %err, "rejected ws command");
            return WsMessage::error("", 400, "malformed or unknown command");
        }
    };

    match command {
        WsCommand::Subscribe {
            id,
            account_ids,
            actions,
        } => {
            let (ids, wildcard) = parse_ids(&account_ids);
            subs.subscribe(&ids, wildcard, &actions);
            WsMessage::new(
                id.unwrap_or_default(),
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                    "actions": actions,
                }),
            )
        }
        WsCommand::Unsubscribe { id, account_ids } => {
            let (ids, wildcard) = parse_ids(&account_ids);
            subs.unsubscribe(&ids, wildcard);
            WsMessage::new(
                id.unwrap_or_default(),
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
    }
}
