//! WebSocket message types: envelope and client commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ActionType;

/// Top-level message envelope for everything the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Echoes the client-provided id for responses; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a message stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error message with a numeric code.
    #[must_use]
    pub fn error(id: impl Into<String>, code: u16, message: &str) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }
}

/// Discriminator for server messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Reply to a client command.
    Response,
    /// A committed audit entry matching the subscription.
    Event,
    /// Malformed or unknown command.
    Error,
}

/// Commands a client can send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Start receiving audit entries.
    Subscribe {
        /// Optional correlation id echoed in the response.
        #[serde(default)]
        id: Option<String>,
        /// Account ids to follow. `["*"]` follows every account.
        account_ids: Vec<String>,
        /// Restrict to these actions; empty means all actions.
        #[serde(default)]
        actions: Vec<ActionType>,
    },
    /// Stop following some accounts.
    Unsubscribe {
        /// Optional correlation id echoed in the response.
        #[serde(default)]
        id: Option<String>,
        /// Account ids to drop. `"*"` clears the wildcard.
        account_ids: Vec<String>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscribe_with_action_filter() {
        let raw = r#"{"command":"subscribe","account_ids":["*"],"actions":["auto_delete"]}"#;
        let Ok(WsCommand::Subscribe {
            id,
            account_ids,
            actions,
        }) = serde_json::from_str::<WsCommand>(raw)
        else {
            panic!("subscribe not parsed");
        };
        assert!(id.is_none());
        assert_eq!(account_ids, vec!["*".to_string()]);
        assert_eq!(actions, vec![ActionType::AutoDelete]);
    }

    #[test]
    fn unknown_command_fails_to_parse() {
        assert!(serde_json::from_str::<WsCommand>(r#"{"command":"purge"}"#).is_err());
    }
}
