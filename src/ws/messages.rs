//! WebSocket message types: envelope and client commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::dto::QuoteRequest;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp. Clients may omit it.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server message stamped with the current time.
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
    pub fn error(id: impl Into<String>, code: u32, message: impl Into<String>) -> Self {
        Self::new(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message.into() }),
        )
    }

    /// Serializes the message, falling back to an empty string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands a client can send in the payload of a `command` message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Follow events of specific pairs. Use `["*"]` for all pairs.
    Subscribe {
        /// Pair addresses.
        pair_addresses: Vec<String>,
    },
    /// Stop following pairs. `"*"` clears the wildcard.
    Unsubscribe {
        /// Pair addresses.
        pair_addresses: Vec<String>,
    },
    /// Request a quote; the answer arrives as a `response` message.
    Quote(QuoteRequest),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_subscribe_command() {
        let raw = serde_json::json!({ "command": "subscribe", "pair_addresses": ["*"] });
        let Ok(WsCommand::Subscribe { pair_addresses }) = serde_json::from_value(raw) else {
            panic!("subscribe parses");
        };
        assert_eq!(pair_addresses, vec!["*".to_string()]);
    }

    #[test]
    fn parse_quote_command() {
        let raw = serde_json::json!({
            "command": "quote",
            "token_in": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "token_out": "0x6B175474E89094C44Da98b954EedeAC495271d0F",
            "amount_in": 100.0
        });
        let Ok(WsCommand::Quote(req)) = serde_json::from_value(raw) else {
            panic!("quote parses");
        };
        assert!((req.amount_in - 100.0).abs() < f64::EPSILON);
        assert!(req.provider.is_none());
    }

    #[test]
    fn client_envelope_without_timestamp() {
        let raw = r#"{"id":"7","type":"command",
            "payload":{"command":"unsubscribe","pair_addresses":[]}}"#;
        let Ok(msg) = serde_json::from_str::<WsMessage>(raw) else {
            panic!("envelope parses");
        };
        assert_eq!(msg.msg_type, WsMessageType::Command);
        assert_eq!(msg.id, "7");
    }

    #[test]
    fn error_envelope_shape() {
        let json = WsMessage::error("abc", 400, "malformed JSON").to_json();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("malformed JSON"));
    }
}
