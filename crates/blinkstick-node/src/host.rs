//! Host runtime seam: inbound messages and the warn/error log channel.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message delivered by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Color or command, usually a string
    #[serde(default)]
    pub payload: Value,

    /// Any other message properties, carried but unused
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Creates a message with the given payload.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            extra: Map::new(),
        }
    }
}

/// Warning and error channel shown in the host's log and UI.
pub trait NodeLog: Send {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Logs through `tracing`, tagged with the node name.
#[derive(Debug, Clone)]
pub struct TracingLog {
    node: String,
}

impl TracingLog {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl NodeLog for TracingLog {
    fn warn(&self, message: &str) {
        tracing::warn!(node = %self.node, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(node = %self.node, "{}", message);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keeps_extra_fields() {
        let msg: Message =
            serde_json::from_str(r#"{"payload": "red", "topic": "alerts"}"#).unwrap();
        assert_eq!(msg.payload, Value::from("red"));
        assert_eq!(msg.extra.get("topic"), Some(&Value::from("alerts")));
    }

    #[test]
    fn test_message_without_payload() {
        let msg: Message = serde_json::from_str(r#"{"topic": "x"}"#).unwrap();
        assert_eq!(msg.payload, Value::Null);
    }
}
