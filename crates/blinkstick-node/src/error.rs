//! Error types for the flow node.

use thiserror::Error;

/// Result type alias using our error type.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors surfaced by the node. None of them are fatal.
#[derive(Error, Debug)]
pub enum NodeError {
    /// No device matched the configured serial, or no device at all.
    #[error("{}", not_found_message(.serial))]
    DeviceNotFound { serial: Option<String> },

    /// The message payload cannot be turned into a color.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The device library refused to start an animation.
    #[error("BlinkStick missing ? {0}")]
    Dispatch(#[from] blinkstick_hw::Error),

    /// Task name is not one of set, pulse, morph or blink.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// The node was closed and accepts no more input.
    #[error("Node is closed")]
    Closed,
}

fn not_found_message(serial: &Option<String>) -> String {
    match serial {
        Some(serial) => format!("BlinkStick with serial number {} not found", serial),
        None => "No BlinkStick found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        let err = NodeError::DeviceNotFound {
            serial: Some("BS000001-3.0".into()),
        };
        assert_eq!(
            err.to_string(),
            "BlinkStick with serial number BS000001-3.0 not found"
        );
        let err = NodeError::DeviceNotFound { serial: None };
        assert_eq!(err.to_string(), "No BlinkStick found");
    }

    #[test]
    fn test_dispatch_message() {
        let err = NodeError::from(blinkstick_hw::Error::NotFound);
        assert_eq!(err.to_string(), "BlinkStick missing ? BlinkStick not found");
    }
}
