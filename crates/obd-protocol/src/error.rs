//! OBD-II Error Types

use crate::decode::DecodeRule;
use crate::protocol::ObdProtocol;
use crate::state::ConnectionState;
use thiserror::Error;

/// Errors raised by a byte-stream transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote end refused the connection
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// The requested device does not exist or is not reachable
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Read or write failure on an open link
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed by the remote end
    #[error("Link closed by adapter")]
    Closed,

    /// Operation attempted before `connect`
    #[error("Transport is not connected")]
    NotConnected,
}

/// Per-PID decoding failures. Never fatal to a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Payload shorter than the rule requires
    #[error("Payload too short: expected {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },

    /// Value outside the rule's defined domain (e.g. undefined fuel type code)
    #[error("Value {value:#04X} is outside the domain of {rule:?}")]
    OutOfDomain { rule: DecodeRule, value: u32 },

    /// Rule has no decoder
    #[error("No decoder for rule {0:?}")]
    UnsupportedRule(DecodeRule),

    /// Unit-and-scaling id not in the table
    #[error("Unknown unit and scaling id {0:#04X}")]
    UnknownUas(u8),

    /// Batched response echoed a different PID than the one requested
    #[error("PID echo mismatch: expected {expected:02X}, got {actual:02X}")]
    PidMismatch { expected: u8, actual: u8 },

    /// Rule decoded fine but does not yield a numeric measurement
    #[error("{0:?} does not produce a measurement")]
    NotAMeasurement(DecodeRule),
}

/// Errors that can occur during OBD-II communication
#[derive(Debug, Error)]
pub enum ObdError {
    /// Transport failure, wrapped with the operation that was attempted
    #[error("Transport error during {operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: TransportError,
    },

    /// Timeout waiting for the adapter
    #[error("Timeout during {operation} after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Adapter answered but the vehicle had nothing to report
    #[error("No data returned by vehicle")]
    NoData,

    /// Adapter did not understand the command (`?`)
    #[error("Adapter rejected command {command}")]
    AdapterRejected { command: String },

    /// Adapter reported a bus or vehicle error (`UNABLE TO CONNECT`, `CAN ERROR`, ...)
    #[error("Adapter error for {command}: {message}")]
    AdapterError { command: String, message: String },

    /// Invalid response from adapter
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Protocol has no frame parser (e.g. automatic selection)
    #[error("Protocol not supported: {0}")]
    UnsupportedProtocol(String),

    /// Every candidate protocol failed its probe
    #[error("No adapter/vehicle protocol found (tried {tried:?})")]
    ProtocolNotFound { tried: Vec<ObdProtocol> },

    /// Retries exhausted for a command
    #[error("Command {command} failed after {attempts} attempt(s): {source}")]
    CommandFailed {
        command: String,
        attempts: u32,
        #[source]
        source: Box<ObdError>,
    },

    /// Connecting to the adapter failed or timed out
    #[error("Adapter connection failed: {0}")]
    AdapterConnection(#[source] Box<ObdError>),

    /// Operation needs a session in a different state
    #[error("Not connected (state: {0})")]
    NotConnected(ConnectionState),

    /// Payload could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ObdError {
    pub(crate) fn transport(operation: impl Into<String>, source: TransportError) -> Self {
        ObdError::Transport {
            operation: operation.into(),
            source,
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ObdError::Timeout { .. } => true,
            ObdError::Transport { source, .. } => {
                !matches!(source, TransportError::Closed | TransportError::NotConnected)
            }
            _ => false,
        }
    }

    /// Failures after which the session cannot continue
    pub fn is_fatal(&self) -> bool {
        match self {
            ObdError::Transport { source, .. } => {
                matches!(source, TransportError::Closed | TransportError::NotConnected)
            }
            ObdError::CommandFailed { .. } | ObdError::ProtocolNotFound { .. } => true,
            ObdError::AdapterConnection(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let timeout = ObdError::Timeout {
            operation: "010C".into(),
            after_ms: 100,
        };
        assert!(timeout.is_retryable());
        assert!(!ObdError::NoData.is_retryable());
        assert!(!ObdError::transport("read", TransportError::Closed).is_retryable());
        assert!(ObdError::transport("read", TransportError::Closed).is_fatal());
        assert!(ObdError::transport("read", TransportError::Serial("framing".into())).is_retryable());
    }

    #[test]
    fn test_not_connected_link_is_not_retried() {
        let err = ObdError::transport("write 010C", TransportError::NotConnected);
        assert!(!err.is_retryable());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_command_failed_keeps_source() {
        let err = ObdError::CommandFailed {
            command: "0100".into(),
            attempts: 3,
            source: Box::new(ObdError::Timeout {
                operation: "0100".into(),
                after_ms: 2000,
            }),
        };
        let text = err.to_string();
        assert!(text.contains("0100"));
        assert!(text.contains("3 attempt"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
