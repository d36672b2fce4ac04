//! Error types for the gesture-link system.
//!
//! Every failure is structured and recoverable. The pipeline handles each
//! kind at the boundary where it occurs, so none of them ends the control
//! loop; only the shutdown signal does.

use thiserror::Error;

/// Top-level error type for operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Vector: malformed finger-state input
/// - Transport: endpoint, connection or acknowledgement failures
/// - Pose: the external pose extractor failed for one frame
/// - I/O: socket binding and similar local operations
#[derive(Debug, Error)]
pub enum Error {
    /// Finger-state input could not be turned into a vector
    #[error("invalid finger-state vector: {0}")]
    InvalidVector(#[from] InvalidVectorError),

    /// Command delivery failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Pose extraction failed
    #[error("pose extraction error: {0}")]
    Pose(#[from] PoseError),

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Malformed finger-state input.
///
/// Raised by the codec before anything reaches the state machine; the frame
/// that produced it is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidVectorError {
    /// Input did not hold exactly one digit per finger
    #[error("expected {expected} digits, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// A digit other than 0 or 1
    #[error("digit {value} at position {position} is not 0 or 1")]
    InvalidDigit { position: usize, value: u8 },

    /// A character other than '0' or '1' in a textual vector
    #[error("character {value:?} at position {position} is not '0' or '1'")]
    InvalidChar { position: usize, value: char },
}

/// Command delivery failures.
///
/// All variants are non-fatal: the caller logs them and drops the gesture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint reference could not be used; no connection was attempted
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Connecting (including the WebSocket handshake) failed or timed out
    #[error("connect to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// Connected, but no acknowledgement frame was observed
    #[error("no acknowledgement from {endpoint}: {reason}")]
    NoAck { endpoint: String, reason: String },
}

impl TransportError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::InvalidEndpoint { .. } => "invalid-endpoint",
            TransportError::ConnectFailed { .. } => "connect-failed",
            TransportError::NoAck { .. } => "no-ack",
        }
    }
}

/// Failures reported by a pose source for a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseError {
    /// The capture device did not deliver a frame
    #[error("capture failed: {0}")]
    Capture(String),

    /// The landmark model failed on a captured frame
    #[error("landmark extraction failed: {0}")]
    Extraction(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_kind() {
        let err = TransportError::NoAck {
            endpoint: "ws://127.0.0.1:81/ws".into(),
            reason: "closed".into(),
        };
        assert_eq!(err.kind(), "no-ack");
        assert!(err.to_string().contains("ws://127.0.0.1:81/ws"));
    }

    #[test]
    fn test_error_from_conversions() {
        let err: Error = InvalidVectorError::WrongLength {
            expected: 5,
            actual: 3,
        }
        .into();
        assert!(matches!(err, Error::InvalidVector(_)));
        assert_eq!(
            err.to_string(),
            "invalid finger-state vector: expected 5 digits, got 3"
        );

        let err: Error = PoseError::Capture("device busy".into()).into();
        assert!(matches!(err, Error::Pose(_)));
    }
}
