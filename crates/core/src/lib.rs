//! gesture-link-core: debounced hand-gesture signaling for a remote hand
//!
//! This library turns a per-frame finger-state signal from a camera-based
//! hand tracker into stable, rate-limited commands for a WebSocket-connected
//! actuator:
//! - Derives a 5-bit finger-state vector from hand landmarks
//! - Confirms a new gesture only once it is stable and the cooldown elapsed
//! - Encodes the confirmed gesture as a complemented text command
//! - Delivers it over a fresh connection and observes one acknowledgement
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `finger`: Finger-state bit vector codec
//! - `pose`: Landmark rule and the pose-source seam
//! - `debounce`: Debounce/cooldown state machine
//! - `command`: Wire payloads
//! - `transport`: One-shot WebSocket client
//! - `pipeline`: The control loop
//! - `actuator`: Loopback actuator for bench runs and tests
//! - `metrics`: Observable loop behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and handled where they occur
//! - **Bounded waits**: Every network operation has a timeout
//! - **Single writer**: Gesture state is owned by the loop, never shared
//! - **Observable**: Every frame is accounted for in metrics

pub mod actuator;
pub mod command;
pub mod debounce;
pub mod error;
pub mod finger;
pub mod metrics;
pub mod pipeline;
pub mod pose;
pub mod transport;

// Re-export commonly used types
pub use command::{AckPayload, CommandMessage};
pub use debounce::{DebounceConfig, GateStatus, GestureGate};
pub use error::{Error, Result};
pub use finger::FingerStateVector;
pub use pipeline::{FrameOutcome, Pipeline};
pub use transport::{Transport, TransportConfig, WsTransport};
