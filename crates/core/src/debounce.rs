//! Debounce and cooldown gate for gesture confirmation.
//!
//! The gate accepts one `GestureEvent` per frame with a hand in view and
//! confirms at most one gesture per cooldown window. Two timers guard
//! against two noise sources:
//!
//! - **Debounce delay**: a new vector only counts if at least this long has
//!   passed since the last confirmation; absorbs frame-to-frame jitter.
//! - **Cooldown**: hard minimum spacing between confirmed commands, whatever
//!   the input does; protects the actuator from command storms.
//!
//! # States
//!
//! ```text
//!            confirm
//!   Ready ------------> Cooling
//!     ^                    |
//!     +--------------------+
//!        t >= cooldown_until
//! ```
//!
//! # Recent Log
//!
//! Confirmed vectors are kept in a short log (capacity 10). Once an
//! eleventh confirmation overflows it, the next processed event clears it
//! completely and is then confirmed unconditionally, as if it were the first
//! observation ever. This reproduces the behavior of the controller this
//! replaces; a sliding window would be the conventional choice.
//!
//! # Thread Safety
//!
//! Not thread-safe. The pipeline owns the gate and is its only writer.

use crate::error::{Error, Result};
use crate::finger::FingerStateVector;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Time since the pipeline started. `Duration::ZERO` means "never".
pub type Timestamp = Duration;

/// Capacity of the recent-gesture log.
pub const RECENT_LOG_CAPACITY: usize = 10;

/// Timer settings for the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceConfig {
    /// Minimum time since the last confirmation before a new vector counts
    pub debounce_delay: Duration,

    /// Minimum spacing between two confirmations
    pub cooldown: Duration,
}

impl DebounceConfig {
    /// Build a config from seconds, as operators specify them.
    ///
    /// # Errors
    /// `Error::Config` for negative, NaN or infinite values.
    pub fn from_secs(debounce_delay: f64, cooldown: f64) -> Result<Self> {
        Ok(Self {
            debounce_delay: secs("debounce delay", debounce_delay)?,
            cooldown: secs("cooldown", cooldown)?,
        })
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(500),
            cooldown: Duration::from_millis(500),
        }
    }
}

fn secs(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| {
            Error::Config(format!(
                "{name} must be a non-negative number of seconds ({value}): {e}"
            ))
        })
}

/// A finger-state observation from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureEvent {
    pub vector: FingerStateVector,
    pub observed_at: Timestamp,
}

impl GestureEvent {
    pub fn new(vector: FingerStateVector, observed_at: Timestamp) -> Self {
        Self {
            vector,
            observed_at,
        }
    }
}

/// Gate phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    /// Eligible to confirm a new gesture
    Ready,
    /// A confirmation happened less than the cooldown ago
    Cooling,
}

/// Operator-facing gate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Ready,
    Cooling { remaining: Duration },
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Ready => f.write_str("Ready"),
            GateStatus::Cooling { remaining } => {
                write!(f, "Wait {:.1}s", remaining.as_secs_f64())
            }
        }
    }
}

/// Outcome of feeding one event to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Accepted; forward for transmission
    Confirmed(GestureEvent),
    /// Dropped: still inside the cooldown window
    Cooling,
    /// Dropped: same vector as the last confirmed one
    Unchanged,
    /// Dropped: different vector, but the debounce delay has not elapsed
    Debouncing,
}

impl GateDecision {
    /// The confirmed event, if any.
    pub fn confirmed(&self) -> Option<GestureEvent> {
        match self {
            GateDecision::Confirmed(event) => Some(*event),
            _ => None,
        }
    }
}

/// Mutable record behind the gate.
///
/// # Invariants
/// - `last_confirmed_at <= cooldown_until`
/// - `recent_log.len() <= RECENT_LOG_CAPACITY + 1`; an overflowing log is
///   cleared before the next decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceState {
    /// Last vector that was accepted and sent
    pub last_confirmed: Option<FingerStateVector>,

    /// When it was accepted (`Duration::ZERO` = never)
    pub last_confirmed_at: Timestamp,

    /// Earliest time a new confirmation may occur
    pub cooldown_until: Timestamp,

    /// Recently confirmed vectors, oldest first
    pub recent_log: VecDeque<FingerStateVector>,

    /// Current phase
    pub phase: GatePhase,
}

impl DebounceState {
    fn new() -> Self {
        Self {
            last_confirmed: None,
            last_confirmed_at: Duration::ZERO,
            cooldown_until: Duration::ZERO,
            recent_log: VecDeque::with_capacity(RECENT_LOG_CAPACITY + 1),
            phase: GatePhase::Ready,
        }
    }
}

impl Default for DebounceState {
    fn default() -> Self {
        Self::new()
    }
}

/// The debounce/cooldown state machine.
#[derive(Debug, Clone)]
pub struct GestureGate {
    config: DebounceConfig,
    state: DebounceState,
}

impl GestureGate {
    /// Create a gate in the `Ready` phase with an empty log.
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            state: DebounceState::new(),
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn phase(&self) -> GatePhase {
        self.state.phase
    }

    /// Feed one observation.
    ///
    /// # Behavior
    /// 1. Cooling ends once `observed_at >= cooldown_until`.
    /// 2. While Cooling, the event is dropped.
    /// 3. An overflowing log (more than `RECENT_LOG_CAPACITY` entries) is
    ///    cleared.
    /// 4. With an empty log the event is confirmed outright; otherwise it is
    ///    confirmed only if it differs from the last logged vector and the
    ///    debounce delay has elapsed since the last confirmation.
    pub fn observe(&mut self, event: GestureEvent) -> GateDecision {
        let now = event.observed_at;

        if self.state.phase == GatePhase::Cooling && now >= self.state.cooldown_until {
            self.state.phase = GatePhase::Ready;
        }

        if self.state.phase != GatePhase::Ready {
            return GateDecision::Cooling;
        }

        if self.state.recent_log.len() > RECENT_LOG_CAPACITY {
            self.state.recent_log.clear();
        }

        let decision = match self.state.recent_log.back() {
            None => GateDecision::Confirmed(event),
            Some(last) if *last == event.vector => GateDecision::Unchanged,
            Some(_) => {
                let since_last = now.saturating_sub(self.state.last_confirmed_at);
                if since_last >= self.config.debounce_delay {
                    GateDecision::Confirmed(event)
                } else {
                    GateDecision::Debouncing
                }
            }
        };

        if let GateDecision::Confirmed(event) = decision {
            self.confirm(event);
        }

        decision
    }

    fn confirm(&mut self, event: GestureEvent) {
        self.state.recent_log.push_back(event.vector);
        self.state.last_confirmed = Some(event.vector);
        self.state.last_confirmed_at = event.observed_at;
        self.state.cooldown_until = event.observed_at.saturating_add(self.config.cooldown);
        self.state.phase = GatePhase::Cooling;
    }

    /// Status for display at time `now`.
    pub fn status(&self, now: Timestamp) -> GateStatus {
        match self.state.phase {
            GatePhase::Cooling if now < self.state.cooldown_until => GateStatus::Cooling {
                remaining: self.state.cooldown_until - now,
            },
            _ => GateStatus::Ready,
        }
    }
}
