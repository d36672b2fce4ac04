//! The control loop: pose frames in, actuator commands out.
//!
//! Each iteration pulls one frame from the pose source, turns the detected
//! hand into a finger-state vector, feeds it to the gate, and on
//! confirmation sends the complemented command through the transport.
//!
//! # Design
//!
//! - **Single writer**: the pipeline owns the gate; nothing else mutates it
//! - **Bounded iterations**: transport calls are limited by their own
//!   timeouts, so a dead actuator slows the loop but never stalls it
//! - **Errors stay local**: extractor, codec and transport failures are
//!   logged and counted; only the shutdown future ends the loop
//! - **Status**: published on a `watch` channel for whatever renders it

use crate::command::{AckPayload, CommandMessage};
use crate::debounce::{
    DebounceConfig, GateDecision, GatePhase, GateStatus, GestureEvent, GestureGate, Timestamp,
};
use crate::error::{InvalidVectorError, PoseError, TransportError};
use crate::finger::FingerStateVector;
use crate::metrics::PipelineMetrics;
use crate::pose::{HandDetection, PoseSource};
use crate::transport::Transport;
use std::future::Future;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No hand in view
    NoHand,
    /// The pose source failed; treated as no hand
    SourceError,
    /// The detection did not yield a valid vector
    InvalidVector(InvalidVectorError),
    /// Dropped by the gate during cooldown
    Cooling,
    /// Dropped by the gate: same as the last confirmed gesture
    Unchanged,
    /// Dropped by the gate: debounce delay not yet elapsed
    Debouncing,
    /// Confirmed and acknowledged
    Delivered {
        gesture: FingerStateVector,
        command: CommandMessage,
        ack: AckPayload,
    },
    /// Confirmed, but the command was dropped on the way
    DeliveryFailed {
        gesture: FingerStateVector,
        command: CommandMessage,
        error: TransportError,
    },
}

impl FrameOutcome {
    /// Whether the gate confirmed a gesture on this frame.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self,
            FrameOutcome::Delivered { .. } | FrameOutcome::DeliveryFailed { .. }
        )
    }
}

/// Drives a pose source through the gate into a transport.
pub struct Pipeline<S, T> {
    source: S,
    transport: T,
    endpoint: String,
    gate: GestureGate,
    metrics: PipelineMetrics,
    started: Instant,
    last_phase: GatePhase,
    status: watch::Sender<GateStatus>,
}

impl<S: PoseSource, T: Transport> Pipeline<S, T> {
    /// Create a pipeline; its clock starts now.
    pub fn new(
        source: S,
        transport: T,
        endpoint: impl Into<String>,
        config: DebounceConfig,
    ) -> Self {
        let (status, _) = watch::channel(GateStatus::Ready);
        Self {
            source,
            transport,
            endpoint: endpoint.into(),
            gate: GestureGate::new(config),
            metrics: PipelineMetrics::new(),
            started: Instant::now(),
            last_phase: GatePhase::Ready,
            status,
        }
    }

    /// Receive status updates (`Ready` / `Wait 0.3s`).
    pub fn subscribe_status(&self) -> watch::Receiver<GateStatus> {
        self.status.subscribe()
    }

    pub fn gate(&self) -> &GestureGate {
        &self.gate
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Time on the pipeline clock.
    pub fn elapsed(&self) -> Timestamp {
        self.started.elapsed()
    }

    /// Run until `shutdown` resolves, then release the pose source.
    ///
    /// Shutdown is observed between frames; a send already in progress
    /// finishes (or times out) first.
    pub async fn run_until<F>(&mut self, shutdown: F) -> PipelineMetrics
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(endpoint = %self.endpoint, "pipeline started");

        loop {
            let frame = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                frame = self.source.next_frame() => frame,
            };
            let now = self.elapsed();
            self.process(frame, now).await;
        }

        self.source.release().await;
        self.metrics.complete();
        info!(
            frames = self.metrics.frames,
            confirmed = self.metrics.gestures_confirmed,
            delivered = self.metrics.commands_delivered,
            "pipeline stopped"
        );
        self.metrics.clone()
    }

    /// Pull and process a single frame.
    pub async fn step(&mut self) -> FrameOutcome {
        let frame = self.source.next_frame().await;
        let now = self.elapsed();
        self.process(frame, now).await
    }

    /// Process one frame observed at `now`.
    pub async fn process(
        &mut self,
        frame: Result<Option<HandDetection>, PoseError>,
        now: Timestamp,
    ) -> FrameOutcome {
        let outcome = self.evaluate(frame, now).await;
        self.metrics.record(&outcome);
        self.publish_status(now);
        outcome
    }

    async fn evaluate(
        &mut self,
        frame: Result<Option<HandDetection>, PoseError>,
        now: Timestamp,
    ) -> FrameOutcome {
        let detection = match frame {
            Ok(Some(detection)) => detection,
            Ok(None) => return FrameOutcome::NoHand,
            Err(e) => {
                warn!("pose source failed, treating frame as empty: {e}");
                return FrameOutcome::SourceError;
            }
        };

        let vector = match detection.finger_state() {
            Ok(vector) => vector,
            Err(e) => {
                debug!("dropping frame: {e}");
                return FrameOutcome::InvalidVector(e);
            }
        };

        match self.gate.observe(GestureEvent::new(vector, now)) {
            GateDecision::Confirmed(event) => self.deliver(event.vector).await,
            GateDecision::Cooling => FrameOutcome::Cooling,
            GateDecision::Unchanged => FrameOutcome::Unchanged,
            GateDecision::Debouncing => {
                debug!(gesture = %vector, "change not yet stable");
                FrameOutcome::Debouncing
            }
        }
    }

    async fn deliver(&mut self, gesture: FingerStateVector) -> FrameOutcome {
        let command = CommandMessage::for_gesture(gesture);
        info!(%gesture, %command, "gesture confirmed");

        match self.transport.send(&command, &self.endpoint).await {
            Ok(ack) => FrameOutcome::Delivered {
                gesture,
                command,
                ack,
            },
            Err(error) => {
                warn!(kind = error.kind(), "command {command} dropped: {error}");
                FrameOutcome::DeliveryFailed {
                    gesture,
                    command,
                    error,
                }
            }
        }
    }

    fn publish_status(&mut self, now: Timestamp) {
        let status = self.gate.status(now);
        let phase = match status {
            GateStatus::Ready => GatePhase::Ready,
            GateStatus::Cooling { .. } => GatePhase::Cooling,
        };
        if phase != self.last_phase {
            debug!(%status, "gate phase changed");
            self.last_phase = phase;
        }
        self.status.send_replace(status);
    }
}
