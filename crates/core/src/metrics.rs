//! Metrics collection and reporting for the control loop.
//!
//! This module counts what happened to every frame:
//! - How many frames carried a hand, failed extraction, or held a bad vector
//! - Why the gate dropped observations (cooling, unchanged, debouncing)
//! - How confirmed commands fared on the wire
//!
//! # Thread Safety
//!
//! The `PipelineMetrics` struct is NOT thread-safe. The pipeline owns it and
//! updates it from the loop; readers get a clone.

use crate::error::TransportError;
use crate::pipeline::FrameOutcome;
use std::time::{Duration, Instant};

/// Counters for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    // === Timing ===
    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on shutdown)
    pub end_time: Option<Instant>,

    // === Frames ===
    /// Frames pulled from the pose source
    pub frames: u64,

    /// Frames with a hand in view
    pub hands_detected: u64,

    /// Frames where the pose source reported an error
    pub extractor_errors: u64,

    /// Detections rejected by the codec
    pub invalid_vectors: u64,

    // === Gate ===
    /// Observations dropped during cooldown
    pub discarded_cooling: u64,

    /// Observations equal to the last confirmed gesture
    pub discarded_unchanged: u64,

    /// Observations dropped by the debounce delay
    pub discarded_debouncing: u64,

    /// Gestures confirmed by the gate
    pub gestures_confirmed: u64,

    // === Transport ===
    /// Commands acknowledged by the actuator
    pub commands_delivered: u64,

    /// Sends rejected for a malformed endpoint
    pub invalid_endpoints: u64,

    /// Sends that could not connect
    pub connect_failures: u64,

    /// Sends that connected but saw no acknowledgement
    pub missing_acks: u64,
}

impl PipelineMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            frames: 0,
            hands_detected: 0,
            extractor_errors: 0,
            invalid_vectors: 0,
            discarded_cooling: 0,
            discarded_unchanged: 0,
            discarded_debouncing: 0,
            gestures_confirmed: 0,
            commands_delivered: 0,
            invalid_endpoints: 0,
            connect_failures: 0,
            missing_acks: 0,
        }
    }

    /// Count one processed frame.
    pub fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;

        match outcome {
            FrameOutcome::NoHand => {}
            FrameOutcome::SourceError => self.extractor_errors += 1,
            FrameOutcome::InvalidVector(_) => {
                self.hands_detected += 1;
                self.invalid_vectors += 1;
            }
            FrameOutcome::Cooling => {
                self.hands_detected += 1;
                self.discarded_cooling += 1;
            }
            FrameOutcome::Unchanged => {
                self.hands_detected += 1;
                self.discarded_unchanged += 1;
            }
            FrameOutcome::Debouncing => {
                self.hands_detected += 1;
                self.discarded_debouncing += 1;
            }
            FrameOutcome::Delivered { .. } => {
                self.hands_detected += 1;
                self.gestures_confirmed += 1;
                self.commands_delivered += 1;
            }
            FrameOutcome::DeliveryFailed { error, .. } => {
                self.hands_detected += 1;
                self.gestures_confirmed += 1;
                match error {
                    TransportError::InvalidEndpoint { .. } => self.invalid_endpoints += 1,
                    TransportError::ConnectFailed { .. } => self.connect_failures += 1,
                    TransportError::NoAck { .. } => self.missing_acks += 1,
                }
            }
        }
    }

    /// Mark the run as finished.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Total failed deliveries.
    pub fn delivery_failures(&self) -> u64 {
        self.invalid_endpoints + self.connect_failures + self.missing_acks
    }

    /// Fraction of confirmed gestures that were acknowledged.
    pub fn delivery_rate(&self) -> f64 {
        if self.gestures_confirmed == 0 {
            0.0
        } else {
            self.commands_delivered as f64 / self.gestures_confirmed as f64
        }
    }

    /// Fraction of frames with a hand in view.
    pub fn detection_rate(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.hands_detected as f64 / self.frames as f64
        }
    }

    /// Frames per second over the run.
    pub fn frame_rate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.frames as f64 / secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Session Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Frames ===");
        println!("Frames: {} ({:.1} fps)", self.frames, self.frame_rate());
        println!(
            "Hands detected: {} ({:.1}%)",
            self.hands_detected,
            self.detection_rate() * 100.0
        );
        println!("Extractor errors: {}", self.extractor_errors);
        println!("Invalid vectors: {}", self.invalid_vectors);
        println!();

        println!("=== Gate ===");
        println!("Confirmed: {}", self.gestures_confirmed);
        println!("Dropped (cooling): {}", self.discarded_cooling);
        println!("Dropped (unchanged): {}", self.discarded_unchanged);
        println!("Dropped (debouncing): {}", self.discarded_debouncing);
        println!();

        println!("=== Delivery ===");
        println!(
            "Delivered: {} ({:.1}%)",
            self.commands_delivered,
            self.delivery_rate() * 100.0
        );
        println!("Connect failures: {}", self.connect_failures);
        println!("Missing acks: {}", self.missing_acks);
        println!("Invalid endpoint: {}", self.invalid_endpoints);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             frames={}\n\
             hands_detected={}\n\
             extractor_errors={}\n\
             invalid_vectors={}\n\
             discarded_cooling={}\n\
             discarded_unchanged={}\n\
             discarded_debouncing={}\n\
             gestures_confirmed={}\n\
             commands_delivered={}\n\
             connect_failures={}\n\
             missing_acks={}\n\
             invalid_endpoints={}\n",
            self.duration().as_millis(),
            self.frames,
            self.hands_detected,
            self.extractor_errors,
            self.invalid_vectors,
            self.discarded_cooling,
            self.discarded_unchanged,
            self.discarded_debouncing,
            self.gestures_confirmed,
            self.commands_delivered,
            self.connect_failures,
            self.missing_acks,
            self.invalid_endpoints,
        )
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
