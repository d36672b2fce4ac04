//! Simulated camera hand for runs without a capture device.
//!
//! Stands in for the pose extractor: holds a gesture from a small palette for
//! a random number of frames, then switches to another, producing the kind of
//! input the gate has to clean up.
//!
//! # Design
//!
//! Each frame may additionally:
//! - Misread one finger (`flip_rate`), a single-frame flicker
//! - Lose the hand entirely (`dropout_rate`)
//! - Come back with a truncated landmark set (`glitch_rate`)
//!
//! All randomness comes from one `ChaCha8Rng`, so a seed reproduces the whole
//! frame sequence.

use async_trait::async_trait;
use gesture_link_core::error::PoseError;
use gesture_link_core::finger::{FingerStateVector, FINGER_COUNT};
use gesture_link_core::pose::{HandDetection, Handedness, PoseSource, LANDMARK_COUNT};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Gestures the simulated hand moves between.
const PALETTE: [[bool; FINGER_COUNT]; 6] = [
    [false, false, false, false, false], // fist
    [true, true, true, true, true],      // open hand
    [false, true, false, false, false],  // point
    [false, true, true, false, false],   // victory
    [true, true, false, false, false],   // L
    [true, false, false, false, true],   // shaka
];

/// Frames a gesture is held before switching.
const HOLD_FRAMES: std::ops::RangeInclusive<u32> = 20..=90;

/// Settings for the simulated hand.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedHandConfig {
    /// Seed for all randomness
    pub seed: u64,

    /// Time between frames
    pub frame_interval: Duration,

    /// Chance per frame that one finger reads wrong
    pub flip_rate: f64,

    /// Chance per frame that no hand is detected
    pub dropout_rate: f64,

    /// Chance per frame of a truncated landmark set
    pub glitch_rate: f64,

    /// Stop producing frames after this many
    pub max_frames: Option<u64>,
}

impl Default for SimulatedHandConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            frame_interval: Duration::from_millis(15),
            flip_rate: 0.02,
            dropout_rate: 0.05,
            glitch_rate: 0.01,
            max_frames: None,
        }
    }
}

/// A seeded `PoseSource` that plays a wandering gesture sequence.
pub struct SimulatedHand {
    config: SimulatedHandConfig,
    rng: ChaCha8Rng,
    handedness: Handedness,
    held: FingerStateVector,
    hold_remaining: u32,
    frames: u64,
    exhausted: Option<oneshot::Sender<()>>,
}

impl SimulatedHand {
    pub fn new(config: SimulatedHandConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            handedness: Handedness::Right,
            held: FingerStateVector::CLOSED,
            hold_remaining: 0,
            frames: 0,
            exhausted: None,
        }
    }

    /// Resolves once `max_frames` frames have been produced.
    ///
    /// Never resolves without a frame limit, as long as the hand is alive.
    pub fn on_exhausted(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.exhausted = Some(tx);
        rx
    }

    /// Frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn limit_reached(&self) -> bool {
        self.config.max_frames.is_some_and(|max| self.frames >= max)
    }

    /// Produce the next frame without waiting.
    pub fn generate(&mut self) -> Option<HandDetection> {
        self.frames += 1;

        if self.hold_remaining == 0 {
            self.switch_gesture();
        }
        self.hold_remaining -= 1;

        if self.rng.gen_bool(self.config.dropout_rate) {
            return None;
        }

        let mut vector = self.held;
        if self.rng.gen_bool(self.config.flip_rate) {
            let mut fingers = vector.digits().map(|d| d == 1);
            let finger = self.rng.gen_range(0..FINGER_COUNT);
            fingers[finger] = !fingers[finger];
            vector = FingerStateVector::from_fingers(fingers);
        }

        let mut detection = HandDetection::synthetic(self.handedness, vector);
        if self.rng.gen_bool(self.config.glitch_rate) {
            let kept = self.rng.gen_range(0..LANDMARK_COUNT);
            detection.landmarks.truncate(kept);
        }
        Some(detection)
    }

    fn switch_gesture(&mut self) {
        let next = PALETTE[self.rng.gen_range(0..PALETTE.len())];
        self.held = FingerStateVector::from_fingers(next);
        self.hold_remaining = self.rng.gen_range(HOLD_FRAMES);

        // Occasionally the other hand shows up.
        if self.rng.gen_bool(0.1) {
            self.handedness = self.handedness.mirrored();
        }

        debug!(
            gesture = %self.held,
            hand = ?self.handedness,
            frames = self.hold_remaining,
            "simulated hand changes gesture"
        );
    }
}

#[async_trait]
impl PoseSource for SimulatedHand {
    async fn next_frame(&mut self) -> Result<Option<HandDetection>, PoseError> {
        if self.limit_reached() {
            if let Some(exhausted) = self.exhausted.take() {
                let _ = exhausted.send(());
            }
            return std::future::pending().await;
        }

        tokio::time::sleep(self.config.frame_interval).await;
        Ok(self.generate())
    }

    async fn release(&mut self) {
        info!(frames = self.frames, "simulated camera released");
    }
}
