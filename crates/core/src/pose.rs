//! Boundary with the external pose extractor.
//!
//! The extractor itself (camera capture plus the hand-landmark model) lives
//! outside this crate. Per frame it reports zero or one primary hand as a
//! 21-point landmark list in image pixel coordinates with a left/right label.
//! This module turns that into finger digits with the tip-versus-joint rule
//! and defines the `PoseSource` seam the pipeline pulls frames from.
//!
//! # Landmark Rule
//!
//! ```text
//! thumb   (tip 4):  Right hand: tip.x > ip.x     Left hand: tip.x < ip.x
//! fingers (8..20):  tip.y < pip.y   (image y grows downward)
//! ```

use crate::error::PoseError;
use crate::finger::{FingerStateVector, FINGER_COUNT};
use async_trait::async_trait;

/// Landmarks per detected hand.
pub const LANDMARK_COUNT: usize = 21;

/// Fingertip landmark ids in finger order.
pub const TIP_IDS: [usize; FINGER_COUNT] = [4, 8, 12, 16, 20];

/// Hand label as reported after mirror correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// The opposite label.
    ///
    /// Selfie-view cameras see a mirrored image, so the raw model label is
    /// swapped before it reaches the landmark rule.
    pub fn mirrored(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }
}

/// A landmark in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// One detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    pub handedness: Handedness,
    pub landmarks: Vec<Landmark>,
}

impl HandDetection {
    pub fn new(handedness: Handedness, landmarks: Vec<Landmark>) -> Self {
        Self {
            handedness,
            landmarks,
        }
    }

    /// Per-finger 0/1 digits derived from the landmarks.
    ///
    /// Returns an empty list when the landmark set is incomplete, which the
    /// codec rejects downstream.
    pub fn finger_digits(&self) -> Vec<u8> {
        if self.landmarks.len() < LANDMARK_COUNT {
            return Vec::new();
        }
        let lm = &self.landmarks;

        let mut digits = Vec::with_capacity(FINGER_COUNT);

        let thumb_tip = lm[TIP_IDS[0]];
        let thumb_ip = lm[TIP_IDS[0] - 1];
        let thumb_up = match self.handedness {
            Handedness::Right => thumb_tip.x > thumb_ip.x,
            Handedness::Left => thumb_tip.x < thumb_ip.x,
        };
        digits.push(u8::from(thumb_up));

        for &tip in &TIP_IDS[1..] {
            digits.push(u8::from(lm[tip].y < lm[tip - 2].y));
        }

        digits
    }

    /// Derive and validate the finger-state vector for this hand.
    pub fn finger_state(&self) -> Result<FingerStateVector, crate::error::InvalidVectorError> {
        FingerStateVector::from_digits(&self.finger_digits())
    }

    /// Build a plausible skeleton whose landmark rule yields `vector`.
    ///
    /// Used by simulated sources and tests in place of a camera.
    pub fn synthetic(handedness: Handedness, vector: FingerStateVector) -> Self {
        const WRIST: (f32, f32) = (320.0, 420.0);
        const KNUCKLE_Y: f32 = 320.0;

        let mut landmarks = vec![Landmark::default(); LANDMARK_COUNT];
        landmarks[0] = Landmark::new(WRIST.0, WRIST.1);

        // Thumb: cmc, mcp, ip, tip. Outward is +x for a right hand.
        let outward = match handedness {
            Handedness::Right => 1.0,
            Handedness::Left => -1.0,
        };
        let thumb_up = vector.digits()[0] == 1;
        let base_x = WRIST.0 + outward * 40.0;
        landmarks[1] = Landmark::new(base_x, 390.0);
        landmarks[2] = Landmark::new(base_x + outward * 20.0, 360.0);
        landmarks[3] = Landmark::new(base_x + outward * 35.0, 335.0);
        let tip_dx = if thumb_up { 55.0 } else { 15.0 };
        landmarks[4] = Landmark::new(base_x + outward * tip_dx, 320.0);

        for (offset, (&tip, &digit)) in TIP_IDS[1..]
            .iter()
            .zip(&vector.digits()[1..])
            .enumerate()
        {
            let x = WRIST.0 + outward * (20.0 - 25.0 * offset as f32);
            let ys: [f32; 4] = if digit == 1 {
                [KNUCKLE_Y, KNUCKLE_Y - 40.0, KNUCKLE_Y - 70.0, KNUCKLE_Y - 95.0]
            } else {
                [KNUCKLE_Y, KNUCKLE_Y - 30.0, KNUCKLE_Y - 10.0, KNUCKLE_Y + 15.0]
            };
            for (joint, y) in ys.iter().enumerate() {
                landmarks[tip - 3 + joint] = Landmark::new(x, *y);
            }
        }

        Self::new(handedness, landmarks)
    }
}

/// Source of per-frame hand detections.
///
/// Implementations wrap the capture device and landmark model. The pipeline
/// is the only caller and calls `release` exactly once when it stops.
#[async_trait]
pub trait PoseSource: Send {
    /// Wait for the next frame and report its primary hand, if any.
    async fn next_frame(&mut self) -> Result<Option<HandDetection>, PoseError>;

    /// Release the capture resource.
    async fn release(&mut self) {}
}
