//! Wire payloads exchanged with the remote actuator.
//!
//! # Frame Format
//!
//! ```text
//! controller -> actuator   text frame, 5 chars of '0'/'1'   e.g. "00111"
//! actuator -> controller   text frame, opaque acknowledgement
//! ```
//!
//! The command is the complement of the observed finger state: the actuator
//! reads each digit as the drive signal for one servo in finger order
//! (thumb, index, middle, ring, little), and drives it open on `0`. An open
//! hand `"11111"` therefore goes out as `"00000"`.

use crate::error::InvalidVectorError;
use crate::finger::{Finger, FingerStateVector, FINGER_COUNT};
use std::fmt;

/// Text command for one confirmed gesture.
///
/// Created fresh for every confirmed gesture and consumed by one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMessage {
    text: String,
}

impl CommandMessage {
    /// Encode the command for a confirmed finger state.
    pub fn for_gesture(gesture: FingerStateVector) -> Self {
        Self {
            text: gesture.complement().to_canonical_string(),
        }
    }

    /// Text sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume into the wire text.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for CommandMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Acknowledgement frame read back from the actuator.
///
/// Logged, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckPayload(String);

impl AckPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AckPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A command as decoded on the actuator side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    drive: FingerStateVector,
}

impl ActuatorCommand {
    /// Decode a received text frame.
    ///
    /// # Errors
    /// Any frame that is not exactly five `'0'`/`'1'` characters.
    pub fn parse(text: &str) -> Result<Self, InvalidVectorError> {
        Ok(Self {
            drive: text.parse()?,
        })
    }

    /// Drive signal for `finger`: `true` drives the servo closed.
    pub fn drives_closed(&self, finger: Finger) -> bool {
        self.drive.is_extended(finger)
    }

    /// Finger state the controller observed when it issued this command.
    pub fn observed_gesture(&self) -> FingerStateVector {
        self.drive.complement()
    }

    /// Servo angle in degrees for `finger`.
    ///
    /// Ring and little servos are mounted reversed, so their angles mirror.
    pub fn servo_angle(&self, finger: Finger) -> u16 {
        let angle = if self.drives_closed(finger) { SERVO_MAX_DEG } else { 0 };
        match finger {
            Finger::Ring | Finger::Little => SERVO_MAX_DEG - angle,
            _ => angle,
        }
    }

    /// Servo angles in finger order.
    pub fn servo_angles(&self) -> [u16; FINGER_COUNT] {
        Finger::ALL.map(|finger| self.servo_angle(finger))
    }
}

/// Full servo travel in degrees.
pub const SERVO_MAX_DEG: u16 = 180;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_complement() {
        let open = FingerStateVector::OPEN;
        assert_eq!(CommandMessage::for_gesture(open).as_str(), "00000");

        let closed = FingerStateVector::CLOSED;
        assert_eq!(CommandMessage::for_gesture(closed).to_string(), "11111");

        let v: FingerStateVector = "11000".parse().unwrap();
        assert_eq!(CommandMessage::for_gesture(v).into_text(), "00111");
    }

    #[test]
    fn test_actuator_decodes_command() {
        let v: FingerStateVector = "01100".parse().unwrap();
        let message = CommandMessage::for_gesture(v);

        let decoded = ActuatorCommand::parse(message.as_str()).unwrap();
        assert_eq!(decoded.observed_gesture(), v);
        assert!(decoded.drives_closed(Finger::Thumb));
        assert!(!decoded.drives_closed(Finger::Index));
    }

    #[test]
    fn test_servo_angles() {
        // Observed fist -> command "11111": every servo driven closed.
        let command = CommandMessage::for_gesture(FingerStateVector::CLOSED);
        let fist = ActuatorCommand::parse(command.as_str()).unwrap();
        assert_eq!(fist.servo_angles(), [180, 180, 180, 0, 0]);

        let open = ActuatorCommand::parse("00000").unwrap();
        assert_eq!(open.servo_angles(), [0, 0, 0, 180, 180]);
    }

    #[test]
    fn test_actuator_rejects_bad_length() {
        assert!(ActuatorCommand::parse("M").is_err());
        assert!(ActuatorCommand::parse("000000").is_err());
        assert!(ActuatorCommand::parse("0x000").is_err());
    }
}
