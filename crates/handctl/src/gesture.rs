//! Turning hand landmarks into robot commands.
//!
//! The number of extended fingers selects the command:
//!
//! | Fingers | Command    |
//! |---------|------------|
//! | 1       | `forward`  |
//! | 2       | `left`     |
//! | 3       | `right`    |
//! | 4       | `backward` |
//! | other   | `stop`     |
//!
//! Both a closed fist (0) and an open hand (5) stop the robot, as does a frame without any hand.

use std::fmt;

use serde::Serialize;

use crate::landmark::{HandLandmarks, HandObservation, Handedness, LandmarkIdx};

/// Fingertips and the joint each one is compared against.
///
/// Every reference joint is the landmark two indices below its tip (the PIP joint).
const FINGERS: [(LandmarkIdx, LandmarkIdx); 4] = {
    use LandmarkIdx::*;
    [
        (IndexFingerTip, IndexFingerPip),
        (MiddleFingerTip, MiddleFingerPip),
        (RingFingerTip, RingFingerPip),
        (PinkyTip, PinkyPip),
    ]
};

const THUMB_TIP: LandmarkIdx = LandmarkIdx::ThumbTip;
/// The thumb is judged horizontally against landmark 2.
const THUMB_REFERENCE: LandmarkIdx = LandmarkIdx::ThumbMcp;

/// A command for the remote device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Forward,
    Left,
    Right,
    Backward,
    Stop,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Forward,
        Command::Left,
        Command::Right,
        Command::Backward,
        Command::Stop,
    ];

    /// Maps a number of extended fingers to a command.
    ///
    /// Only counts 1 to 4 select a motion. Everything else, including an open hand, is `Stop`.
    pub fn from_finger_count(count: u8) -> Self {
        match count {
            1 => Command::Forward,
            2 => Command::Left,
            3 => Command::Right,
            4 => Command::Backward,
            _ => Command::Stop,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Forward => "forward",
            Command::Left => "left",
            Command::Right => "right",
            Command::Backward => "backward",
            Command::Stop => "stop",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns whether the finger ending in `tip` is raised.
///
/// Image Y coordinates grow downwards, so a raised finger has its tip *above* its PIP joint.
fn finger_extended(landmarks: &HandLandmarks, tip: LandmarkIdx, pip: LandmarkIdx) -> bool {
    landmarks[tip].y() < landmarks[pip].y()
}

/// Returns whether the thumb is spread away from the palm.
///
/// The thumb moves sideways, so its X coordinates are compared instead. Which side counts as
/// "spread" flips with the handedness of the observed hand.
pub fn thumb_extended(landmarks: &HandLandmarks, handedness: Handedness) -> bool {
    let tip = landmarks[THUMB_TIP].x();
    let reference = landmarks[THUMB_REFERENCE].x();
    match handedness {
        Handedness::Right => tip < reference,
        Handedness::Left => tip > reference,
    }
}

/// Counts the extended fingers of a hand, including the thumb.
///
/// The result is always in `0..=5`.
pub fn finger_count(landmarks: &HandLandmarks, handedness: Handedness) -> u8 {
    let fingers = FINGERS
        .iter()
        .filter(|(tip, pip)| finger_extended(landmarks, *tip, *pip))
        .count() as u8;

    fingers + u8::from(thumb_extended(landmarks, handedness))
}

/// Selects the command for a frame.
///
/// Frames without a hand always yield [`Command::Stop`].
pub fn classify(observation: Option<&HandObservation>) -> Command {
    match observation {
        Some(hand) => {
            Command::from_finger_count(finger_count(hand.landmarks(), hand.handedness()))
        }
        None => Command::Stop,
    }
}
