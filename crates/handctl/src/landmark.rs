//! Hand landmarks and per-frame hand observations.

use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Number of landmarks describing a single hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand pose landmarks, in the order the landmark network outputs them.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// A single landmark.
///
/// `x` and `y` are normalized to the frame size, so that `(0, 0)` is the top left corner of the
/// frame and `(1, 1)` is the bottom right one. `y` grows downwards. `z` is a relative depth with
/// roughly the same scale as `x`.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct Landmark {
    pos: [f32; 3],
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { pos: [x, y, z] }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }
}

/// The 21 landmarks of one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    landmarks: [Landmark; NUM_LANDMARKS],
}

impl HandLandmarks {
    /// Creates a set of landmarks where every landmark is `landmark`.
    pub fn splat(landmark: Landmark) -> Self {
        Self {
            landmarks: [landmark; NUM_LANDMARKS],
        }
    }

    /// Collects landmarks from an iterator of `[x, y, z]` positions.
    ///
    /// Returns [`None`] unless the iterator yields exactly [`NUM_LANDMARKS`] positions.
    pub fn from_positions<I: IntoIterator<Item = [f32; 3]>>(positions: I) -> Option<Self> {
        let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
        let mut count = 0;
        for [x, y, z] in positions {
            *landmarks.get_mut(count)? = Landmark::new(x, y, z);
            count += 1;
        }

        (count == NUM_LANDMARKS).then_some(Self { landmarks })
    }

    pub fn iter(&self) -> impl Iterator<Item = Landmark> + '_ {
        self.landmarks.iter().copied()
    }
}

impl Index<LandmarkIdx> for HandLandmarks {
    type Output = Landmark;

    fn index(&self, index: LandmarkIdx) -> &Landmark {
        &self.landmarks[index as usize]
    }
}

impl IndexMut<LandmarkIdx> for HandLandmarks {
    fn index_mut(&mut self, index: LandmarkIdx) -> &mut Landmark {
        &mut self.landmarks[index as usize]
    }
}

/// Which hand was observed.
///
/// The label comes straight from the landmark network, which was trained on mirrored (selfie)
/// images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hand found in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    landmarks: HandLandmarks,
    handedness: Handedness,
    confidence: f32,
}

impl HandObservation {
    pub fn new(landmarks: HandLandmarks, handedness: Handedness, confidence: f32) -> Self {
        Self {
            landmarks,
            handedness,
            confidence,
        }
    }

    #[inline]
    pub fn landmarks(&self) -> &HandLandmarks {
        &self.landmarks
    }

    #[inline]
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Returns the detector's confidence that a hand is present, between 0.0 and 1.0.
    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_network_order() {
        assert_eq!(LandmarkIdx::Wrist as usize, 0);
        assert_eq!(LandmarkIdx::ThumbTip as usize, 4);
        assert_eq!(LandmarkIdx::IndexFingerTip as usize, 8);
        assert_eq!(LandmarkIdx::MiddleFingerTip as usize, 12);
        assert_eq!(LandmarkIdx::RingFingerTip as usize, 16);
        assert_eq!(LandmarkIdx::PinkyTip as usize, NUM_LANDMARKS - 1);
    }

    #[test]
    fn from_positions() {
        let positions = (0..NUM_LANDMARKS).map(|i| [i as f32, 0.5, 0.0]);
        let landmarks = HandLandmarks::from_positions(positions).unwrap();
        assert_eq!(landmarks[LandmarkIdx::ThumbTip].x(), 4.0);
        assert_eq!(landmarks[LandmarkIdx::PinkyTip].position(), [20.0, 0.5, 0.0]);
        assert_eq!(landmarks.iter().count(), NUM_LANDMARKS);

        assert!(HandLandmarks::from_positions([[0.0; 3]; 20]).is_none());
        assert!(HandLandmarks::from_positions([[0.0; 3]; 22]).is_none());
    }

    #[test]
    fn index_mut() {
        let mut landmarks = HandLandmarks::splat(Landmark::new(0.5, 0.5, 0.0));
        landmarks[LandmarkIdx::IndexFingerTip] = Landmark::new(0.5, 0.1, 0.0);
        assert_eq!(landmarks[LandmarkIdx::IndexFingerTip].y(), 0.1);
        assert_eq!(landmarks[LandmarkIdx::IndexFingerPip].y(), 0.5);
    }
}
