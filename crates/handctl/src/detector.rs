//! The hand detector interface and its process-wide shared instance.

use std::sync::{Arc, Mutex, PoisonError};

use handctl_image::Image;

use crate::landmark::HandObservation;

/// Finds a hand in a frame.
///
/// Implementations may keep state between calls (for example, to track a hand across frames), so
/// detection takes `&mut self`. At most one hand is reported per frame.
pub trait HandDetector: Send {
    /// Looks for a hand in `image`.
    ///
    /// Returns `Ok(None)` if no hand was found with sufficient confidence. Errors are reserved for
    /// failures of the detector itself.
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<HandObservation>>;
}

impl<D: HandDetector + ?Sized> HandDetector for Box<D> {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<HandObservation>> {
        (**self).detect(image)
    }
}

/// Confidence thresholds for hand detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Minimum confidence to report a hand found without prior tracking information.
    pub min_detection_confidence: f32,
    /// Minimum confidence to keep tracking a hand found in the previous frame.
    pub min_tracking_confidence: f32,
}

impl DetectorConfig {
    pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.8;
    pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f32 = 0.8;

    /// Checks that both thresholds lie in `[0.0, 1.0]`.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be between 0.0 and 1.0, got {}", name, value);
            }
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: Self::DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: Self::DEFAULT_MIN_TRACKING_CONFIDENCE,
        }
    }
}

/// A [`HandDetector`] shared by all request handlers.
///
/// Detectors are not safe to call concurrently, so every call locks the detector for its whole
/// duration. Concurrent requests therefore queue up on the lock, and a detection that never
/// returns blocks every request after it.
#[derive(Clone)]
pub struct SharedDetector {
    inner: Arc<Mutex<Box<dyn HandDetector>>>,
}

impl SharedDetector {
    pub fn new<D: HandDetector + 'static>(detector: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(detector))),
        }
    }

    /// Locks the detector and runs it on `image`.
    pub fn detect(&self, image: &Image) -> anyhow::Result<Option<HandObservation>> {
        let mut detector = self.inner.lock().unwrap_or_else(|poisoned| {
            // A previous detection panicked. Detector state is only a tracking hint, so keep going.
            log::warn!("hand detector panicked during an earlier request; reusing it");
            PoisonError::into_inner(poisoned)
        });
        detector.detect(image)
    }
}
