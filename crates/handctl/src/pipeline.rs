//! The decode → detect → classify chain behind each request.

use std::time::Duration;

use handctl_image::{decode_frame, Image};

use crate::{
    detector::{HandDetector, SharedDetector},
    error::GestureError,
    gesture::{self, Command},
    timer::{RateCounter, Timer},
};

/// Turns frames into commands using a shared [`HandDetector`].
///
/// All methods block. Call them from a blocking-capable context.
pub struct GesturePipeline {
    detector: SharedDetector,
    t_decode: Timer,
    t_detect: Timer,
    counter: RateCounter,
}

impl GesturePipeline {
    pub fn new<D: HandDetector + 'static>(detector: D) -> Self {
        Self {
            detector: SharedDetector::new(detector),
            t_decode: Timer::new("decode"),
            t_detect: Timer::new("detect"),
            counter: RateCounter::new("gestures", Duration::from_secs(10)),
        }
    }

    /// Decodes a data-URL frame and classifies the gesture in it.
    ///
    /// The frame is mirrored before detection, like a selfie camera preview.
    pub fn process_data_url(&self, data_url: &str) -> Result<Command, GestureError> {
        let result = self
            .t_decode
            .time(|| decode_frame(data_url))
            .map_err(GestureError::from)
            .and_then(|image| self.classify_frame(&image));
        self.tick();
        result
    }

    /// Classifies the gesture in an already decoded (and mirrored) frame.
    pub fn process_frame(&self, image: &Image) -> Result<Command, GestureError> {
        let result = self.classify_frame(image);
        self.tick();
        result
    }

    /// Counts a processed request, failed or not.
    fn tick(&self) {
        self.counter.tick_with([&self.t_decode, &self.t_detect]);
    }

    fn classify_frame(&self, image: &Image) -> Result<Command, GestureError> {
        let observation = self
            .t_detect
            .time(|| self.detector.detect(image))
            .map_err(GestureError::Detection)?;

        let command = gesture::classify(observation.as_ref());
        if let Some(hand) = &observation {
            log::info!("detected: {}", command);
            log::debug!(
                "{} hand, confidence {:.3}, {} fingers",
                hand.handedness(),
                hand.confidence(),
                gesture::finger_count(hand.landmarks(), hand.handedness())
            );
        }

        Ok(command)
    }
}
