//! Hand landmark estimation with a MediaPipe-compatible landmark network.
//!
//! The network takes a square crop of a frame and estimates 21 landmarks, a presence score, and
//! the handedness of the hand in it. Without prior knowledge the whole frame is used as the crop.
//! Once a hand has been found, the next frame is cropped around its last position instead, which
//! keeps the hand large in the network input while it moves.

use std::{path::Path, time::Duration};

use handctl_image::{AspectRatio, Image, Rect, Resolution};

use crate::{
    detector::{DetectorConfig, HandDetector},
    landmark::{HandLandmarks, HandObservation, Handedness, NUM_LANDMARKS},
    nn::{Cnn, ColorMapper, NeuralNetwork},
    timer::{RateCounter, Timer},
};

/// Relative margin added to each side of the landmark bounding box when tracking.
const TRACKING_MARGIN: f32 = 0.25;

/// Runs the landmark network, tracking the hand between frames.
pub struct HandLandmarker {
    net: LandmarkNet,
    tracker: HandTracker,
    counter: RateCounter,
}

impl HandLandmarker {
    /// Loads the landmark network from an `.onnx` file.
    pub fn load<P: AsRef<Path>>(path: P, config: DetectorConfig) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::debug!("loading hand landmark network from '{}'", path.display());
        // The network also outputs world-space landmarks, which are not needed.
        let nn = NeuralNetwork::from_path(path)?
            .with_output_selection([0, 1, 2])
            .load()?;
        Self::new(nn, config)
    }

    /// Wraps an already loaded landmark network.
    ///
    /// The network must take a single `1x3xHxW` image input with values in `[0, 1]` and produce the
    /// screen-space landmarks (`1x63`), presence (`1x1`), and handedness (`1x1`) as its first
    /// three outputs.
    pub fn new(nn: NeuralNetwork, config: DetectorConfig) -> anyhow::Result<Self> {
        config.validate()?;
        if nn.num_outputs() < 3 {
            anyhow::bail!(
                "hand landmark network needs at least 3 outputs, this one has {}",
                nn.num_outputs()
            );
        }
        let cnn = Cnn::new(nn, ColorMapper::linear(0.0..=1.0))?;
        let input_res = cnn.input_resolution();
        log::debug!("hand landmark network input: {}", input_res);

        Ok(Self {
            net: LandmarkNet {
                cnn,
                t_resize: Timer::new("resize"),
                t_infer: Timer::new("infer"),
            },
            tracker: HandTracker::new(
                config,
                input_res.aspect_ratio().unwrap_or(AspectRatio::SQUARE),
            ),
            counter: RateCounter::new("landmarker", Duration::from_secs(10)),
        })
    }

    /// Returns the expected input resolution of the internal neural network.
    pub fn input_resolution(&self) -> Resolution {
        self.net.cnn.input_resolution()
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.net.t_resize, &self.net.t_infer].into_iter()
    }
}

impl HandDetector for HandLandmarker {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Option<HandObservation>> {
        let net = &self.net;
        let result = self
            .tracker
            .track(image.resolution(), |roi| net.estimate(image, roi))
            .map(|accepted| accepted.and_then(|estimate| observation(image, estimate)));
        self.counter.tick_with(self.timers());
        result
    }
}

/// The landmark network with its per-stage timers.
struct LandmarkNet {
    cnn: Cnn,
    t_resize: Timer,
    t_infer: Timer,
}

impl LandmarkNet {
    fn estimate(&self, image: &Image, roi: Rect) -> anyhow::Result<Estimate> {
        let input_res = self.cnn.input_resolution();
        let input = self.t_resize.time(|| image.crop_resize(roi, input_res));
        let outputs = self.t_infer.time(|| self.cnn.estimate(&input))?;

        let screen_landmarks = outputs.get(0)?;
        let presence = outputs.get(1)?;
        let handedness = outputs.get(2)?;
        anyhow::ensure!(
            screen_landmarks.len() == NUM_LANDMARKS * 3,
            "unexpected landmark output shape {:?}",
            screen_landmarks.shape()
        );
        anyhow::ensure!(
            presence.len() == 1 && handedness.len() == 1,
            "unexpected presence/handedness output shapes {:?}/{:?}",
            presence.shape(),
            handedness.shape()
        );

        let coords = screen_landmarks.iter().copied().collect::<Vec<f32>>();
        let positions = crop_to_frame(roi, input_res, &coords);

        let presence = presence.iter().copied().next().unwrap_or(0.0);
        let raw_handedness = handedness.iter().copied().next().unwrap_or(0.0);
        log::trace!(
            "landmarks in {:?}: presence={:.3} handedness={:.3}",
            roi,
            presence,
            raw_handedness
        );

        Ok(Estimate {
            positions,
            presence,
            raw_handedness,
        })
    }
}

/// Picks the region of each frame to search, and keeps following an accepted hand.
struct HandTracker {
    config: DetectorConfig,
    input_aspect: AspectRatio,
    /// Region (in frame pixels) to search next, if a hand is being tracked.
    roi: Option<Rect>,
}

impl HandTracker {
    fn new(config: DetectorConfig, input_aspect: AspectRatio) -> Self {
        Self {
            config,
            input_aspect,
            roi: None,
        }
    }

    /// Runs `estimate` on the tracked region or the full frame and returns the accepted estimate.
    ///
    /// A tracked region is searched first and needs `min_tracking_confidence`. If that fails, or
    /// nothing is tracked, the whole frame is searched once and needs `min_detection_confidence`.
    /// Tracking stops whenever no estimate is accepted.
    fn track<E>(&mut self, frame: Resolution, mut estimate: E) -> anyhow::Result<Option<Estimate>>
    where
        E: FnMut(Rect) -> anyhow::Result<Estimate>,
    {
        if frame.aspect_ratio().is_none() {
            self.roi = None;
            return Ok(None);
        }

        if let Some(roi) = self.roi.take() {
            let tracked = estimate(roi)?;
            if tracked.presence >= self.config.min_tracking_confidence {
                self.follow(&tracked);
                return Ok(Some(tracked));
            }
            log::trace!(
                "lost track of hand (presence {:.3}), searching full frame",
                tracked.presence
            );
        }

        let found = estimate(frame.cover_aspect_ratio(self.input_aspect))?;
        if found.presence >= self.config.min_detection_confidence {
            self.follow(&found);
            Ok(Some(found))
        } else {
            Ok(None)
        }
    }

    fn follow(&mut self, estimate: &Estimate) {
        self.roi = Rect::bounding(estimate.positions.iter().map(|&[x, y, _]| [x, y]))
            .map(|rect| {
                rect.grow_rel(TRACKING_MARGIN)
                    .grow_to_fit_aspect(self.input_aspect)
            })
            .filter(|rect| rect.area() > 0.0);
    }
}

/// Turns an accepted estimate into an observation with landmarks normalized to the frame size.
fn observation(image: &Image, estimate: Estimate) -> Option<HandObservation> {
    let Estimate {
        positions,
        presence,
        raw_handedness,
    } = estimate;

    let (w, h) = (image.width() as f32, image.height() as f32);
    let landmarks =
        HandLandmarks::from_positions(positions.map(|[x, y, z]| [x / w, y / h, z / w]))?;
    Some(HandObservation::new(
        landmarks,
        handedness_from_raw(raw_handedness),
        presence,
    ))
}

/// Maps landmark coordinates output for an input crop of `roi` back into frame pixels.
///
/// `coords` holds `x, y, z` triples in input pixels. Depth is scaled like `x`.
fn crop_to_frame(roi: Rect, input_res: Resolution, coords: &[f32]) -> [[f32; 3]; NUM_LANDMARKS] {
    let scale_x = roi.width() / input_res.width() as f32;
    let scale_y = roi.height() / input_res.height() as f32;

    let mut positions = [[0.0; 3]; NUM_LANDMARKS];
    for (out, xyz) in positions.iter_mut().zip(coords.chunks_exact(3)) {
        *out = [
            roi.x() + xyz[0] * scale_x,
            roi.y() + xyz[1] * scale_y,
            xyz[2] * scale_x,
        ];
    }
    positions
}

fn handedness_from_raw(raw: f32) -> Handedness {
    if raw > 0.5 {
        Handedness::Right
    } else {
        Handedness::Left
    }
}

struct Estimate {
    /// Landmark positions in frame pixels.
    positions: [[f32; 3]; NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}
