//! Synthetic sensor feed for simulation.
//!
//! The FrameOracle plays the role of the motion sensor:
//! - Ground-truth fingertip trajectories (linear, per finger)
//! - Visibility windows (fingers appear and vanish on given frames)
//! - Frame generation with optional Gaussian position noise

use nalgebra::Vector3;
use pinch_core::{FingerId, FingerSample, Frame, HandId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::ops::Range;

/// One simulated fingertip.
#[derive(Debug, Clone)]
pub struct SimFinger {
    pub id: FingerId,
    pub hand_id: HandId,

    /// Tip position on the first visible frame
    pub from: Vector3<f64>,

    /// Tip position on the last visible frame
    pub to: Vector3<f64>,

    /// Frames on which the finger is reported
    pub visible: Range<u64>,
}

impl SimFinger {
    /// A finger moving in a straight line while visible.
    pub fn linear(
        id: FingerId,
        hand_id: HandId,
        from: Vector3<f64>,
        to: Vector3<f64>,
        visible: Range<u64>,
    ) -> Self {
        Self {
            id,
            hand_id,
            from,
            to,
            visible,
        }
    }

    /// A finger that holds still while visible.
    pub fn fixed(id: FingerId, hand_id: HandId, at: Vector3<f64>, visible: Range<u64>) -> Self {
        Self::linear(id, hand_id, at, at, visible)
    }

    /// Ground-truth position on `frame`, or None if not visible.
    pub fn position_at(&self, frame: u64) -> Option<Vector3<f64>> {
        if !self.visible.contains(&frame) {
            return None;
        }
        let span = self.visible.end.saturating_sub(self.visible.start).saturating_sub(1);
        if span == 0 {
            return Some(self.from);
        }
        let t = (frame - self.visible.start) as f64 / span as f64;
        Some(self.from + (self.to - self.from) * t)
    }
}

/// The FrameOracle - generates sensor frames from simulated fingers.
pub struct FrameOracle {
    /// RNG for position noise
    rng: ChaCha8Rng,

    /// Per-axis position noise (None = exact positions)
    noise: Option<Normal<f64>>,

    fingers: Vec<SimFinger>,

    /// Next frame number
    frame: u64,

    /// Frames to generate in total
    total_frames: u64,

    /// Sensor tick length, used for frame timestamps
    frame_interval_us: i64,
}

impl FrameOracle {
    /// Creates an oracle producing `total_frames` frames.
    pub fn new(seed: u64, total_frames: u64, frame_interval_us: i64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise: None,
            fingers: Vec::new(),
            frame: 0,
            total_frames,
            frame_interval_us,
        }
    }

    /// Adds Gaussian noise with the given standard deviation to every axis.
    ///
    /// A non-positive or non-finite value disables noise.
    pub fn with_jitter(mut self, std_dev: f64) -> Self {
        self.noise = if std_dev > 0.0 {
            Normal::new(0.0, std_dev).ok()
        } else {
            None
        };
        self
    }

    pub fn add_finger(&mut self, finger: SimFinger) {
        self.fingers.push(finger);
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Generates the next frame, or None once all frames were produced.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.frame >= self.total_frames {
            return None;
        }
        let frame_no = self.frame;
        self.frame += 1;

        let mut samples = Vec::new();
        for finger in &self.fingers {
            let Some(truth) = finger.position_at(frame_no) else {
                continue;
            };
            let measured = match &self.noise {
                Some(noise) => {
                    truth
                        + Vector3::new(
                            noise.sample(&mut self.rng),
                            noise.sample(&mut self.rng),
                            noise.sample(&mut self.rng),
                        )
                }
                None => truth,
            };
            samples.push(FingerSample::new(finger.id, finger.hand_id, measured));
        }

        Some(Frame::new(
            frame_no as i64,
            frame_no as i64 * self.frame_interval_us,
            samples,
        ))
    }

    /// Generates all remaining frames.
    pub fn frames(&mut self) -> Vec<Frame> {
        std::iter::from_fn(|| self.next_frame()).collect()
    }
}
