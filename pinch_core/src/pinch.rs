//! The output event.

use crate::frame::{FingerSample, HandId};
use crate::geometry::midpoint;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A detected pinch: two fingers of one hand converged and disappeared together.
///
/// The position is the midpoint of the two fingers' newest tips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pinch {
    pub hand_id: HandId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Pinch {
    /// Builds a pinch for `hand_id` halfway between two samples.
    pub fn between(hand_id: HandId, a: &FingerSample, b: &FingerSample) -> Self {
        let center = midpoint(&a.tip_position, &b.tip_position);
        Self {
            hand_id,
            x: center.x,
            y: center.y,
            z: center.z,
        }
    }

    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}
