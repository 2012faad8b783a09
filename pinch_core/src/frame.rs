//! Input records from the sensor feed and the per-frame finger counts.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sensor-assigned hand identifier, unique per hand while it stays visible.
pub type HandId = i32;

/// Sensor-assigned finger identifier. A finger that leaves and re-enters the
/// sensor's view may come back under a new id.
pub type FingerId = i32;

/// Hand id the sensor reports when it cannot attribute a finger to a hand.
pub const UNKNOWN_HAND_ID: HandId = -1;

// ============================================================================
// SENSOR RECORDS
// ============================================================================

/// One tracked fingertip at one sensor tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerSample {
    /// Finger id, scoped to its current visibility
    pub id: FingerId,

    /// Owning hand id (`UNKNOWN_HAND_ID` if unattributed)
    pub hand_id: HandId,

    /// Tip position [x, y, z] in sensor units (millimetres for a Leap-style device)
    pub tip_position: Vector3<f64>,
}

impl FingerSample {
    pub fn new(id: FingerId, hand_id: HandId, tip_position: Vector3<f64>) -> Self {
        Self {
            id,
            hand_id,
            tip_position,
        }
    }

    /// True if the sample belongs to an identified hand.
    #[inline]
    pub fn has_known_hand(&self) -> bool {
        self.hand_id != UNKNOWN_HAND_ID
    }
}

/// The full set of finger samples captured at one sensor tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Sensor frame counter
    #[serde(default)]
    pub id: i64,

    /// Sensor capture time in microseconds. Only used for logging and replay pacing.
    #[serde(default)]
    pub timestamp_us: i64,

    /// Samples in sensor order
    pub samples: Vec<FingerSample>,
}

impl Frame {
    pub fn new(id: i64, timestamp_us: i64, samples: Vec<FingerSample>) -> Self {
        Self {
            id,
            timestamp_us,
            samples,
        }
    }
}

// ============================================================================
// PER-FRAME COUNTS
// ============================================================================

/// Number of samples each identified hand contributed to one frame.
///
/// A hand with no samples in the frame is absent, not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerCountSnapshot {
    counts: HashMap<HandId, usize>,
}

impl FingerCountSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one sample for its hand. Samples from the unknown hand are ignored.
    pub fn record(&mut self, sample: &FingerSample) {
        if !sample.has_known_hand() {
            return;
        }
        *self.counts.entry(sample.hand_id).or_insert(0) += 1;
    }

    /// Builds the snapshot for a whole frame.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut snapshot = Self::new();
        for sample in &frame.samples {
            snapshot.record(sample);
        }
        snapshot
    }

    pub fn count(&self, hand_id: HandId) -> Option<usize> {
        self.counts.get(&hand_id).copied()
    }

    pub fn contains(&self, hand_id: HandId) -> bool {
        self.counts.contains_key(&hand_id)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Hands present in both snapshots whose count went down from `self` to `current`.
    ///
    /// Hands missing from `current` are skipped, so a hand that vanishes
    /// entirely in one frame is never reported here.
    pub fn decreased_in(&self, current: &FingerCountSnapshot) -> Vec<HandId> {
        let mut dropped: Vec<HandId> = self
            .counts
            .iter()
            .filter_map(|(hand_id, &previous)| match current.count(*hand_id) {
                Some(now) if now < previous => Some(*hand_id),
                _ => None,
            })
            .collect();
        dropped.sort_unstable();
        dropped
    }
}
