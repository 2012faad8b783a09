//! Gesture scenarios for deterministic simulation.
//!
//! Each scenario scripts one or two hands and states how many pinches the
//! pipeline must report for it.

use crate::oracle::{FrameOracle, SimFinger};
use nalgebra::Vector3;
use pinch_core::{FingerId, HandId, UNKNOWN_HAND_ID};
use std::time::Duration;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Thumb and index close in, index vanishes
    CleanPinch,

    /// Fingers drift apart while inside the distance gate, one vanishes
    SpreadApart,

    /// Fingers converge but stay outside the distance gate
    FarApart,

    /// Clean pinch geometry at a sensor rate too slow for the recency window
    LowFrameRate,

    /// Clean pinch geometry, but the sensor never attributes the hand
    UnknownHand,

    /// Two hands pinching on different frames
    TwoHands,

    /// A second finger shows up too briefly to be paired
    LoneFinger,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::CleanPinch,
            ScenarioId::SpreadApart,
            ScenarioId::FarApart,
            ScenarioId::LowFrameRate,
            ScenarioId::UnknownHand,
            ScenarioId::TwoHands,
            ScenarioId::LoneFinger,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CleanPinch => "clean_pinch",
            ScenarioId::SpreadApart => "spread_apart",
            ScenarioId::FarApart => "far_apart",
            ScenarioId::LowFrameRate => "low_frame_rate",
            ScenarioId::UnknownHand => "unknown_hand",
            ScenarioId::TwoHands => "two_hands",
            ScenarioId::LoneFinger => "lone_finger",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::CleanPinch => "Thumb and index converge from 80mm to 30mm, index vanishes",
            ScenarioId::SpreadApart => {
                "Fingers spread from 5mm to 42mm, one vanishes inside the gate"
            }
            ScenarioId::FarApart => "Fingers converge from 120mm to 60mm, never inside the gate",
            ScenarioId::LowFrameRate => {
                "Clean pinch sampled every 55ms, past the 50ms recency window"
            }
            ScenarioId::UnknownHand => "Clean pinch with every sample attributed to hand -1",
            ScenarioId::TwoHands => "Left hand pinches on frame 10, right hand on frame 14",
            ScenarioId::LoneFinger => "Second finger visible for 3 frames only, then vanishes",
        }
    }

    /// Number of pinches the pipeline must report.
    pub fn expected_pinches(&self) -> usize {
        match self {
            ScenarioId::CleanPinch => 1,
            ScenarioId::TwoHands => 2,
            _ => 0,
        }
    }

    /// Number of hand trackers the router must hold at the end of the run.
    pub fn expected_trackers(&self) -> usize {
        match self {
            ScenarioId::UnknownHand => 0,
            ScenarioId::TwoHands => 2,
            _ => 1,
        }
    }

    /// Frame interval this scenario needs, if it overrides the runner's.
    pub fn frame_interval_override(&self) -> Option<Duration> {
        match self {
            ScenarioId::LowFrameRate => Some(Duration::from_millis(55)),
            _ => None,
        }
    }

    /// Scripts the scenario's fingers into a new oracle.
    pub fn build_oracle(&self, seed: u64, frame_interval: Duration, jitter_mm: f64) -> FrameOracle {
        let interval_us = frame_interval.as_micros() as i64;
        let left = Vector3::new(-80.0, 180.0, 20.0);
        let right = Vector3::new(90.0, 200.0, 0.0);

        let mut oracle = match self {
            ScenarioId::SpreadApart => FrameOracle::new(seed, 17, interval_us),
            ScenarioId::TwoHands => FrameOracle::new(seed, 16, interval_us),
            _ => FrameOracle::new(seed, 12, interval_us),
        }
        .with_jitter(jitter_mm);

        match self {
            ScenarioId::CleanPinch | ScenarioId::LowFrameRate => {
                add_closing_pair(&mut oracle, 1, (10, 11), left, 80.0, 30.0, 0..10);
            }
            ScenarioId::SpreadApart => {
                add_closing_pair(&mut oracle, 1, (10, 11), left, 5.0, 42.0, 0..15);
            }
            ScenarioId::FarApart => {
                add_closing_pair(&mut oracle, 1, (10, 11), left, 120.0, 60.0, 0..10);
            }
            ScenarioId::UnknownHand => {
                add_closing_pair(&mut oracle, UNKNOWN_HAND_ID, (10, 11), left, 80.0, 30.0, 0..10);
            }
            ScenarioId::TwoHands => {
                add_closing_pair(&mut oracle, 1, (10, 11), left, 80.0, 30.0, 0..10);
                add_closing_pair(&mut oracle, 2, (20, 21), right, 90.0, 25.0, 0..14);
            }
            ScenarioId::LoneFinger => {
                oracle.add_finger(SimFinger::fixed(10, 1, left, 0..12));
                let index = left + Vector3::new(20.0, 0.0, 0.0);
                oracle.add_finger(SimFinger::fixed(11, 1, index, 7..10));
            }
        }

        oracle
    }
}

/// Adds a thumb that stays put until the end of the oracle and a second
/// finger that closes from `start_gap` to `end_gap` mm along x while
/// `visible`, then vanishes.
fn add_closing_pair(
    oracle: &mut FrameOracle,
    hand_id: HandId,
    ids: (FingerId, FingerId),
    anchor: Vector3<f64>,
    start_gap: f64,
    end_gap: f64,
    visible: std::ops::Range<u64>,
) {
    let thumb_end = oracle.total_frames().max(visible.end + 1);
    oracle.add_finger(SimFinger::fixed(ids.0, hand_id, anchor, visible.start..thumb_end));
    oracle.add_finger(SimFinger::linear(
        ids.1,
        hand_id,
        anchor + Vector3::new(start_gap, 0.0, 0.0),
        anchor + Vector3::new(end_gap, 0.0, 0.0),
        visible,
    ));
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clean_pinch" | "cleanpinch" => Ok(ScenarioId::CleanPinch),
            "spread_apart" | "spreadapart" => Ok(ScenarioId::SpreadApart),
            "far_apart" | "farapart" => Ok(ScenarioId::FarApart),
            "low_frame_rate" | "lowframerate" => Ok(ScenarioId::LowFrameRate),
            "unknown_hand" | "unknownhand" => Ok(ScenarioId::UnknownHand),
            "two_hands" | "twohands" => Ok(ScenarioId::TwoHands),
            "lone_finger" | "lonefinger" => Ok(ScenarioId::LoneFinger),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
