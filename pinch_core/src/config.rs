//! Tuning parameters for the detection pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// What the router does with a hand tracker once its hand stops appearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandRetention {
    /// Keep every tracker for the life of the router. A hand id that
    /// reappears later is routed to the same tracker.
    Forever,

    /// Drop the tracker (and end its task) once its hand has not been seen
    /// for the given duration.
    IdleFor(Duration),
}

/// Configuration for the FrameRouter and its HandTrackers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinchConfig {
    /// Samples kept per finger (default: 15)
    pub history_capacity: usize,

    /// Squared-distance gate between the two newest tips (default: 1900.0).
    /// Compared against the squared distance, never its root.
    pub pinch_distance_threshold_sq: f64,

    /// Tolerated distance increases in the convergence walk (default: 6)
    pub convergence_regression_limit: usize,

    /// A finger updated within this window is a pairing candidate (default: 50ms)
    pub recent_window: Duration,

    /// A finger not updated within this window is evicted (default: 60ms)
    pub stale_window: Duration,

    /// Minimum samples ever appended before a finger can pair (default: 6)
    pub min_history_for_pairing: u64,

    /// Bounded mailbox size per hand tracker (default: 1).
    /// The router waits while a tracker's mailbox is full.
    pub tracker_mailbox_capacity: usize,

    /// Bounded size of the shared Pinch output channel (default: 64)
    pub pinch_channel_capacity: usize,

    /// Tracker lifetime policy (default: Forever)
    pub hand_retention: HandRetention,
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            history_capacity: 15,
            pinch_distance_threshold_sq: 1900.0,
            convergence_regression_limit: 6,
            recent_window: Duration::from_millis(50),
            stale_window: Duration::from_millis(60),
            min_history_for_pairing: 6,
            tracker_mailbox_capacity: 1,
            pinch_channel_capacity: 64,
            hand_retention: HandRetention::Forever,
        }
    }
}

impl PinchConfig {
    /// Checks the values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("history_capacity"));
        }
        if self.tracker_mailbox_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("tracker_mailbox_capacity"));
        }
        if self.pinch_channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("pinch_channel_capacity"));
        }
        if self.recent_window > self.stale_window {
            return Err(ConfigError::WindowOrder {
                recent: self.recent_window,
                stale: self.stale_window,
            });
        }
        let threshold = self.pinch_distance_threshold_sq;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }
}

/// Errors raised by `PinchConfig::validate`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),

    #[error("recent window {recent:?} is longer than stale window {stale:?}")]
    WindowOrder { recent: Duration, stale: Duration },

    #[error("pinch distance threshold must be a positive finite number, got {0}")]
    InvalidThreshold(f64),
}
