//! Pinch Core - real-time pinch gesture detection
//!
//! Turns a stream of 3D finger-position frames into discrete "pinch"
//! events: two fingers of one hand converging to near-contact and then
//! disappearing from the sensor's view.
//!
//! The pipeline:
//! 1. **Routing**: `FrameRouter` splits each frame per hand and watches
//!    per-hand finger counts between consecutive frames
//! 2. **Tracking**: one `HandTracker` task per hand keeps a bounded
//!    `PositionHistory` per finger and evicts stale fingers
//! 3. **Detection**: on a finger-count drop, the two recent fingers are
//!    checked against a squared-distance gate and a convergence walk

pub mod config;
pub mod convergence;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod hand_tracker;
pub mod history;
pub mod pinch;
pub mod router;

// Re-export key types for convenience
pub use config::{ConfigError, HandRetention, PinchConfig};
pub use convergence::{evaluate_convergence, ConvergenceReport};
pub use error::{HistoryError, PipelineError};
pub use frame::{FingerCountSnapshot, FingerId, FingerSample, Frame, HandId, UNKNOWN_HAND_ID};
pub use hand_tracker::{run_tracker, HandTracker, TrackerSignal};
pub use history::{PositionHistory, SampleRing};
pub use pinch::Pinch;
pub use router::{FrameRouter, PinchStream};
