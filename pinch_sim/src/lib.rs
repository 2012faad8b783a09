//! Pinch Deterministic Simulation Harness
//!
//! Runs the real pinch pipeline against a virtual clock:
//! - **Time**: `SimContext` only advances when the driver sleeps between frames
//! - **Sensor**: `FrameOracle` scripts fingertips with seeded Gaussian noise
//! - **Replay**: recorded JSON-lines frames paced by their timestamps
//!
//! Given a seed, a scenario always produces the same frames and the same
//! pinches.

mod context;
mod oracle;
pub mod replay;
pub mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use oracle::{FrameOracle, SimFinger};
pub use replay::{load_frames, ReplayError};
pub use runner::{drive, RunOutcome, ScenarioResult, ScenarioRunner, Schedule};
pub use scenarios::ScenarioId;
