//! Error types for the pinch pipeline.
//!
//! "No pinch this cycle" is not an error and never shows up here.

use crate::config::ConfigError;
use crate::frame::HandId;
use thiserror::Error;

/// A read outside the occupied part of a history.
///
/// Reaching this means offset arithmetic is wrong somewhere, not that the
/// input stream was unusual.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history offset {offset} out of range (occupancy {len})")]
    OffsetOutOfRange { offset: usize, len: usize },
}

/// Errors surfaced by the FrameRouter.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The tracker's mailbox is closed because its task has exited.
    #[error("Tracker for hand {0} is no longer running")]
    TrackerClosed(HandId),

    /// A tracker hit an invariant violation and stopped.
    #[error("Tracker for hand {hand_id} failed: {source}")]
    TrackerFailed {
        hand_id: HandId,
        #[source]
        source: HistoryError,
    },

    #[error("Tracker task for hand {0} panicked")]
    TrackerPanicked(HandId),
}
