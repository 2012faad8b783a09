//! Core environment context trait for the pinch pipeline.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the frame router and the
/// per-hand trackers can run against wall-clock time in production and a
/// virtual clock in simulation.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `std::time::Instant`, `tokio::time`
/// - **Simulation**: `SimContext` - a manually advanced virtual clock
///
/// # Determinism
///
/// The pipeline never reads the system clock directly. Arrival times of
/// finger samples are taken from `now()` when the router dispatches them.
#[async_trait]
pub trait PinchContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a named background task and returns its handle.
    ///
    /// The name is attached to the task's tracing span.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}
