//! Pinch Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the pinch pipeline run
//! against a **Production** clock (tokio) or a **Simulation** clock
//! (virtual time, see `pinch_sim`).
//!
//! # Core Concept
//!
//! The detection heuristics are all time-windowed (50 ms recency, 60 ms
//! staleness). Every timestamp the pipeline uses comes from `now()` on the
//! context, so a simulated clock makes a frame stream fully reproducible:
//! - Time (`now()`, `sleep()`)
//! - Task spawning (`spawn()`)
//!
//! # Example
//!
//! ```ignore
//! use pinch_env::{PinchContext, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let handle = ctx.spawn("hand-tracker-1", async move { 42 });
//! assert_eq!(handle.await.unwrap(), 42);
//! ```

mod context;
mod tokio_impl;

pub use context::PinchContext;
pub use tokio_impl::TokioContext;
