//! Frame Router - fans frames out to per-hand tracker tasks.
//!
//! # Architecture
//!
//! ```text
//!   Frame stream
//!        │
//!  ┌─────▼──────────────────────────────┐
//!  │            FrameRouter             │
//!  │  • per-frame finger counts         │
//!  │  • registry: hand id → mailbox     │
//!  └──┬──────────────┬──────────────┬───┘
//!     │ mpsc         │ mpsc         │ mpsc
//!  ┌──▼─────┐    ┌───▼────┐    ┌────▼───┐
//!  │ Hand 1 │    │ Hand 2 │    │ Hand n │   one task each
//!  └──┬─────┘    └───┬────┘    └────┬───┘
//!     └──────────────┼──────────────┘
//!                    ▼
//!              Pinch channel
//! ```
//!
//! Mailboxes are bounded (`tracker_mailbox_capacity`, default 1), so the
//! router waits whenever a tracker falls behind. A slow hand therefore
//! throttles the whole frame stream.

use crate::config::{HandRetention, PinchConfig};
use crate::error::{HistoryError, PipelineError};
use crate::frame::{FingerCountSnapshot, Frame, HandId};
use crate::hand_tracker::{run_tracker, HandTracker, TrackerSignal};
use crate::pinch::Pinch;

use pinch_env::PinchContext;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

/// Receiving end of the shared Pinch output channel.
pub type PinchStream = mpsc::Receiver<Pinch>;

type TrackerTask = JoinHandle<Result<(), HistoryError>>;

/// Router-side handle on one hand's tracker task.
struct TrackerHandle {
    mailbox: mpsc::Sender<TrackerSignal>,
    task: TrackerTask,
    last_seen: Duration,
}

/// Routes every finger sample to its hand's tracker and signals finger
/// disappearances.
///
/// Generic over the context so the same router runs on wall-clock time or
/// on a simulated clock.
pub struct FrameRouter<Ctx>
where
    Ctx: PinchContext,
{
    context: Arc<Ctx>,
    config: PinchConfig,

    /// Live trackers, keyed by hand id
    trackers: HashMap<HandId, TrackerHandle>,

    /// Tasks of retired trackers still draining their mailbox
    retired: Vec<(HandId, TrackerTask)>,

    /// First failure among reaped retired trackers, reported at shutdown
    retired_error: Option<PipelineError>,

    /// Finger counts of the previous frame
    previous_counts: FingerCountSnapshot,

    pinch_tx: mpsc::Sender<Pinch>,
    shutdown_tx: watch::Sender<bool>,

    frames_routed: u64,
}

impl<Ctx> FrameRouter<Ctx>
where
    Ctx: PinchContext,
{
    /// Creates a router and the stream its pinches are delivered on.
    pub fn new(
        context: Arc<Ctx>,
        config: PinchConfig,
    ) -> Result<(Self, PinchStream), PipelineError> {
        config.validate()?;

        let (pinch_tx, pinch_rx) = mpsc::channel(config.pinch_channel_capacity);
        let (shutdown_tx, _) = watch::channel(false);

        let router = Self {
            context,
            config,
            trackers: HashMap::new(),
            retired: Vec::new(),
            retired_error: None,
            previous_counts: FingerCountSnapshot::new(),
            pinch_tx,
            shutdown_tx,
            frames_routed: 0,
        };
        Ok((router, pinch_rx))
    }

    /// Number of live hand trackers.
    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// Hand ids with a live tracker, ascending.
    pub fn hand_ids(&self) -> Vec<HandId> {
        let mut ids: Vec<HandId> = self.trackers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn frames_routed(&self) -> u64 {
        self.frames_routed
    }

    /// Routes one frame.
    ///
    /// 1. Forward each sample with a known hand id to its tracker, spawning
    ///    the tracker on first sight of the hand.
    /// 2. Signal every hand present in both this and the previous frame whose
    ///    finger count went down.
    /// 3. Keep this frame's counts for the next call.
    pub async fn route_frame(&mut self, frame: &Frame) -> Result<(), PipelineError> {
        let mut current = FingerCountSnapshot::new();

        for sample in &frame.samples {
            if !sample.has_known_hand() {
                continue;
            }
            current.record(sample);

            let at = self.context.now();
            let hand_id = sample.hand_id;
            if !self.trackers.contains_key(&hand_id) {
                let handle = self.spawn_tracker(hand_id, at);
                self.trackers.insert(hand_id, handle);
            }
            if let Some(handle) = self.trackers.get_mut(&hand_id) {
                handle.last_seen = at;
            }

            self.send(hand_id, TrackerSignal::Sample { sample: sample.clone(), at }).await?;
        }

        for hand_id in self.previous_counts.decreased_in(&current) {
            debug!(
                hand_id,
                frame_id = frame.id,
                before = self.previous_counts.count(hand_id),
                after = current.count(hand_id),
                "finger count dropped"
            );
            let at = self.context.now();
            self.send(hand_id, TrackerSignal::FingerCountDropped { at }).await?;
        }

        self.previous_counts = current;
        self.frames_routed += 1;
        self.retire_idle_trackers().await;
        Ok(())
    }

    /// Routes frames until the sender side closes, then shuts down.
    pub async fn run(mut self, mut frames: mpsc::Receiver<Frame>) -> Result<(), PipelineError> {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = self.route_frame(&frame).await {
                if let Err(shutdown_error) = self.shutdown().await {
                    warn!(error = %shutdown_error, "error during shutdown after routing failure");
                }
                return Err(e);
            }
        }
        self.shutdown().await
    }

    /// Signals every tracker to stop, waits for them to drain their
    /// mailboxes, and reports the first tracker failure.
    ///
    /// The pinch stream closes once this returns.
    pub async fn shutdown(mut self) -> Result<(), PipelineError> {
        self.shutdown_tx.send_replace(true);

        let mut tasks: Vec<(HandId, TrackerTask)> = self
            .trackers
            .drain()
            .map(|(hand_id, handle)| (hand_id, handle.task))
            .collect();
        tasks.append(&mut self.retired);

        let mut first_error = self.retired_error.take();
        for (hand_id, task) in tasks {
            if let Err(e) = join_outcome(hand_id, task.await) {
                first_error.get_or_insert(e);
            }
        }

        debug!(frames = self.frames_routed, "router shut down");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn spawn_tracker(&self, hand_id: HandId, at: Duration) -> TrackerHandle {
        debug!(hand_id, "spawning hand tracker");

        let (mailbox, mailbox_rx) = mpsc::channel(self.config.tracker_mailbox_capacity);
        let tracker = HandTracker::new(hand_id, self.config.clone());
        let task = self.context.spawn(
            &format!("hand-tracker-{hand_id}"),
            run_tracker(
                tracker,
                mailbox_rx,
                self.pinch_tx.clone(),
                self.shutdown_tx.subscribe(),
            ),
        );

        TrackerHandle {
            mailbox,
            task,
            last_seen: at,
        }
    }

    /// Delivers a signal, waiting while the tracker's mailbox is full.
    async fn send(&mut self, hand_id: HandId, signal: TrackerSignal) -> Result<(), PipelineError> {
        let Some(handle) = self.trackers.get(&hand_id) else {
            return Err(PipelineError::TrackerClosed(hand_id));
        };
        if handle.mailbox.send(signal).await.is_ok() {
            return Ok(());
        }

        // The task is gone; find out why.
        match self.trackers.remove(&hand_id) {
            Some(handle) => match join_outcome(hand_id, handle.task.await) {
                Ok(()) => Err(PipelineError::TrackerClosed(hand_id)),
                Err(e) => Err(e),
            },
            None => Err(PipelineError::TrackerClosed(hand_id)),
        }
    }

    async fn retire_idle_trackers(&mut self) {
        let HandRetention::IdleFor(window) = self.config.hand_retention else {
            return;
        };
        self.reap_retired().await;

        let now = self.context.now();
        let idle: Vec<HandId> = self
            .trackers
            .iter()
            .filter(|(_, handle)| now.saturating_sub(handle.last_seen) > window)
            .map(|(hand_id, _)| *hand_id)
            .collect();

        for hand_id in idle {
            if let Some(handle) = self.trackers.remove(&hand_id) {
                debug!(hand_id, "retiring idle hand tracker");
                // Dropping the mailbox sender ends the task once it drains.
                self.retired.push((hand_id, handle.task));
            }
        }
    }

    /// Joins retired trackers whose task already ended, keeping the first failure.
    async fn reap_retired(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.retired)
            .into_iter()
            .partition(|(_, task)| task.is_finished());
        self.retired = running;

        for (hand_id, task) in finished {
            if let Err(e) = join_outcome(hand_id, task.await) {
                warn!(hand_id, error = %e, "retired hand tracker failed");
                self.retired_error.get_or_insert(e);
            }
        }
    }
}

fn join_outcome(
    hand_id: HandId,
    joined: Result<Result<(), HistoryError>, JoinError>,
) -> Result<(), PipelineError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(PipelineError::TrackerFailed { hand_id, source }),
        Err(_) => Err(PipelineError::TrackerPanicked(hand_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FingerSample, UNKNOWN_HAND_ID};
    use nalgebra::Vector3;
    use pinch_env::TokioContext;

    fn frame(id: i64, samples: Vec<FingerSample>) -> Frame {
        Frame::new(id, id * 10_000, samples)
    }

    fn finger(id: i32, hand_id: i32, x: f64) -> FingerSample {
        FingerSample::new(id, hand_id, Vector3::new(x, 200.0, 0.0))
    }

    fn default_router() -> (FrameRouter<TokioContext>, PinchStream) {
        FrameRouter::new(TokioContext::shared(), PinchConfig::default()).unwrap()
    }

    fn idle_router(
        window: Duration,
    ) -> (Arc<TokioContext>, FrameRouter<TokioContext>, PinchStream) {
        let config = PinchConfig {
            hand_retention: HandRetention::IdleFor(window),
            ..Default::default()
        };
        let ctx = TokioContext::shared();
        let (router, pinches) = FrameRouter::new(ctx.clone(), config).unwrap();
        (ctx, router, pinches)
    }

    #[tokio::test]
    async fn test_router_spawns_one_tracker_per_hand() {
        let (mut router, _pinches) = default_router();

        let first = frame(1, vec![finger(10, 1, 0.0), finger(11, 1, 5.0), finger(20, 2, 0.0)]);
        router.route_frame(&first).await.unwrap();
        router.route_frame(&frame(2, vec![finger(10, 1, 0.0)])).await.unwrap();

        assert_eq!(router.hand_ids(), vec![1, 2]);
        assert_eq!(router.frames_routed(), 2);
        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_hand_never_gets_a_tracker() {
        let (mut router, _pinches) = default_router();

        for id in 0..5 {
            router
                .route_frame(&frame(id, vec![finger(10, UNKNOWN_HAND_ID, 0.0)]))
                .await
                .unwrap();
        }

        assert_eq!(router.tracker_count(), 0);
        assert!(router.previous_counts.is_empty());
        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_trackers_are_kept_forever_by_default() {
        let (mut router, _pinches) = default_router();

        router.route_frame(&frame(1, vec![finger(10, 7, 0.0)])).await.unwrap();
        for id in 2..6 {
            router.route_frame(&frame(id, vec![])).await.unwrap();
        }

        assert_eq!(router.hand_ids(), vec![7]);
        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_trackers_are_retired() {
        let (ctx, mut router, _pinches) = idle_router(Duration::from_millis(20));

        router.route_frame(&frame(1, vec![finger(10, 7, 0.0)])).await.unwrap();
        assert_eq!(router.tracker_count(), 1);

        ctx.sleep(Duration::from_millis(30)).await;
        router.route_frame(&frame(2, vec![finger(20, 8, 0.0)])).await.unwrap();

        assert_eq!(router.hand_ids(), vec![8]);
        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_retired_hand_gets_a_fresh_tracker() {
        let (ctx, mut router, _pinches) = idle_router(Duration::from_millis(20));

        router.route_frame(&frame(1, vec![finger(10, 7, 0.0)])).await.unwrap();
        ctx.sleep(Duration::from_millis(30)).await;
        router.route_frame(&frame(2, vec![finger(20, 8, 0.0)])).await.unwrap();
        assert_eq!(router.hand_ids(), vec![8]);

        // Hand 7 comes back, then loses a finger: the drop goes to the new tracker
        let both = frame(3, vec![finger(10, 7, 0.0), finger(11, 7, 5.0), finger(20, 8, 0.0)]);
        router.route_frame(&both).await.unwrap();
        assert_eq!(router.hand_ids(), vec![7, 8]);

        let dropped = frame(4, vec![finger(10, 7, 0.0), finger(20, 8, 0.0)]);
        router.route_frame(&dropped).await.unwrap();

        assert_eq!(router.hand_ids(), vec![7, 8]);
        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_finished_retired_trackers_are_reaped() {
        let (ctx, mut router, _pinches) = idle_router(Duration::from_millis(5));

        // Hands 1 and 2 alternate, so every frame retires the other one
        for id in 0..40 {
            let hand_id = 1 + (id % 2) as i32;
            router.route_frame(&frame(id, vec![finger(10, hand_id, 0.0)])).await.unwrap();
            ctx.sleep(Duration::from_millis(10)).await;

            assert_eq!(router.tracker_count(), 1);
            assert!(router.retired.len() <= 2, "retired grew to {}", router.retired.len());
        }

        router.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = PinchConfig {
            pinch_channel_capacity: 0,
            ..Default::default()
        };
        let result = FrameRouter::new(TokioContext::shared(), config);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_pinch_stream_closes_after_shutdown() {
        let (mut router, mut pinches) = default_router();
        router.route_frame(&frame(1, vec![finger(10, 1, 0.0)])).await.unwrap();

        router.shutdown().await.unwrap();
        assert!(pinches.recv().await.is_none());
    }
}
