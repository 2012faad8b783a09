//! Scenario runner - drives the real pipeline with synthetic or recorded frames.

use crate::context::SimContext;
use crate::scenarios::ScenarioId;

use pinch_core::{Frame, FrameRouter, Pinch, PinchConfig, PipelineError};
use pinch_env::PinchContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A frame and how long to wait after routing it.
pub type Schedule = Vec<(Frame, Duration)>;

/// What came out of one pass through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Pinches in the order they arrived on the stream
    pub pinches: Vec<Pinch>,

    pub frames_routed: u64,

    /// Live hand trackers just before shutdown
    pub trackers: usize,
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    pub frames_routed: u64,

    /// Pinches the pipeline reported
    pub pinches: Vec<Pinch>,

    pub expected_pinches: usize,

    /// Live hand trackers at the end of the run
    pub trackers: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Runs gesture scenarios on a virtual clock.
pub struct ScenarioRunner {
    /// Seed for sensor noise
    seed: u64,

    /// Sensor tick length
    frame_interval: Duration,

    /// Standard deviation of per-axis position noise (mm)
    jitter_mm: f64,

    config: PinchConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            frame_interval: Duration::from_millis(10),
            jitter_mm: 0.3,
            config: PinchConfig::default(),
        }
    }

    /// Sets the frame interval used by scenarios that do not override it.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Sets the position noise.
    pub fn with_jitter(mut self, jitter_mm: f64) -> Self {
        self.jitter_mm = jitter_mm;
        self
    }

    /// Sets the pipeline configuration.
    pub fn with_config(mut self, config: PinchConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("{}", scenario.description());

        let interval = scenario.frame_interval_override().unwrap_or(self.frame_interval);
        let frames = scenario.build_oracle(self.seed, interval, self.jitter_mm).frames();
        let schedule: Schedule = frames.into_iter().map(|frame| (frame, interval)).collect();

        let expected_pinches = scenario.expected_pinches();
        let outcome = drive(SimContext::shared(), self.config.clone(), schedule, |pinch| {
            debug!(hand_id = pinch.hand_id, x = pinch.x, y = pinch.y, z = pinch.z, "pinch");
        })
        .await;

        let (outcome, failure_reason) = match outcome {
            Ok(outcome) => {
                let reason = if outcome.pinches.len() != expected_pinches {
                    Some(format!(
                        "expected {} pinches, got {}",
                        expected_pinches,
                        outcome.pinches.len()
                    ))
                } else if outcome.trackers != scenario.expected_trackers() {
                    Some(format!(
                        "expected {} hand trackers, got {}",
                        scenario.expected_trackers(),
                        outcome.trackers
                    ))
                } else {
                    None
                };
                (outcome, reason)
            }
            Err(e) => (RunOutcome::default(), Some(format!("pipeline error: {}", e))),
        };

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            frames_routed: outcome.frames_routed,
            pinches: outcome.pinches,
            expected_pinches,
            trackers: outcome.trackers,
            failure_reason,
        }
    }

    /// Replays recorded frames on a virtual clock.
    pub async fn replay<F>(
        &self,
        schedule: Schedule,
        on_pinch: F,
    ) -> Result<RunOutcome, PipelineError>
    where
        F: FnMut(&Pinch) + Send + 'static,
    {
        drive(SimContext::shared(), self.config.clone(), schedule, on_pinch).await
    }
}

/// Routes every scheduled frame through a fresh router, sleeping on the
/// context between frames, then shuts the router down.
///
/// Pinches are drained concurrently so a long run never fills the pinch
/// channel and stalls the trackers.
pub async fn drive<Ctx, F>(
    context: Arc<Ctx>,
    config: PinchConfig,
    schedule: Schedule,
    mut on_pinch: F,
) -> Result<RunOutcome, PipelineError>
where
    Ctx: PinchContext,
    F: FnMut(&Pinch) + Send + 'static,
{
    let (mut router, mut pinch_rx) = FrameRouter::new(context.clone(), config)?;

    let collector = tokio::spawn(async move {
        let mut pinches = Vec::new();
        while let Some(pinch) = pinch_rx.recv().await {
            on_pinch(&pinch);
            pinches.push(pinch);
        }
        pinches
    });

    for (frame, wait) in &schedule {
        if let Err(e) = router.route_frame(frame).await {
            if let Err(shutdown_error) = router.shutdown().await {
                warn!(error = %shutdown_error, "error during shutdown after routing failure");
            }
            return Err(e);
        }
        context.sleep(*wait).await;
    }

    let frames_routed = router.frames_routed();
    let trackers = router.tracker_count();
    router.shutdown().await?;

    let pinches = match collector.await {
        Ok(pinches) => pinches,
        Err(e) => {
            warn!(error = %e, "pinch collector failed");
            Vec::new()
        }
    };

    Ok(RunOutcome {
        pinches,
        frames_routed,
        trackers,
    })
}
