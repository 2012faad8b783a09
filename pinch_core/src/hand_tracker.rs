//! Per-hand tracking state and the pairing-and-pinch procedure.
//!
//! A `HandTracker` owns the position histories of one hand's fingers. It is
//! a plain state machine driven by timestamped signals; `run_tracker` is the
//! task that owns one tracker and feeds it from the hand's mailbox.
//!
//! On a "finger count dropped" signal the tracker runs:
//! 1. Eviction (fingers not updated within the stale window)
//! 2. Candidate selection (recent AND enough history), exactly two required
//! 3. Distance gate on the two newest tips (squared, strict `<`)
//! 4. Convergence gate over the two histories
//! 5. Eviction again

use crate::config::PinchConfig;
use crate::convergence::evaluate_convergence;
use crate::error::HistoryError;
use crate::frame::{FingerId, FingerSample, HandId};
use crate::geometry::squared_distance;
use crate::history::PositionHistory;
use crate::pinch::Pinch;

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Messages delivered to a hand's tracker, stamped with their arrival time.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerSignal {
    /// A new position for one of this hand's fingers.
    Sample { sample: FingerSample, at: Duration },

    /// The hand has fewer fingers than in the previous frame.
    FingerCountDropped { at: Duration },
}

/// Tracking state for one hand.
#[derive(Debug)]
pub struct HandTracker {
    hand_id: HandId,
    config: PinchConfig,
    fingers: HashMap<FingerId, PositionHistory>,
}

impl HandTracker {
    pub fn new(hand_id: HandId, config: PinchConfig) -> Self {
        Self {
            hand_id,
            config,
            fingers: HashMap::new(),
        }
    }

    pub fn hand_id(&self) -> HandId {
        self.hand_id
    }

    /// Number of fingers currently tracked.
    pub fn finger_count(&self) -> usize {
        self.fingers.len()
    }

    pub fn history(&self, finger_id: FingerId) -> Option<&PositionHistory> {
        self.fingers.get(&finger_id)
    }

    /// Applies one signal. Returns the pinch it produced, if any.
    pub fn handle(&mut self, signal: TrackerSignal) -> Result<Option<Pinch>, HistoryError> {
        match signal {
            TrackerSignal::Sample { sample, at } => {
                self.record_sample(sample, at);
                Ok(None)
            }
            TrackerSignal::FingerCountDropped { at } => self.on_finger_count_dropped(at),
        }
    }

    /// Appends a sample to its finger's history, creating the history on first sight.
    pub fn record_sample(&mut self, sample: FingerSample, at: Duration) {
        let capacity = self.config.history_capacity;
        self.fingers
            .entry(sample.id)
            .or_insert_with(|| PositionHistory::new(capacity))
            .append(sample, at);
        self.evict_stale(at);
    }

    /// Removes fingers not updated within the stale window. Returns how many were removed.
    pub fn evict_stale(&mut self, now: Duration) -> usize {
        let stale_window = self.config.stale_window;
        let before = self.fingers.len();
        self.fingers.retain(|_, history| history.age(now) <= stale_window);

        let evicted = before - self.fingers.len();
        if evicted > 0 {
            debug!(hand_id = self.hand_id, evicted, "evicted stale fingers");
        }
        evicted
    }

    /// Fingers eligible for pairing at `now`, ordered by finger id.
    pub fn candidates(&self, now: Duration) -> Vec<(FingerId, &PositionHistory)> {
        let mut candidates: Vec<(FingerId, &PositionHistory)> = self
            .fingers
            .iter()
            .filter(|(_, history)| {
                history.age(now) < self.config.recent_window
                    && history.total_added() >= self.config.min_history_for_pairing
            })
            .map(|(id, history)| (*id, history))
            .collect();
        candidates.sort_by_key(|(id, _)| *id);
        candidates
    }

    /// Runs the pairing-and-pinch procedure.
    pub fn on_finger_count_dropped(
        &mut self,
        now: Duration,
    ) -> Result<Option<Pinch>, HistoryError> {
        self.evict_stale(now);
        let result = self.evaluate_pinch(now);
        self.evict_stale(now);
        result
    }

    fn evaluate_pinch(&self, now: Duration) -> Result<Option<Pinch>, HistoryError> {
        let candidates = self.candidates(now);

        let ((id_a, a), (id_b, b)) = match candidates.as_slice() {
            [first, second] => (*first, *second),
            _ => {
                debug!(
                    hand_id = self.hand_id,
                    found = candidates.len(),
                    "could not find exactly two candidate fingers"
                );
                return Ok(None);
            }
        };

        let latest_a = a.latest()?;
        let latest_b = b.latest()?;
        let distance_sq = squared_distance(&latest_a.tip_position, &latest_b.tip_position);

        if distance_sq >= self.config.pinch_distance_threshold_sq {
            debug!(
                hand_id = self.hand_id,
                distance_sq,
                threshold = self.config.pinch_distance_threshold_sq,
                "fingers too far apart"
            );
            return Ok(None);
        }

        let report = evaluate_convergence(
            a,
            b,
            self.config.history_capacity,
            self.config.convergence_regression_limit,
        )?;

        if !report.converging {
            debug!(
                hand_id = self.hand_id,
                fingers = ?(id_a, id_b),
                regressions = report.regressions,
                steps = report.sampled_steps,
                "failed to converge"
            );
            return Ok(None);
        }

        debug!(
            hand_id = self.hand_id,
            fingers = ?(id_a, id_b),
            distance_sq,
            regressions = report.regressions,
            "pinch detected"
        );
        Ok(Some(Pinch::between(self.hand_id, latest_a, latest_b)))
    }
}

/// Drives a tracker from its mailbox until the mailbox closes.
///
/// Signals are applied strictly in arrival order. When `shutdown` flips to
/// true (or its sender goes away) the mailbox is closed and the signals
/// already queued are still processed before the task ends.
pub async fn run_tracker(
    mut tracker: HandTracker,
    mut mailbox: mpsc::Receiver<TrackerSignal>,
    pinches: mpsc::Sender<Pinch>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), HistoryError> {
    let hand_id = tracker.hand_id();
    let mut draining = false;

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed(), if !draining => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(hand_id, "shutdown requested, draining mailbox");
                    mailbox.close();
                    draining = true;
                }
            }

            signal = mailbox.recv() => {
                let Some(signal) = signal else { break };

                let emitted = tracker.handle(signal).map_err(|e| {
                    error!(hand_id, error = %e, "tracker invariant violated");
                    e
                })?;

                if let Some(pinch) = emitted {
                    info!(hand_id, x = pinch.x, y = pinch.y, z = pinch.z, "pinch");
                    if pinches.send(pinch).await.is_err() {
                        warn!(hand_id, "pinch receiver dropped, discarding pinch");
                    }
                }
            }
        }
    }

    debug!(hand_id, "tracker stopped");
    Ok(())
}
