//! Convergence test for a pair of finger histories.
//!
//! Two fingers that really pinched should show a mostly non-increasing
//! distance over their recent history. Fingers that merely crossed paths
//! will be close at one instant but drift apart across the window.
//!
//! The walk samples every other offset from the start of both histories,
//! comparing each squared distance with the previous sampled one:
//!
//! ```text
//! count = min(total_added(A), total_added(B), capacity)
//! for i in (0..count).step_by(2):
//!     d = |A[i] - B[i]|²
//!     if d_last != 0 && d_last < d: regressions += 1
//!     d_last = d
//! converging = regressions <= limit
//! ```
//!
//! Short histories get few chances to regress, so the test is lenient for
//! them. That bias is kept as is.

use crate::error::HistoryError;
use crate::geometry::squared_distance;
use crate::history::PositionHistory;

/// Outcome of one convergence walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// Offsets compared
    pub sampled_steps: usize,

    /// Steps where the distance grew since the previous sampled step
    pub regressions: usize,

    /// `regressions <= limit`
    pub converging: bool,
}

/// Runs the convergence walk over two histories.
///
/// `capacity` caps the walk length; `regression_limit` is the number of
/// distance increases still considered converging.
pub fn evaluate_convergence(
    a: &PositionHistory,
    b: &PositionHistory,
    capacity: usize,
    regression_limit: usize,
) -> Result<ConvergenceReport, HistoryError> {
    let count = a.total_added().min(b.total_added()).min(capacity as u64) as usize;

    let mut d_last = 0.0;
    let mut regressions = 0;
    let mut sampled_steps = 0;

    for i in (0..count).step_by(2) {
        let tip_a = &a.read_from_start(i)?.tip_position;
        let tip_b = &b.read_from_start(i)?.tip_position;
        let d_current = squared_distance(tip_a, tip_b);

        if d_last != 0.0 && d_last < d_current {
            regressions += 1;
        }
        d_last = d_current;
        sampled_steps += 1;
    }

    Ok(ConvergenceReport {
        sampled_steps,
        regressions,
        converging: regressions <= regression_limit,
    })
}
