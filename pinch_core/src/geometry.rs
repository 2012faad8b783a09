//! Distance and midpoint helpers for fingertip positions.

use nalgebra::Vector3;

/// Sum of the squared per-axis differences between two points.
///
/// Deliberately not square-rooted: the pinch threshold is calibrated against
/// the squared value.
#[inline]
pub fn squared_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    (a - b).norm_squared()
}

/// The point halfway between `a` and `b` on every axis.
#[inline]
pub fn midpoint(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    (a + b) * 0.5
}
