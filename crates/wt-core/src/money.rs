//! Monetary rounding.

/// Rounds to 2 decimal places, half away from zero.
///
/// Applied once at the final step of a computation, not per intermediate
/// term, so repeated rounding cannot accumulate error.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
