//! Tolerant floating-point comparisons used by all grid geometry.
//!
//! Positions are repeatedly normalised and scaled while a tick is resolved, so
//! exact comparisons drift. Every equality or ordering check against zero, a
//! grid line, or another coordinate goes through these helpers instead.

/// Largest absolute difference at which two coordinates are considered equal.
pub const EPSILON: f64 = 1e-9;

/// Reports whether `a` and `b` differ by less than [`EPSILON`].
#[must_use]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Reports whether `a` is within [`EPSILON`] of zero.
#[must_use]
pub fn approx_zero(a: f64) -> bool {
    approx_eq(a, 0.0)
}

/// Strict `a < b` that treats nearly equal values as equal.
#[must_use]
pub fn approx_lt(a: f64, b: f64) -> bool {
    a < b && !approx_eq(a, b)
}

/// Strict `a > b` that treats nearly equal values as equal.
#[must_use]
pub fn approx_gt(a: f64, b: f64) -> bool {
    a > b && !approx_eq(a, b)
}

/// `a <= b` that accepts values within [`EPSILON`] above `b`.
#[must_use]
pub fn approx_le(a: f64, b: f64) -> bool {
    a < b || approx_eq(a, b)
}

/// `a >= b` that accepts values within [`EPSILON`] below `b`.
#[must_use]
pub fn approx_ge(a: f64, b: f64) -> bool {
    a > b || approx_eq(a, b)
}

/// Reports whether the coordinate lies on a grid line, i.e. is integral.
#[must_use]
pub fn on_grid_line(value: f64) -> bool {
    approx_eq(value, value.round())
}
