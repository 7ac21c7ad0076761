//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, Num};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value to the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Euclidean modulus, the result always has the sign of `rhs`.
///
/// Unlike the `%` operator `modulus(-1, 2)` is `1`, not `-1`. Works for both integer and
/// floating point types.
pub fn modulus<T>(lhs: T, rhs: T) -> T
where
    T: Num + Copy
{
    ((lhs % rhs) + rhs) % rhs
}

/// Wrap an angle in degrees into the range `[-180, 180)`.
pub fn wrap_deg<T>(angle_deg: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap_or_else(T::zero);
    let turn = half_turn + half_turn;

    modulus(angle_deg + half_turn, turn) - half_turn
}

/// Iterate from `start` (inclusive) to `end` (exclusive) in increments of `step`.
///
/// Each element is computed as `start + i * step` so rounding error does not accumulate along
/// the range.
pub fn float_range(start: f64, end: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = if step > 0.0 && end > start {
        // Subtract a small tolerance so that an end value which lands exactly on a step is
        // excluded despite rounding.
        ((end - start) / step - 1e-9).ceil().max(0.0) as usize
    } else {
        0
    };

    (0..count).map(move |i| start + i as f64 * step)
}
