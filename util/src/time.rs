//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a number of milliseconds into a std duration.
///
/// Negative and NaN values saturate to zero, values too large to represent
/// (including positive infinity) saturate to `Duration::MAX`.
pub fn millis_to_duration(millis: f64) -> std::time::Duration {
    if millis.is_nan() || millis <= 0.0 {
        return std::time::Duration::from_secs(0);
    }

    let secs = millis / 1000.0;

    // u64::MAX as f64 rounds up, so anything at or above it cannot be held
    if secs >= u64::MAX as f64 {
        std::time::Duration::MAX
    } else {
        std::time::Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(100.0), std::time::Duration::from_millis(100));
        assert_eq!(millis_to_duration(-5.0), std::time::Duration::from_secs(0));
        assert_eq!(millis_to_duration(f64::NAN), std::time::Duration::from_secs(0));
    }

    #[test]
    fn test_millis_to_duration_saturates() {
        assert_eq!(millis_to_duration(f64::MAX), std::time::Duration::MAX);
        assert_eq!(millis_to_duration(f64::INFINITY), std::time::Duration::MAX);
        assert_eq!(millis_to_duration(1e22), std::time::Duration::MAX);

        // Largest values still below the limit convert normally
        let big = millis_to_duration(1e18);
        assert_eq!(big.as_secs(), 1_000_000_000_000_000);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}
