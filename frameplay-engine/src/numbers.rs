//! Numeric conversion helpers centralizing lossy casts.

use num_traits::cast::cast;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Fractional days covered by a signed second count.
#[must_use]
pub fn seconds_to_days(seconds: i64) -> f64 {
    i64_to_f64(seconds) / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_to_days_keeps_fractions_and_sign() {
        assert!((seconds_to_days(43_200) - 0.5).abs() < f64::EPSILON);
        assert!((seconds_to_days(-86_400) + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn usize_conversion_is_exact_for_small_values() {
        assert!((usize_to_f64(3) - 3.0).abs() < f64::EPSILON);
    }
}
