//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a count to f64, saturating at `f64::MAX` for values that cannot be represented.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(f64::MAX)
}

/// Clamp a probability into `[0.0, ceiling]`, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_probability(value: f64, ceiling: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let ceiling = if ceiling.is_finite() {
        ceiling.clamp(0.0, 1.0)
    } else {
        1.0
    };
    value.clamp(0.0, ceiling)
}

/// Percentage of `part` over `whole`, rounded to one decimal place. Zero when `whole` is zero.
#[must_use]
pub fn percent_of(part: usize, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = count_to_f64(part) / f64::from(whole) * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Whole milliseconds from a JS-style `f64` timestamp. Negative or non-finite
/// inputs map to zero.
#[must_use]
pub fn millis_from_f64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, u64>(value.floor()).unwrap_or(u64::MAX)
}
