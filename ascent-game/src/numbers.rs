//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Clamp a probability into `[0, 1]`, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Clamp a cost-like figure to be non-negative, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_non_negative(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.max(0.0)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert u32 to usize, saturating on exotic targets.
#[must_use]
pub fn u32_to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Convert an i64 into the u32 range, clamping negatives to 0 and saturating at `u32::MAX`.
#[must_use]
pub fn clamp_i64_to_u32(value: i64) -> u32 {
    if value <= 0 {
        return 0;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}
