//! Binomial distribution helpers for the reference oracle.

use crate::numbers::clamp_unit;

fn ln_choose(n: u32, k: u32) -> f64 {
    let k = k.min(n - k);
    (1..=k)
        .map(|i| (f64::from(n - k + i) / f64::from(i)).ln())
        .sum()
}

/// Probability of exactly `k` failures in `n` trials.
#[must_use]
pub fn pmf(k: u32, n: u32, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let log_mass = ln_choose(n, k) + f64::from(k) * p.ln() + f64::from(n - k) * (1.0 - p).ln();
    clamp_unit(log_mass.exp())
}

/// Probability of at most `k` failures in `n` trials.
#[must_use]
pub fn cdf(k: u32, n: u32, p: f64) -> f64 {
    if k >= n {
        return 1.0;
    }
    clamp_unit((0..=k).map(|i| pmf(i, n, p)).sum())
}
