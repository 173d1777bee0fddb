// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Statistics helpers shared by the feature extractors.
//!
//! Downstream models are trained on these exact numbers, so every helper
//! pins its estimator: std is the population form and quantiles use
//! linear interpolation between order statistics. Empty inputs yield 0.0
//! across the board.

use statrs::statistics::Statistics;

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().mean()
}

pub fn pop_std(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().population_std_dev()
}

pub fn min(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    Statistics::min(samples.iter())
}

pub fn max(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    Statistics::max(samples.iter())
}

/// Quantile by linear interpolation between order statistics.
pub fn quantile(samples: &[f64], q: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

pub fn median(samples: &[f64]) -> f64 {
    quantile(samples, 0.5)
}

/// The eight-stat summary emitted for the dwell and flight groups:
/// mean, std, min, max, median, q25, q75, range.
pub fn summary8(samples: &[f64]) -> [f64; 8] {
    if samples.is_empty() {
        return [0.0; 8];
    }
    let min = min(samples);
    let max = max(samples);
    [
        mean(samples),
        pop_std(samples),
        min,
        max,
        median(samples),
        quantile(samples, 0.25),
        quantile(samples, 0.75),
        max - min,
    ]
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
