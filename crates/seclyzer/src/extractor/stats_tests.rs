// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{max, mean, median, min, pop_std, quantile, summary8};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn empty_inputs_yield_zero() {
    assert_eq!(mean(&[]), 0.0);
    assert_eq!(pop_std(&[]), 0.0);
    assert_eq!(min(&[]), 0.0);
    assert_eq!(max(&[]), 0.0);
    assert_eq!(median(&[]), 0.0);
    assert_eq!(quantile(&[], 0.25), 0.0);
    assert_eq!(summary8(&[]), [0.0; 8]);
}

#[test]
fn population_std_not_sample_std() {
    // Population: sqrt(((2-3)^2 + (4-3)^2) / 2) = 1.0; sample form is sqrt(2).
    assert!(close(pop_std(&[2.0, 4.0]), 1.0));
}

#[test]
fn quantile_interpolates_linearly() {
    let samples = [1.0, 2.0, 3.0, 4.0];
    assert!(close(quantile(&samples, 0.0), 1.0));
    assert!(close(quantile(&samples, 0.25), 1.75));
    assert!(close(quantile(&samples, 0.5), 2.5));
    assert!(close(quantile(&samples, 0.75), 3.25));
    assert!(close(quantile(&samples, 1.0), 4.0));
}

#[test]
fn quantile_sorts_its_input() {
    assert!(close(quantile(&[4.0, 1.0, 3.0, 2.0], 0.5), 2.5));
}

#[test]
fn median_odd_count_is_exact_order_statistic() {
    assert!(close(median(&[9.0, 1.0, 5.0]), 5.0));
}

#[test]
fn summary8_layout() {
    let samples = [60.0, 100.0];
    let summary = summary8(&samples);
    assert!(close(summary[0], 80.0)); // mean
    assert!(close(summary[1], 20.0)); // population std
    assert!(close(summary[2], 60.0)); // min
    assert!(close(summary[3], 100.0)); // max
    assert!(close(summary[4], 80.0)); // median
    assert!(close(summary[5], 70.0)); // q25
    assert!(close(summary[6], 90.0)); // q75
    assert!(close(summary[7], 40.0)); // range
}

#[test]
fn single_sample_summary() {
    let summary = summary8(&[42.0]);
    assert_eq!(summary, [42.0, 0.0, 42.0, 42.0, 42.0, 42.0, 42.0, 0.0]);
}
