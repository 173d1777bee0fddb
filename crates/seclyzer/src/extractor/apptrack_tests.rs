// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{hour_of_day, AppTransitionModel};

fn us(ms: u64) -> u64 {
    ms * 1000
}

fn feed(model: &mut AppTransitionModel, app: &str, ts_us: u64) {
    let _ = model.observe(app, ts_us);
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── folding focus events ──────────────────────────────────────────────────

#[test]
fn firefox_chrome_firefox_sequence() -> anyhow::Result<()> {
    let mut model = AppTransitionModel::default();

    assert!(model.observe("firefox", us(0)).is_none());
    let first = model
        .observe("chrome", us(60_000))
        .ok_or_else(|| anyhow::anyhow!("expected a closed transition"))?;
    let second = model
        .observe("firefox", us(90_000))
        .ok_or_else(|| anyhow::anyhow!("expected a closed transition"))?;

    assert_eq!(first.from_app, "firefox");
    assert_eq!(first.to_app, "chrome");
    assert!(close(first.duration_ms, 60_000.0));
    assert_eq!(second.from_app, "chrome");
    assert!(close(second.duration_ms, 30_000.0));

    assert_eq!(model.transitions["firefox"]["chrome"], 1);
    assert_eq!(model.transitions["chrome"]["firefox"], 1);
    assert_eq!(model.durations["firefox"].n, 1);
    assert!(close(model.durations["firefox"].sum, 60_000.0));
    assert!(close(model.durations["chrome"].sum, 30_000.0));
    assert_eq!(model.total_events, 3);
    Ok(())
}

#[test]
fn out_of_order_focus_clamps_duration_to_zero() -> anyhow::Result<()> {
    let mut model = AppTransitionModel::default();
    feed(&mut model, "a", us(5_000));
    let transition = model
        .observe("b", us(1_000))
        .ok_or_else(|| anyhow::anyhow!("expected a closed transition"))?;
    assert_eq!(transition.duration_ms, 0.0);
    assert_eq!(model.transitions["a"]["b"], 1);
    Ok(())
}

#[test]
fn marathon_focus_clamps_to_24_hours() -> anyhow::Result<()> {
    let mut model = AppTransitionModel::default();
    feed(&mut model, "a", 0);
    let transition = model
        .observe("b", 48 * 3_600 * 1_000_000)
        .ok_or_else(|| anyhow::anyhow!("expected a closed transition"))?;
    assert!(close(transition.duration_ms, 86_400_000.0));
    Ok(())
}

#[test]
fn duration_stats_track_min_max_and_squares() {
    let mut model = AppTransitionModel::default();
    feed(&mut model, "a", us(0));
    feed(&mut model, "b", us(100)); // a focused 100 ms
    feed(&mut model, "a", us(400)); // b focused 300 ms
    feed(&mut model, "b", us(900)); // a focused 500 ms

    let stats = &model.durations["a"];
    assert_eq!(stats.n, 2);
    assert!(close(stats.sum, 600.0));
    assert!(close(stats.sum_sq, 100.0 * 100.0 + 500.0 * 500.0));
    assert!(close(stats.min, 100.0));
    assert!(close(stats.max, 500.0));
    assert!(close(stats.mean(), 300.0));
}

#[test]
fn outgoing_transition_counts_match_departures() {
    // Invariant: Σ_b transitions[(a, b)] equals focus changes leaving a.
    let mut model = AppTransitionModel::default();
    let sequence = ["a", "b", "a", "c", "a", "b", "b", "c"];
    for (i, app) in sequence.iter().enumerate() {
        feed(&mut model, app, us(i as u64 * 1_000));
    }
    let departures_from_a: u64 = model.transitions["a"].values().sum();
    // a→b, a→c, a→b.
    assert_eq!(departures_from_a, 3);
    let departures_from_b: u64 = model.transitions["b"].values().sum();
    // b→a, b→b, b→c.
    assert_eq!(departures_from_b, 3);
}

#[test]
fn hour_usage_buckets_by_utc_hour() {
    let mut model = AppTransitionModel::default();
    // 1970-01-01 00:30 and 13:30 UTC.
    feed(&mut model, "a", 30 * 60 * 1_000_000);
    feed(&mut model, "a", (13 * 3_600 + 1_800) * 1_000_000);
    assert_eq!(model.hour_usage["a"][0], 1);
    assert_eq!(model.hour_usage["a"][13], 1);
    assert_eq!(model.hour_usage["a"].iter().sum::<u64>(), 2);
}

#[test]
fn hour_of_day_wraps_across_days() {
    assert_eq!(hour_of_day(0), 0);
    assert_eq!(hour_of_day(23 * 3_600 * 1_000_000), 23);
    assert_eq!(hour_of_day(24 * 3_600 * 1_000_000), 0);
    assert_eq!(hour_of_day(49 * 3_600 * 1_000_000), 1);
}

// ── derived probabilities ─────────────────────────────────────────────────

#[test]
fn transition_probabilities_normalize() {
    let mut model = AppTransitionModel::default();
    for target in ["b", "b", "b", "c"] {
        feed(&mut model, "a", us(0));
        feed(&mut model, target, us(1));
    }
    let probs = model.transition_probabilities("a");
    assert!(close(probs["b"], 0.75));
    assert!(close(probs["c"], 0.25));
    assert!(model.transition_probabilities("unseen").is_empty());
}

// ── persistence ───────────────────────────────────────────────────────────

#[test]
fn snapshot_round_trips() -> anyhow::Result<()> {
    let mut model = AppTransitionModel::default();
    feed(&mut model, "firefox", us(0));
    feed(&mut model, "chrome", us(60_000));
    feed(&mut model, "firefox", us(90_000));

    let raw = serde_json::to_string(&model)?;
    let back = AppTransitionModel::rehydrate(&raw)?;
    assert_eq!(back, model);
    Ok(())
}

#[test]
fn rehydrate_rejects_garbage() {
    assert!(AppTransitionModel::rehydrate("not json").is_err());
    assert!(AppTransitionModel::rehydrate(r#"{"transitions": 5}"#).is_err());
}

#[test]
fn rehydrate_tolerates_missing_sections() -> anyhow::Result<()> {
    let model = AppTransitionModel::rehydrate(r#"{"total_events": 7}"#)?;
    assert_eq!(model.total_events, 7);
    assert!(model.transitions.is_empty());
    assert!(model.last_focus.is_none());
    Ok(())
}
