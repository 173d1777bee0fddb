// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keystroke dynamics extractor.
//!
//! Buffers raw key transitions per user and, on every tick, computes a
//! 140-dimensional feature vector over the trailing window. The field
//! list is the training schema: names and order are frozen in
//! [`KEYSTROKE_FIELDS`] and every emission carries the full set, zeros
//! included, so the training time grid stays dense.
//!
//! Pairing rules: a press pairs with the next release of the same key
//! within 1000 ms (a newer press of the same key overwrites the pending
//! one); flight is measured from the previous completed pair's release to
//! this pair's press and kept within 2000 ms. Digraph slots are assigned
//! per emission by sorting the window's observed key pairs
//! lexicographically — a frozen rule rather than a frozen table, which is
//! what keeps field semantics stable across runs.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tokio_util::sync::CancellationToken;

use crate::bus::{EVENTS_CHANNEL, FEATURES_KEYSTROKE_CHANNEL};
use crate::events::{Event, Phase};
use crate::extractor::{stats, submit, FeatureRecord};
use crate::state::{epoch_us, ExtractorContext};

/// Hard cap on buffered key transitions per user; oldest drop first.
const BUFFER_CAP: usize = 10_000;
/// Longest key hold accepted as a dwell sample, ms.
const DWELL_MAX_MS: f64 = 1_000.0;
/// Longest release→press gap accepted as a flight sample, ms.
const FLIGHT_MAX_MS: f64 = 2_000.0;
/// Digraph slots carrying the mean/std/count/min/max bands.
const DIGRAPH_SLOTS: usize = 20;
/// Leading slots that also carry the median band.
const DIGRAPH_MEDIAN_SLOTS: usize = 10;
/// Consecutive presses closer than this belong to a burst, ms.
const BURST_GAP_MS: f64 = 150.0;
/// Minimum presses for a run to count as a burst.
const BURST_MIN_KEYS: usize = 3;
/// Inter-press gap counted as a pause, ms.
const PAUSE_GAP_MS: f64 = 500.0;

pub const KEYSTROKE_MEASUREMENT: &str = "keystroke_features";
pub const KEYSTROKE_FIELD_COUNT: usize = 140;

/// Canonical field-name list. Frozen: downstream models index by it.
pub const KEYSTROKE_FIELDS: [&str; KEYSTROKE_FIELD_COUNT] = [
    // dwell
    "dwell_mean",
    "dwell_std",
    "dwell_min",
    "dwell_max",
    "dwell_median",
    "dwell_q25",
    "dwell_q75",
    "dwell_range",
    // flight
    "flight_mean",
    "flight_std",
    "flight_min",
    "flight_max",
    "flight_median",
    "flight_q25",
    "flight_q75",
    "flight_range",
    // digraph mean band
    "digraph_0_mean",
    "digraph_1_mean",
    "digraph_2_mean",
    "digraph_3_mean",
    "digraph_4_mean",
    "digraph_5_mean",
    "digraph_6_mean",
    "digraph_7_mean",
    "digraph_8_mean",
    "digraph_9_mean",
    "digraph_10_mean",
    "digraph_11_mean",
    "digraph_12_mean",
    "digraph_13_mean",
    "digraph_14_mean",
    "digraph_15_mean",
    "digraph_16_mean",
    "digraph_17_mean",
    "digraph_18_mean",
    "digraph_19_mean",
    // digraph std band
    "digraph_0_std",
    "digraph_1_std",
    "digraph_2_std",
    "digraph_3_std",
    "digraph_4_std",
    "digraph_5_std",
    "digraph_6_std",
    "digraph_7_std",
    "digraph_8_std",
    "digraph_9_std",
    "digraph_10_std",
    "digraph_11_std",
    "digraph_12_std",
    "digraph_13_std",
    "digraph_14_std",
    "digraph_15_std",
    "digraph_16_std",
    "digraph_17_std",
    "digraph_18_std",
    "digraph_19_std",
    // digraph count band
    "digraph_0_count",
    "digraph_1_count",
    "digraph_2_count",
    "digraph_3_count",
    "digraph_4_count",
    "digraph_5_count",
    "digraph_6_count",
    "digraph_7_count",
    "digraph_8_count",
    "digraph_9_count",
    "digraph_10_count",
    "digraph_11_count",
    "digraph_12_count",
    "digraph_13_count",
    "digraph_14_count",
    "digraph_15_count",
    "digraph_16_count",
    "digraph_17_count",
    "digraph_18_count",
    "digraph_19_count",
    // digraph min band
    "digraph_0_min",
    "digraph_1_min",
    "digraph_2_min",
    "digraph_3_min",
    "digraph_4_min",
    "digraph_5_min",
    "digraph_6_min",
    "digraph_7_min",
    "digraph_8_min",
    "digraph_9_min",
    "digraph_10_min",
    "digraph_11_min",
    "digraph_12_min",
    "digraph_13_min",
    "digraph_14_min",
    "digraph_15_min",
    "digraph_16_min",
    "digraph_17_min",
    "digraph_18_min",
    "digraph_19_min",
    // digraph max band
    "digraph_0_max",
    "digraph_1_max",
    "digraph_2_max",
    "digraph_3_max",
    "digraph_4_max",
    "digraph_5_max",
    "digraph_6_max",
    "digraph_7_max",
    "digraph_8_max",
    "digraph_9_max",
    "digraph_10_max",
    "digraph_11_max",
    "digraph_12_max",
    "digraph_13_max",
    "digraph_14_max",
    "digraph_15_max",
    "digraph_16_max",
    "digraph_17_max",
    "digraph_18_max",
    "digraph_19_max",
    // digraph median band, leading slots only
    "digraph_0_median",
    "digraph_1_median",
    "digraph_2_median",
    "digraph_3_median",
    "digraph_4_median",
    "digraph_5_median",
    "digraph_6_median",
    "digraph_7_median",
    "digraph_8_median",
    "digraph_9_median",
    // error
    "backspace_count",
    "backspace_rate",
    "correction_rate",
    "clean_ratio",
    // rhythm
    "rhythm_consistency",
    "burst_count",
    "pause_count",
    "avg_burst_speed",
    "avg_pause_ms",
    "rhythm_variation",
    "wpm",
    "rhythm_stability",
    // meta
    "total_keys",
    "window_seconds",
];

/// One raw key transition retained in the buffer.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub ts_us: u64,
    pub key: String,
    pub phase: Phase,
}

pub struct KeystrokeExtractor {
    ctx: ExtractorContext,
    buffers: HashMap<String, VecDeque<KeyEvent>>,
}

impl KeystrokeExtractor {
    pub fn new(ctx: ExtractorContext) -> Self {
        // The default user is tracked from startup so every tick emits at
        // least one record.
        let mut buffers = HashMap::new();
        buffers.insert(ctx.settings.user.clone(), VecDeque::new());
        Self { ctx, buffers }
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut events = self.ctx.bus.subscribe(EVENTS_CHANNEL, shutdown.clone());
        let mut ticker = tokio::time::interval(self.ctx.settings.update_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else {
                        anyhow::bail!("event stream closed");
                    };
                    self.absorb(event);
                }
                _ = ticker.tick() => self.emit().await,
            }
        }
        Ok(())
    }

    fn absorb(&mut self, event: Event) {
        let Event::Keystroke { ts_us, key, phase, user } = event else {
            return;
        };
        let user = user.unwrap_or_else(|| self.ctx.settings.user.clone());
        let buffer = self.buffers.entry(user).or_default();
        buffer.push_back(KeyEvent { ts_us, key, phase });
        if buffer.len() > BUFFER_CAP {
            buffer.pop_front();
        }
    }

    async fn emit(&mut self) {
        let now_us = epoch_us();
        let window_start = now_us.saturating_sub(self.ctx.settings.window_us());
        let window_secs = self.ctx.settings.window_secs();
        let dev_mode = self.ctx.oracle.query();

        let users: Vec<String> = self.buffers.keys().cloned().collect();
        for user in users {
            let window = match self.buffers.get_mut(&user) {
                Some(buffer) => {
                    buffer.retain(|e| e.ts_us >= window_start);
                    buffer.iter().cloned().collect::<Vec<_>>()
                }
                None => continue,
            };

            let values = compute(&window, window_secs);
            let record = FeatureRecord {
                measurement: KEYSTROKE_MEASUREMENT,
                user,
                dev_mode: dev_mode.clone(),
                extra_tags: Vec::new(),
                fields: KEYSTROKE_FIELDS.iter().copied().zip(values).collect(),
                ts_us: now_us,
            };
            submit(&self.ctx, FEATURES_KEYSTROKE_CHANNEL, &record).await;
        }
    }
}

/// Compute the 140-entry feature vector, index-aligned with
/// [`KEYSTROKE_FIELDS`], over one user's in-window events.
pub(crate) fn compute(events: &[KeyEvent], window_secs: f64) -> Vec<f64> {
    let mut ordered: Vec<&KeyEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.ts_us);

    let mut pending_press: HashMap<&str, u64> = HashMap::new();
    let mut dwells: Vec<f64> = Vec::new();
    let mut flights: Vec<f64> = Vec::new();
    let mut digraphs: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    // Key and release time of the last completed pair.
    let mut last_pair: Option<(&str, u64)> = None;

    let mut press_times: Vec<u64> = Vec::new();
    let mut backspaces = 0u64;
    let mut corrections = 0u64;
    let mut prev_press_key: Option<&str> = None;

    for event in &ordered {
        match event.phase {
            Phase::Press => {
                press_times.push(event.ts_us);
                if event.key.eq_ignore_ascii_case("backspace") {
                    backspaces += 1;
                    if prev_press_key.is_some_and(|k| !k.eq_ignore_ascii_case("backspace")) {
                        corrections += 1;
                    }
                }
                prev_press_key = Some(&event.key);
                // Most-recent press wins.
                pending_press.insert(&event.key, event.ts_us);
            }
            Phase::Release => {
                let Some(press_ts) = pending_press.remove(event.key.as_str()) else {
                    continue;
                };
                if event.ts_us < press_ts {
                    continue; // reordered beyond tolerance
                }
                let dwell_ms = (event.ts_us - press_ts) as f64 / 1000.0;
                if dwell_ms > DWELL_MAX_MS {
                    continue;
                }
                dwells.push(dwell_ms);
                if let Some((prev_key, prev_release)) = last_pair {
                    if press_ts >= prev_release {
                        let flight_ms = (press_ts - prev_release) as f64 / 1000.0;
                        if flight_ms <= FLIGHT_MAX_MS {
                            flights.push(flight_ms);
                            digraphs
                                .entry(format!("{prev_key}:{}", event.key))
                                .or_default()
                                .push(flight_ms);
                        }
                    }
                }
                last_pair = Some((&event.key, event.ts_us));
            }
        }
    }

    let mut out = Vec::with_capacity(KEYSTROKE_FIELD_COUNT);
    out.extend(stats::summary8(&dwells));
    out.extend(stats::summary8(&flights));

    // Slot assignment: observed digraphs in lexicographic key order.
    let slots: Vec<&[f64]> = digraphs.values().map(Vec::as_slice).take(DIGRAPH_SLOTS).collect();
    let slot = |i: usize| slots.get(i).copied().unwrap_or(&[]);
    for i in 0..DIGRAPH_SLOTS {
        out.push(stats::mean(slot(i)));
    }
    for i in 0..DIGRAPH_SLOTS {
        out.push(stats::pop_std(slot(i)));
    }
    for i in 0..DIGRAPH_SLOTS {
        out.push(slot(i).len() as f64);
    }
    for i in 0..DIGRAPH_SLOTS {
        out.push(stats::min(slot(i)));
    }
    for i in 0..DIGRAPH_SLOTS {
        out.push(stats::max(slot(i)));
    }
    for i in 0..DIGRAPH_MEDIAN_SLOTS {
        out.push(stats::median(slot(i)));
    }

    // Error group.
    let total = press_times.len() as f64;
    if press_times.is_empty() {
        out.extend([0.0; 4]);
    } else {
        out.push(backspaces as f64);
        out.push(backspaces as f64 / total);
        out.push(corrections as f64 / total);
        out.push((total - backspaces as f64) / total);
    }

    // Rhythm group over press-to-press intervals.
    press_times.sort_unstable();
    let intervals: Vec<f64> =
        press_times.windows(2).map(|w| (w[1] - w[0]) as f64 / 1000.0).collect();

    let flight_mean = stats::mean(&flights);
    let consistency = if flights.is_empty() || flight_mean == 0.0 {
        0.0
    } else {
        1.0 / (1.0 + stats::pop_std(&flights) / flight_mean)
    };
    out.push(consistency);

    let (burst_count, burst_keys, burst_secs) = bursts(&press_times, &intervals);
    out.push(burst_count as f64);

    let pauses: Vec<f64> = intervals.iter().copied().filter(|g| *g >= PAUSE_GAP_MS).collect();
    out.push(pauses.len() as f64);

    out.push(if burst_secs > 0.0 { burst_keys as f64 / burst_secs } else { 0.0 });
    out.push(stats::mean(&pauses));

    let interval_mean = stats::mean(&intervals);
    let variation = if intervals.is_empty() || interval_mean == 0.0 {
        0.0
    } else {
        stats::pop_std(&intervals) / interval_mean
    };
    out.push(variation);

    let wpm = if window_secs > 0.0 { (total / 5.0) / (window_secs / 60.0) } else { 0.0 };
    out.push(wpm);

    let stability = if intervals.is_empty() || interval_mean == 0.0 {
        0.0
    } else {
        let range = stats::max(&intervals) - stats::min(&intervals);
        (1.0 - range / interval_mean).clamp(0.0, 1.0)
    };
    out.push(stability);

    // Meta group.
    out.push(total);
    out.push(window_secs);

    debug_assert_eq!(out.len(), KEYSTROKE_FIELD_COUNT);
    out
}

/// Count maximal runs of ≥3 presses with every gap under the burst
/// threshold. Returns (runs, keys in runs, total run seconds).
fn bursts(press_times: &[u64], intervals: &[f64]) -> (u64, u64, f64) {
    let mut count = 0u64;
    let mut keys = 0u64;
    let mut secs = 0.0f64;

    let mut run_len = 1usize;
    let mut run_start = 0usize;
    let mut close_run = |run_len: usize, run_start: usize, run_end: usize| {
        if run_len >= BURST_MIN_KEYS {
            count += 1;
            keys += run_len as u64;
            secs += (press_times[run_end] - press_times[run_start]) as f64 / 1e6;
        }
    };

    for (i, gap) in intervals.iter().enumerate() {
        if *gap < BURST_GAP_MS {
            run_len += 1;
        } else {
            close_run(run_len, run_start, i);
            run_len = 1;
            run_start = i + 1;
        }
    }
    if !press_times.is_empty() {
        close_run(run_len, run_start, press_times.len() - 1);
    }
    (count, keys, secs)
}

#[cfg(test)]
#[path = "keystroke_tests.rs"]
mod tests;
