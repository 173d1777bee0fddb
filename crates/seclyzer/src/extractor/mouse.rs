// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mouse dynamics extractor.
//!
//! Buffers motion, click, and scroll events per user and computes a
//! 38-dimensional feature vector per tick. Velocity is derived from
//! consecutive motion pairs under 500 ms apart; acceleration and jerk
//! cascade from it inside the same motion chain, and any ≥500 ms gap
//! resets the whole cascade. Units are px/ms and its derivatives.

use std::collections::{HashMap, VecDeque};
use std::f64::consts::PI;

use tokio_util::sync::CancellationToken;

use crate::bus::{EVENTS_CHANNEL, FEATURES_MOUSE_CHANNEL};
use crate::events::{Event, MouseButton, Phase};
use crate::extractor::{stats, submit, FeatureRecord};
use crate::state::{epoch_us, ExtractorContext};

/// Hard cap on buffered mouse events per user; oldest drop first.
const BUFFER_CAP: usize = 20_000;
/// Gap at or above which a motion chain (and its derivatives) resets, ms.
const CHAIN_BREAK_MS: f64 = 500.0;
/// Longest press→release accepted as a click, ms.
const CLICK_MAX_MS: f64 = 2_000.0;
/// Same-button presses closer than this count as a double-click, ms.
const DOUBLE_CLICK_MS: f64 = 500.0;
/// Minimum three-point path length for a defined curvature, px.
const MIN_TURN_PATH_PX: f64 = 1.0;

pub const MOUSE_MEASUREMENT: &str = "mouse_features";
pub const MOUSE_FIELD_COUNT: usize = 38;

/// Canonical field-name list. Frozen: downstream models index by it.
pub const MOUSE_FIELDS: [&str; MOUSE_FIELD_COUNT] = [
    // movement
    "velocity_mean",
    "velocity_std",
    "velocity_max",
    "velocity_median",
    "accel_mean",
    "accel_std",
    "accel_max",
    "jerk_mean",
    "jerk_std",
    "jerk_max",
    "curvature_mean",
    "curvature_std",
    "curvature_max",
    "turn_angle_mean",
    "turn_angle_std",
    "total_distance",
    "net_distance",
    "idle_seconds",
    "move_rate",
    "straightness",
    // click
    "click_duration_mean",
    "click_duration_std",
    "click_count_left",
    "click_count_right",
    "click_count_middle",
    "click_ratio_left",
    "click_ratio_right",
    "double_click_count",
    "click_rate",
    "inter_click_mean_ms",
    // scroll
    "scroll_dy_mean",
    "scroll_dy_std",
    "scroll_up_count",
    "scroll_down_count",
    "scroll_direction_ratio",
    "scroll_rate",
    "inter_scroll_mean_ms",
    "inter_scroll_std_ms",
];

/// One buffered mouse event.
#[derive(Debug, Clone)]
pub enum MouseSample {
    Move { ts_us: u64, x: i32, y: i32 },
    Click { ts_us: u64, button: MouseButton, phase: Phase },
    Scroll { ts_us: u64, dx: i32, dy: i32 },
}

impl MouseSample {
    fn ts_us(&self) -> u64 {
        match self {
            Self::Move { ts_us, .. } | Self::Click { ts_us, .. } | Self::Scroll { ts_us, .. } => {
                *ts_us
            }
        }
    }
}

pub struct MouseExtractor {
    ctx: ExtractorContext,
    buffers: HashMap<String, VecDeque<MouseSample>>,
}

impl MouseExtractor {
    pub fn new(ctx: ExtractorContext) -> Self {
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
        let (user, sample) = match event {
            Event::MouseMove { ts_us, x, y, user } => (user, MouseSample::Move { ts_us, x, y }),
            Event::MouseClick { ts_us, button, phase, user } => {
                (user, MouseSample::Click { ts_us, button, phase })
            }
            Event::MouseScroll { ts_us, dx, dy, user } => {
                (user, MouseSample::Scroll { ts_us, dx, dy })
            }
            _ => return,
        };
        let user = user.unwrap_or_else(|| self.ctx.settings.user.clone());
        let buffer = self.buffers.entry(user).or_default();
        buffer.push_back(sample);
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
                    buffer.retain(|e| e.ts_us() >= window_start);
                    buffer.iter().cloned().collect::<Vec<_>>()
                }
                None => continue,
            };

            let values = compute(&window, window_secs);
            let record = FeatureRecord {
                measurement: MOUSE_MEASUREMENT,
                user,
                dev_mode: dev_mode.clone(),
                extra_tags: Vec::new(),
                fields: MOUSE_FIELDS.iter().copied().zip(values).collect(),
                ts_us: now_us,
            };
            submit(&self.ctx, FEATURES_MOUSE_CHANNEL, &record).await;
        }
    }
}

/// A derivative sample stamped with the end of its source segment.
#[derive(Debug, Clone, Copy)]
struct Deriv {
    ts_us: u64,
    value: f64,
    chain: usize,
}

/// Compute the 38-entry feature vector, index-aligned with
/// [`MOUSE_FIELDS`], over one user's in-window events.
pub(crate) fn compute(events: &[MouseSample], window_secs: f64) -> Vec<f64> {
    let mut ordered: Vec<&MouseSample> = events.iter().collect();
    ordered.sort_by_key(|e| e.ts_us());

    let mut motions: Vec<(u64, f64, f64)> = Vec::new();
    let mut clicks: Vec<(u64, MouseButton, Phase)> = Vec::new();
    let mut scrolls: Vec<(u64, f64)> = Vec::new();
    for event in &ordered {
        match event {
            MouseSample::Move { ts_us, x, y } => {
                motions.push((*ts_us, f64::from(*x), f64::from(*y)));
            }
            MouseSample::Click { ts_us, button, phase } => clicks.push((*ts_us, *button, *phase)),
            MouseSample::Scroll { ts_us, dy, .. } => scrolls.push((*ts_us, f64::from(*dy))),
        }
    }

    let mut out = Vec::with_capacity(MOUSE_FIELD_COUNT);
    movement_features(&mut out, &motions, window_secs);
    click_features(&mut out, &clicks, window_secs);
    scroll_features(&mut out, &scrolls, window_secs);
    debug_assert_eq!(out.len(), MOUSE_FIELD_COUNT);
    out
}

fn movement_features(out: &mut Vec<f64>, motions: &[(u64, f64, f64)], window_secs: f64) {
    let mut velocities: Vec<Deriv> = Vec::new();
    let mut total_distance = 0.0f64;
    let mut active_us = 0u64;
    let mut chain = 0usize;

    for pair in motions.windows(2) {
        let (t0, x0, y0) = pair[0];
        let (t1, x1, y1) = pair[1];
        let dt_ms = (t1 - t0) as f64 / 1000.0;
        if dt_ms <= 0.0 || dt_ms >= CHAIN_BREAK_MS {
            chain += 1;
            continue;
        }
        let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        total_distance += dist;
        active_us += t1 - t0;
        velocities.push(Deriv { ts_us: t1, value: dist / dt_ms, chain });
    }

    let accelerations = derivative(&velocities);
    let jerks = derivative(&accelerations);

    let mut curvatures: Vec<f64> = Vec::new();
    let mut turn_angles: Vec<f64> = Vec::new();
    for triplet in motions.windows(3) {
        let (t0, x0, y0) = triplet[0];
        let (t1, x1, y1) = triplet[1];
        let (t2, x2, y2) = triplet[2];
        let dt1 = (t1 - t0) as f64 / 1000.0;
        let dt2 = (t2 - t1) as f64 / 1000.0;
        if dt1 <= 0.0 || dt1 >= CHAIN_BREAK_MS || dt2 <= 0.0 || dt2 >= CHAIN_BREAK_MS {
            continue;
        }
        let d1 = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let d2 = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        if d1 == 0.0 || d2 == 0.0 {
            continue;
        }
        let path = d1 + d2;
        if path < MIN_TURN_PATH_PX {
            continue;
        }
        let turn = wrap_angle((y2 - y1).atan2(x2 - x1) - (y1 - y0).atan2(x1 - x0)).abs();
        turn_angles.push(turn);
        curvatures.push(turn / path);
    }

    let velocity_values: Vec<f64> = velocities.iter().map(|d| d.value).collect();
    let accel_values: Vec<f64> = accelerations.iter().map(|d| d.value).collect();
    let jerk_values: Vec<f64> = jerks.iter().map(|d| d.value).collect();

    out.push(stats::mean(&velocity_values));
    out.push(stats::pop_std(&velocity_values));
    out.push(stats::max(&velocity_values));
    out.push(stats::median(&velocity_values));
    out.push(stats::mean(&accel_values));
    out.push(stats::pop_std(&accel_values));
    out.push(stats::max(&accel_values));
    out.push(stats::mean(&jerk_values));
    out.push(stats::pop_std(&jerk_values));
    out.push(stats::max(&jerk_values));
    out.push(stats::mean(&curvatures));
    out.push(stats::pop_std(&curvatures));
    out.push(stats::max(&curvatures));
    out.push(stats::mean(&turn_angles));
    out.push(stats::pop_std(&turn_angles));
    out.push(total_distance);

    let net_distance = match (motions.first(), motions.last()) {
        (Some((_, x0, y0)), Some((_, x1, y1))) => {
            ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt()
        }
        _ => 0.0,
    };
    out.push(net_distance);

    let active_secs = active_us as f64 / 1e6;
    out.push((window_secs - active_secs).max(0.0));
    out.push(if window_secs > 0.0 { motions.len() as f64 / window_secs } else { 0.0 });
    out.push(if total_distance > 0.0 { net_distance / total_distance } else { 0.0 });
}

fn click_features(out: &mut Vec<f64>, clicks: &[(u64, MouseButton, Phase)], window_secs: f64) {
    let mut pending: HashMap<MouseButton, u64> = HashMap::new();
    let mut durations: Vec<f64> = Vec::new();
    let mut click_times: Vec<u64> = Vec::new();
    let mut left = 0u64;
    let mut right = 0u64;
    let mut middle = 0u64;
    let mut press_by_button: HashMap<MouseButton, Vec<u64>> = HashMap::new();

    for (ts_us, button, phase) in clicks {
        match phase {
            Phase::Press => {
                pending.insert(*button, *ts_us);
                press_by_button.entry(*button).or_default().push(*ts_us);
            }
            Phase::Release => {
                let Some(press_ts) = pending.remove(button) else { continue };
                if *ts_us < press_ts {
                    continue;
                }
                let duration_ms = (ts_us - press_ts) as f64 / 1000.0;
                if duration_ms > CLICK_MAX_MS {
                    continue;
                }
                durations.push(duration_ms);
                click_times.push(press_ts);
                match button {
                    MouseButton::Left => left += 1,
                    MouseButton::Right => right += 1,
                    MouseButton::Middle => middle += 1,
                    MouseButton::Other => {}
                }
            }
        }
    }

    let mut double_clicks = 0u64;
    for presses in press_by_button.values() {
        for pair in presses.windows(2) {
            if (pair[1] - pair[0]) as f64 / 1000.0 < DOUBLE_CLICK_MS {
                double_clicks += 1;
            }
        }
    }

    click_times.sort_unstable();
    let inter_click: Vec<f64> =
        click_times.windows(2).map(|w| (w[1] - w[0]) as f64 / 1000.0).collect();

    let total = durations.len() as f64;
    out.push(stats::mean(&durations));
    out.push(stats::pop_std(&durations));
    out.push(left as f64);
    out.push(right as f64);
    out.push(middle as f64);
    out.push(if total > 0.0 { left as f64 / total } else { 0.0 });
    out.push(if total > 0.0 { right as f64 / total } else { 0.0 });
    out.push(double_clicks as f64);
    out.push(if window_secs > 0.0 { total / window_secs } else { 0.0 });
    out.push(stats::mean(&inter_click));
}

fn scroll_features(out: &mut Vec<f64>, scrolls: &[(u64, f64)], window_secs: f64) {
    let dys: Vec<f64> = scrolls.iter().map(|(_, dy)| *dy).collect();
    let up = dys.iter().filter(|dy| **dy > 0.0).count() as f64;
    let down = dys.iter().filter(|dy| **dy < 0.0).count() as f64;
    let intervals: Vec<f64> =
        scrolls.windows(2).map(|w| (w[1].0 - w[0].0) as f64 / 1000.0).collect();

    out.push(stats::mean(&dys));
    out.push(stats::pop_std(&dys));
    out.push(up);
    out.push(down);
    out.push(if up + down > 0.0 { up / (up + down) } else { 0.0 });
    out.push(if window_secs > 0.0 { scrolls.len() as f64 / window_secs } else { 0.0 });
    out.push(stats::mean(&intervals));
    out.push(stats::pop_std(&intervals));
}

/// Differentiate chained samples; chains never bridge a break.
fn derivative(samples: &[Deriv]) -> Vec<Deriv> {
    samples
        .windows(2)
        .filter_map(|pair| {
            if pair[0].chain != pair[1].chain {
                return None;
            }
            let dt_ms = (pair[1].ts_us - pair[0].ts_us) as f64 / 1000.0;
            if dt_ms <= 0.0 {
                return None;
            }
            Some(Deriv {
                ts_us: pair[1].ts_us,
                value: (pair[1].value - pair[0].value) / dt_ms,
                chain: pair[1].chain,
            })
        })
        .collect()
}

/// Wrap an angle difference into [−π, π].
fn wrap_angle(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    } else if wrapped < -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

#[cfg(test)]
#[path = "mouse_tests.rs"]
mod tests;
