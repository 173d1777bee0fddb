// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application focus tracker.
//!
//! Unlike the windowed extractors this one is cumulative: every focus
//! change folds into a persistent transition model. The model snapshot is
//! a plain value — rehydration is a pure function of the stored JSON —
//! written back to the config store on the tick cadence whenever dirty.
//! Each closed focus interval is also queued as an `app_transitions`
//! time-series point and mirrored on the app feature channel; points are
//! flushed on the tick so the event hot path never blocks on HTTP.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::bus::{EVENTS_CHANNEL, FEATURES_APP_CHANNEL};
use crate::configstore::APP_PATTERNS_KEY;
use crate::events::Event;
use crate::extractor::{submit, FeatureRecord};
use crate::state::ExtractorContext;

pub const APP_MEASUREMENT: &str = "app_transitions";

/// Longest focus interval credited to an app, ms (24 hours).
const DURATION_MAX_MS: f64 = 86_400_000.0;

/// Running duration statistics for one app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub n: u64,
    pub sum: f64,
    pub sum_sq: f64,
    pub min: f64,
    pub max: f64,
}

impl DurationStats {
    fn record(&mut self, ms: f64) {
        if self.n == 0 {
            self.min = ms;
            self.max = ms;
        } else {
            self.min = self.min.min(ms);
            self.max = self.max.max(ms);
        }
        self.n += 1;
        self.sum += ms;
        self.sum_sq += ms * ms;
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }
}

/// Most recent focus target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub app: String,
    pub ts_us: u64,
}

/// One closed focus interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from_app: String,
    pub to_app: String,
    pub duration_ms: f64,
    pub hour: u8,
    pub ts_us: u64,
}

/// Persisted transition model. Serialized whole under `app_patterns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppTransitionModel {
    /// transitions[from][to] = observed focus changes from → to.
    #[serde(default)]
    pub transitions: HashMap<String, HashMap<String, u64>>,
    /// Per-app focus-event counts bucketed by UTC hour of day.
    #[serde(default)]
    pub hour_usage: HashMap<String, [u64; 24]>,
    #[serde(default)]
    pub durations: HashMap<String, DurationStats>,
    #[serde(default)]
    pub last_focus: Option<FocusPoint>,
    #[serde(default)]
    pub total_events: u64,
}

impl AppTransitionModel {
    pub fn rehydrate(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Fold one focus change; returns the transition it closed, if any.
    pub fn observe(&mut self, app: &str, ts_us: u64) -> Option<Transition> {
        let closed = self.last_focus.take().map(|last| {
            let duration_ms = if ts_us >= last.ts_us {
                ((ts_us - last.ts_us) as f64 / 1000.0).min(DURATION_MAX_MS)
            } else {
                0.0
            };
            self.durations.entry(last.app.clone()).or_default().record(duration_ms);
            *self
                .transitions
                .entry(last.app.clone())
                .or_default()
                .entry(app.to_owned())
                .or_insert(0) += 1;
            Transition {
                from_app: last.app,
                to_app: app.to_owned(),
                duration_ms,
                hour: hour_of_day(ts_us),
                ts_us,
            }
        });

        self.hour_usage.entry(app.to_owned()).or_insert([0; 24])[usize::from(hour_of_day(ts_us))] +=
            1;
        self.last_focus = Some(FocusPoint { app: app.to_owned(), ts_us });
        self.total_events += 1;
        closed
    }

    /// Derived next-app distribution for one source app. Probabilities are
    /// never stored; consumers compute entropy on demand.
    pub fn transition_probabilities(&self, from: &str) -> HashMap<String, f64> {
        let Some(counts) = self.transitions.get(from) else {
            return HashMap::new();
        };
        let total: u64 = counts.values().sum();
        if total == 0 {
            return HashMap::new();
        }
        counts.iter().map(|(to, n)| (to.clone(), *n as f64 / total as f64)).collect()
    }
}

/// UTC hour of day for an epoch-microsecond timestamp.
pub(crate) fn hour_of_day(ts_us: u64) -> u8 {
    ((ts_us / 1_000_000 / 3_600) % 24) as u8
}

pub struct AppTracker {
    ctx: ExtractorContext,
    model: AppTransitionModel,
    dirty: bool,
    /// Transitions awaiting their tick flush, tagged with the event user.
    pending: Vec<(String, Transition)>,
}

impl AppTracker {
    /// Rehydrate the persisted model; any failure starts fresh.
    pub async fn new(ctx: ExtractorContext) -> Self {
        let model = match ctx.store.get(APP_PATTERNS_KEY).await {
            Ok(Some(raw)) => match AppTransitionModel::rehydrate(&raw) {
                Ok(model) => model,
                Err(e) => {
                    tracing::warn!(err = %e, "corrupt app_patterns snapshot; starting fresh");
                    AppTransitionModel::default()
                }
            },
            Ok(None) => AppTransitionModel::default(),
            Err(e) => {
                tracing::warn!(err = %e, "config store unavailable; starting with empty model");
                AppTransitionModel::default()
            }
        };
        Self { ctx, model, dirty: false, pending: Vec::new() }
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut events = self.ctx.bus.subscribe(EVENTS_CHANNEL, shutdown.clone());
        let mut ticker = tokio::time::interval(self.ctx.settings.update_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                event = events.recv() => {
                    let Some(event) = event else {
                        break Err(anyhow::anyhow!("event stream closed"));
                    };
                    self.absorb(event);
                }
                _ = ticker.tick() => self.flush().await,
            }
        };
        // Retire the model: the snapshot must reflect the last processed
        // event before the task returns.
        self.flush().await;
        result
    }

    fn absorb(&mut self, event: Event) {
        let Event::App { ts_us, app_name, user, .. } = event else {
            return;
        };
        let user = user.unwrap_or_else(|| self.ctx.settings.user.clone());
        if let Some(transition) = self.model.observe(&app_name, ts_us) {
            self.pending.push((user, transition));
        }
        self.dirty = true;
    }

    async fn flush(&mut self) {
        if self.dirty {
            match serde_json::to_string(&self.model) {
                Ok(snapshot) => match self.ctx.store.set(APP_PATTERNS_KEY, &snapshot).await {
                    Ok(()) => self.dirty = false,
                    Err(e) => {
                        tracing::warn!(err = %e, "app_patterns write failed; retrying next tick");
                    }
                },
                Err(e) => {
                    tracing::error!(err = %e, "app model serialization failed");
                    self.dirty = false;
                }
            }
        }

        if self.pending.is_empty() {
            return;
        }
        let dev_mode = self.ctx.oracle.query();
        for (user, transition) in std::mem::take(&mut self.pending) {
            let record = FeatureRecord {
                measurement: APP_MEASUREMENT,
                user,
                dev_mode: dev_mode.clone(),
                extra_tags: vec![
                    ("from_app", transition.from_app.clone()),
                    ("to_app", transition.to_app.clone()),
                ],
                fields: vec![
                    ("duration_ms", transition.duration_ms),
                    ("hour", f64::from(transition.hour)),
                ],
                ts_us: transition.ts_us,
            };
            submit(&self.ctx, FEATURES_APP_CHANNEL, &record).await;
        }
    }
}

#[cfg(test)]
#[path = "apptrack_tests.rs"]
mod tests;
