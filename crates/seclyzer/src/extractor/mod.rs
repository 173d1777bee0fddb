// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature extraction layer: record assembly and the shared submission path.

pub mod apptrack;
pub mod keystroke;
pub mod mouse;
pub mod stats;

use std::sync::atomic::Ordering;

use serde_json::{json, Map, Value};

use crate::devmode::DevModeStatus;
use crate::state::ExtractorContext;
use crate::timeseries::FieldValue;

/// One fully assembled feature vector bound for the time-series store.
///
/// The field set is built completely in memory and written atomically;
/// a record is never partially visible downstream.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub measurement: &'static str,
    pub user: String,
    pub dev_mode: DevModeStatus,
    pub extra_tags: Vec<(&'static str, String)>,
    pub fields: Vec<(&'static str, f64)>,
    /// Emission wall-clock time — the one place wall-clock substitutes
    /// for event time.
    pub ts_us: u64,
}

impl FeatureRecord {
    /// Tags carried on every point: `user`, `dev_mode`, and
    /// `dev_mode_method` exactly when developer mode is active.
    pub fn tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("user", self.user.clone()),
            ("dev_mode", self.dev_mode.active.to_string()),
        ];
        if self.dev_mode.active {
            if let Some(method) = self.dev_mode.method {
                tags.push(("dev_mode_method", method.to_owned()));
            }
        }
        tags.extend(self.extra_tags.iter().cloned());
        tags
    }

    /// JSON mirror published on the feature channels.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        root.insert("measurement".to_owned(), json!(self.measurement));
        for (key, value) in self.tags() {
            root.insert(key.to_owned(), Value::String(value));
        }
        let mut fields = Map::new();
        for (name, value) in &self.fields {
            fields.insert((*name).to_owned(), json!(value));
        }
        root.insert("fields".to_owned(), Value::Object(fields));
        root.insert("ts_us".to_owned(), json!(self.ts_us));
        Value::Object(root)
    }
}

/// Write the record, then mirror it on the given feature channel. Both
/// legs are best-effort: failures are counted and the extractor keeps
/// running.
pub async fn submit(ctx: &ExtractorContext, channel: &str, record: &FeatureRecord) {
    let tags = record.tags();
    let fields: Vec<(&'static str, FieldValue)> =
        record.fields.iter().map(|(name, value)| (*name, FieldValue::Float(*value))).collect();

    if let Err(e) = ctx.writer.write(record.measurement, &tags, &fields, record.ts_us).await {
        ctx.counters.dropped_writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(measurement = record.measurement, err = %e, "feature write dropped");
    }

    let payload = record.to_json().to_string();
    if let Err(e) = ctx.bus.publish(channel, payload).await {
        ctx.counters.dropped_publishes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(channel, err = %e, "feature publish dropped");
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
