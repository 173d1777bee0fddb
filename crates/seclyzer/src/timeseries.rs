// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous line-protocol writer for the InfluxDB v2 write API.
//!
//! One point per call, assembled fully in memory before submission. A
//! transient failure gets a single retry after 200 ms; a 4xx rejection is
//! treated as a configuration problem and logged at most once per minute.
//! Either way the error is returned and the point is dropped — a stalled
//! store must never stall an extractor. Field names are the training
//! schema and must stay stable.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

const RETRY_DELAY: Duration = Duration::from_millis(200);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PERMANENT_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// A single field value on a time-series point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Bool(bool),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

enum SubmitError {
    Transient(String),
    Permanent(String),
}

pub struct TimeseriesWriter {
    client: reqwest::Client,
    write_url: String,
    token: String,
    last_permanent_log: Mutex<Option<Instant>>,
}

impl TimeseriesWriter {
    pub fn new(base_url: &str, org: &str, bucket: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        let write_url = format!(
            "{}/api/v2/write?org={org}&bucket={bucket}&precision=us",
            base_url.trim_end_matches('/')
        );
        Self { client, write_url, token: token.to_owned(), last_permanent_log: Mutex::new(None) }
    }

    /// Write one point. A transient failure is retried once after 200 ms;
    /// the error is returned either way so the caller can count the drop.
    pub async fn write(
        &self,
        measurement: &str,
        tags: &[(&str, String)],
        fields: &[(&'static str, FieldValue)],
        ts_us: u64,
    ) -> anyhow::Result<()> {
        let line = render_line(measurement, tags, fields, ts_us);
        let first = match self.submit(&line).await {
            Ok(()) => return Ok(()),
            Err(SubmitError::Permanent(msg)) => {
                self.log_permanent(&msg);
                anyhow::bail!("time-series write rejected: {msg}");
            }
            Err(SubmitError::Transient(msg)) => msg,
        };

        tokio::time::sleep(RETRY_DELAY).await;
        match self.submit(&line).await {
            Ok(()) => Ok(()),
            Err(SubmitError::Permanent(msg)) => {
                self.log_permanent(&msg);
                anyhow::bail!("time-series write rejected on retry: {msg}");
            }
            Err(SubmitError::Transient(second)) => {
                anyhow::bail!("time-series write failed twice: {first}; retry: {second}")
            }
        }
    }

    async fn submit(&self, line: &str) -> Result<(), SubmitError> {
        let resp = self
            .client
            .post(&self.write_url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line.to_owned())
            .send()
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(SubmitError::Permanent(format!("{status}: {body}")))
        } else {
            Err(SubmitError::Transient(format!("{status}: {body}")))
        }
    }

    fn log_permanent(&self, msg: &str) {
        let mut last = self.last_permanent_log.lock();
        let due = last.map_or(true, |at| at.elapsed() >= PERMANENT_LOG_INTERVAL);
        if due {
            tracing::warn!(err = %msg, "time-series store rejecting writes; dropping points");
            *last = Some(Instant::now());
        }
    }
}

/// Render one line-protocol line: `measurement,tags fields ts`.
///
/// Tag order is semantically irrelevant to the store; sorting by key keeps
/// payloads reproducible. Non-finite floats are written as 0.0 — the store
/// rejects the whole line otherwise.
pub fn render_line(
    measurement: &str,
    tags: &[(&str, String)],
    fields: &[(&'static str, FieldValue)],
    ts_us: u64,
) -> String {
    let mut line = escape_measurement(measurement);

    let mut sorted: Vec<(&str, &str)> = tags.iter().map(|(k, v)| (*k, v.as_str())).collect();
    sorted.sort_by_key(|(key, _)| *key);
    for (key, value) in sorted {
        line.push(',');
        line.push_str(&escape_tag(key));
        line.push('=');
        line.push_str(&escape_tag(value));
    }

    line.push(' ');
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(name);
        line.push('=');
        match value {
            FieldValue::Float(v) => {
                let v = if v.is_finite() { *v } else { 0.0 };
                line.push_str(&v.to_string());
            }
            FieldValue::Bool(b) => line.push_str(if *b { "true" } else { "false" }),
        }
    }

    line.push(' ');
    line.push_str(&ts_us.to_string());
    line
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

#[cfg(test)]
#[path = "timeseries_tests.rs"]
mod tests;
