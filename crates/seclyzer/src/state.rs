// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handles and counters threaded through the extractors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::bus::EventBus;
use crate::config::Config;
use crate::configstore::ConfigStore;
use crate::devmode::DevModeOracle;
use crate::timeseries::TimeseriesWriter;

/// Immutable per-run settings shared by all extractors.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// User id attributed to events that do not carry one.
    pub user: String,
    /// Trailing feature window.
    pub window: Duration,
    /// Emission cadence.
    pub update_interval: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user: config.user.clone(),
            window: config.window(),
            update_interval: config.update_interval(),
        }
    }

    pub fn window_us(&self) -> u64 {
        self.window.as_micros() as u64
    }

    pub fn window_secs(&self) -> f64 {
        self.window.as_secs_f64()
    }
}

/// Shared collaborators injected into every extractor.
#[derive(Clone)]
pub struct ExtractorContext {
    pub bus: Arc<EventBus>,
    pub writer: Arc<TimeseriesWriter>,
    pub oracle: Arc<DevModeOracle>,
    pub store: Arc<ConfigStore>,
    pub settings: PipelineSettings,
    pub counters: Arc<PipelineCounters>,
}

/// Process-wide operational counters. Relaxed ordering: these are
/// diagnostics, not synchronization.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    pub decoded_events: AtomicU64,
    pub decode_errors: AtomicU64,
    pub unknown_events: AtomicU64,
    pub dropped_writes: AtomicU64,
    pub dropped_publishes: AtomicU64,
    pub bus_reconnects: AtomicU64,
    pub extractor_restarts: AtomicU64,
}

impl PipelineCounters {
    /// Log final counter values; called once at shutdown.
    pub fn log_summary(&self) {
        tracing::info!(
            decoded_events = self.decoded_events.load(Ordering::Relaxed),
            decode_errors = self.decode_errors.load(Ordering::Relaxed),
            unknown_events = self.unknown_events.load(Ordering::Relaxed),
            dropped_writes = self.dropped_writes.load(Ordering::Relaxed),
            dropped_publishes = self.dropped_publishes.load(Ordering::Relaxed),
            bus_reconnects = self.bus_reconnects.load(Ordering::Relaxed),
            extractor_restarts = self.extractor_restarts.load(Ordering::Relaxed),
            "pipeline counters"
        );
    }
}

/// Return current epoch microseconds.
pub fn epoch_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
