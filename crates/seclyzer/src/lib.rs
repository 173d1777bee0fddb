// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SecLyzer core: streaming behavioral-biometrics feature extraction.
//!
//! Raw input events (key transitions, mouse motion/clicks/scrolls,
//! focus changes) arrive on a Redis pub/sub channel. Three supervised
//! extractors aggregate them into fixed-length feature vectors written to
//! an InfluxDB time-series store and mirrored on per-extractor feature
//! channels. Every point is tagged with the user and the process-wide
//! developer-mode bit.

pub mod bus;
pub mod config;
pub mod configstore;
pub mod devmode;
pub mod events;
pub mod extractor;
pub mod state;
pub mod supervisor;
pub mod timeseries;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;
use crate::config::Config;
use crate::configstore::ConfigStore;
use crate::devmode::{DevModeOracle, MAGIC_PATH_KEY};
use crate::state::{ExtractorContext, PipelineCounters, PipelineSettings};
use crate::timeseries::TimeseriesWriter;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Run the pipeline until ctrl-c.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let counters = Arc::new(PipelineCounters::default());

    let client = redis::Client::open(config.redis_url())?;
    let bus = Arc::new(EventBus::connect(client.clone(), Arc::clone(&counters)).await?);
    let store = Arc::new(ConfigStore::connect(&client).await?);
    let writer = Arc::new(TimeseriesWriter::new(
        &config.influx_url,
        &config.influx_org,
        &config.influx_bucket,
        &config.influx_token,
    ));

    let magic_path = match store.get(MAGIC_PATH_KEY).await {
        Ok(Some(path)) => PathBuf::from(path),
        _ => config.dev_mode_file.clone(),
    };
    let oracle = Arc::new(DevModeOracle::new(magic_path));

    let ctx = ExtractorContext {
        bus,
        writer,
        oracle,
        store,
        settings: PipelineSettings::from_config(&config),
        counters: Arc::clone(&counters),
    };

    tracing::info!(
        window_secs = config.window_seconds,
        interval_secs = config.update_interval_seconds,
        user = %config.user,
        "seclyzer pipeline started"
    );
    let handles = supervisor::spawn_all(ctx, shutdown.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown.cancel();

    // In-flight writes may finish; nothing new is computed past this point.
    let drained = futures_util::future::join_all(handles);
    if tokio::time::timeout(SHUTDOWN_GRACE, drained).await.is_err() {
        tracing::warn!("extractors did not drain within the grace period");
    }
    counters.log_summary();
    Ok(())
}
