// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extractor supervision: spawn, restart with backoff, shutdown.
//!
//! Each extractor runs as one long-lived task. An abnormal end rebuilds
//! the extractor from the shared context and restarts it after
//! `min(30 s, 0.5 s · 2^k)`; surviving a minute of clean run resets k.
//! Cancellation is cooperative — a cancelled extractor returns `Ok` and
//! the supervision loop ends with it.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::extractor::apptrack::AppTracker;
use crate::extractor::keystroke::KeystrokeExtractor;
use crate::extractor::mouse::MouseExtractor;
use crate::state::ExtractorContext;

const RESTART_BASE: Duration = Duration::from_millis(500);
const RESTART_MAX: Duration = Duration::from_secs(30);
/// A run surviving this long resets the restart backoff.
const CLEAN_RUN: Duration = Duration::from_secs(60);

/// The three concrete extractors owned by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Keystroke,
    Mouse,
    App,
}

impl ExtractorKind {
    pub const ALL: [ExtractorKind; 3] = [Self::Keystroke, Self::Mouse, Self::App];

    pub fn name(self) -> &'static str {
        match self {
            Self::Keystroke => "keystroke",
            Self::Mouse => "mouse",
            Self::App => "app",
        }
    }

    async fn run(self, ctx: ExtractorContext, shutdown: CancellationToken) -> anyhow::Result<()> {
        match self {
            Self::Keystroke => KeystrokeExtractor::new(ctx).run(shutdown).await,
            Self::Mouse => MouseExtractor::new(ctx).run(shutdown).await,
            Self::App => AppTracker::new(ctx).await.run(shutdown).await,
        }
    }
}

/// Restart delay after the k-th consecutive abnormal exit.
pub fn restart_delay(k: u32) -> Duration {
    RESTART_BASE.saturating_mul(2u32.saturating_pow(k)).min(RESTART_MAX)
}

/// Spawn one supervision loop per extractor.
pub fn spawn_all(ctx: ExtractorContext, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
    ExtractorKind::ALL
        .into_iter()
        .map(|kind| {
            let ctx = ctx.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { supervise(kind, ctx, shutdown).await })
        })
        .collect()
}

async fn supervise(kind: ExtractorKind, ctx: ExtractorContext, shutdown: CancellationToken) {
    let mut failures = 0u32;

    loop {
        if shutdown.is_cancelled() {
            break;
        }
        let started = Instant::now();
        match kind.run(ctx.clone(), shutdown.clone()).await {
            Ok(()) => {
                tracing::info!(extractor = kind.name(), "extractor stopped");
                break;
            }
            Err(e) => {
                if shutdown.is_cancelled() {
                    break;
                }
                if started.elapsed() >= CLEAN_RUN {
                    failures = 0;
                }
                let delay = restart_delay(failures);
                failures = failures.saturating_add(1);
                ctx.counters.extractor_restarts.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    extractor = kind.name(),
                    err = %e,
                    delay_ms = delay.as_millis() as u64,
                    "extractor died; restarting"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
