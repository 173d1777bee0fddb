// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Developer-mode oracle.
//!
//! Four activation sources OR-combine into a process-wide bit that tags
//! every emitted feature point so training can filter developer activity
//! out later. The bit never influences feature values. Sources are
//! evaluated in a fixed order and the first active one names the method;
//! results are cached for at most one second to bound filesystem load.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::state::epoch_us;

/// Environment variable honored as an activation source.
pub const DEV_MODE_ENV: &str = "SECLYZER_DEV_MODE";
/// Config-store key overriding the magic-file location.
pub const MAGIC_PATH_KEY: &str = "dev_mode.magic_file_path";

const KEY_SEQUENCE_WINDOW: Duration = Duration::from_secs(5 * 60);
const PASSWORD_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
const CACHE_TTL: Duration = Duration::from_secs(1);

/// Snapshot answer from [`DevModeOracle::query`].
///
/// `method` is `Some` exactly when `active` is true.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevModeStatus {
    pub active: bool,
    pub method: Option<&'static str>,
    pub activated_at: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct Activation {
    at: Instant,
    at_us: u64,
}

impl Activation {
    fn now() -> Self {
        Self { at: Instant::now(), at_us: epoch_us() }
    }
}

#[derive(Debug, Default)]
struct OracleState {
    cached: Option<(Instant, DevModeStatus)>,
    key_sequence: Option<Activation>,
    password: Option<Activation>,
}

/// Read-mostly developer-mode flag with a short-lived result cache.
pub struct DevModeOracle {
    magic_path: PathBuf,
    created_us: u64,
    cache_ttl: Duration,
    state: Mutex<OracleState>,
}

impl DevModeOracle {
    pub fn new(magic_path: PathBuf) -> Self {
        Self::with_cache_ttl(magic_path, CACHE_TTL)
    }

    pub fn with_cache_ttl(magic_path: PathBuf, cache_ttl: Duration) -> Self {
        Self {
            magic_path,
            created_us: epoch_us(),
            cache_ttl,
            state: Mutex::new(OracleState::default()),
        }
    }

    /// Current developer-mode status, refreshed at most once per cache TTL.
    pub fn query(&self) -> DevModeStatus {
        let mut state = self.state.lock();
        if let Some((at, ref status)) = state.cached {
            if at.elapsed() < self.cache_ttl {
                return status.clone();
            }
        }
        let status = self.evaluate(&state);
        state.cached = Some((Instant::now(), status.clone()));
        status
    }

    /// Arm the five-minute key-sequence activation window.
    pub fn activate_key_sequence(&self) {
        let mut state = self.state.lock();
        state.key_sequence = Some(Activation::now());
        state.cached = None;
    }

    /// Arm the 24-hour password-override activation window.
    pub fn activate_password_override(&self) {
        let mut state = self.state.lock();
        state.password = Some(Activation::now());
        state.cached = None;
    }

    fn evaluate(&self, state: &OracleState) -> DevModeStatus {
        if let Some(at_us) = self.magic_file_activation() {
            return active("magic_file", at_us);
        }
        if env_active() {
            return active("environment", self.created_us);
        }
        if let Some(activation) = state.key_sequence {
            if activation.at.elapsed() < KEY_SEQUENCE_WINDOW {
                return active("key_sequence", activation.at_us);
            }
        }
        if let Some(activation) = state.password {
            if activation.at.elapsed() < PASSWORD_WINDOW {
                return active("password_override", activation.at_us);
            }
        }
        DevModeStatus::default()
    }

    /// Magic-file probe. Unreadable metadata is treated as inactive.
    fn magic_file_activation(&self) -> Option<u64> {
        let meta = std::fs::metadata(&self.magic_path).ok()?;
        let at_us = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_micros() as u64)
            .unwrap_or(self.created_us);
        Some(at_us)
    }
}

fn active(method: &'static str, at_us: u64) -> DevModeStatus {
    DevModeStatus { active: true, method: Some(method), activated_at: Some(at_us) }
}

fn env_active() -> bool {
    match std::env::var(DEV_MODE_ENV) {
        Ok(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "devmode_tests.rs"]
mod tests;
