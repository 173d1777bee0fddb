// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the seclyzer feature pipeline.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "seclyzer", about = "Behavioral-biometrics feature pipeline")]
pub struct Config {
    /// Redis host serving the event bus and config store.
    #[arg(long, default_value = "127.0.0.1", env = "REDIS_HOST")]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, default_value_t = 6379, env = "REDIS_PORT")]
    pub redis_port: u16,

    /// Redis password. If unset, the connection is unauthenticated.
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Base URL of the InfluxDB instance receiving feature points.
    #[arg(long, default_value = "http://127.0.0.1:8086", env = "INFLUX_URL")]
    pub influx_url: String,

    /// InfluxDB API token.
    #[arg(long, default_value = "", env = "INFLUX_TOKEN")]
    pub influx_token: String,

    /// InfluxDB organization.
    #[arg(long, default_value = "seclyzer", env = "INFLUX_ORG")]
    pub influx_org: String,

    /// InfluxDB bucket.
    #[arg(long, default_value = "behavior", env = "INFLUX_BUCKET")]
    pub influx_bucket: String,

    /// Trailing window over which features are computed, in seconds.
    #[arg(long, default_value_t = 30, env = "WINDOW_SECONDS")]
    pub window_seconds: u64,

    /// Feature emission cadence, in seconds.
    #[arg(long = "update-interval", default_value_t = 5, env = "UPDATE_INTERVAL")]
    pub update_interval_seconds: u64,

    /// User id tagged on events that do not carry one.
    #[arg(long, default_value = "default", env = "SECLYZER_USER")]
    pub user: String,

    /// Magic-file path checked by the developer-mode oracle.
    #[arg(
        long,
        default_value = "/tmp/.seclyzer_dev_mode",
        env = "SECLYZER_DEV_MODE_FILE"
    )]
    pub dev_mode_file: std::path::PathBuf,
}

impl Config {
    pub fn window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.window_seconds)
    }

    pub fn update_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.update_interval_seconds)
    }

    /// Connection URL for the shared Redis client.
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => {
                format!("redis://:{password}@{}:{}/", self.redis_host, self.redis_port)
            }
            None => format!("redis://{}:{}/", self.redis_host, self.redis_port),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
