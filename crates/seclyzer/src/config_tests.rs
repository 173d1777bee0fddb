// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::Config;

fn test_config() -> Config {
    Config {
        redis_host: "127.0.0.1".into(),
        redis_port: 6379,
        redis_password: None,
        influx_url: "http://127.0.0.1:8086".into(),
        influx_token: String::new(),
        influx_org: "seclyzer".into(),
        influx_bucket: "behavior".into(),
        window_seconds: 30,
        update_interval_seconds: 5,
        user: "default".into(),
        dev_mode_file: "/tmp/.seclyzer_dev_mode".into(),
    }
}

#[test]
fn redis_url_without_password() {
    assert_eq!(test_config().redis_url(), "redis://127.0.0.1:6379/");
}

#[test]
fn redis_url_with_password() {
    let mut config = test_config();
    config.redis_password = Some("hunter2".into());
    config.redis_port = 6380;
    assert_eq!(config.redis_url(), "redis://:hunter2@127.0.0.1:6380/");
}

#[test]
fn duration_helpers() {
    let config = test_config();
    assert_eq!(config.window(), Duration::from_secs(30));
    assert_eq!(config.update_interval(), Duration::from_secs(5));
}
