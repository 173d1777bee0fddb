// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::devmode::DevModeStatus;

use super::FeatureRecord;

fn record(dev_mode: DevModeStatus) -> FeatureRecord {
    FeatureRecord {
        measurement: "keystroke_features",
        user: "alice".into(),
        dev_mode,
        extra_tags: Vec::new(),
        fields: vec![("dwell_mean", 80.0), ("total_keys", 2.0)],
        ts_us: 123,
    }
}

#[test]
fn inactive_record_has_no_method_tag() {
    let tags = record(DevModeStatus::default()).tags();
    assert_eq!(
        tags,
        vec![("user", "alice".to_owned()), ("dev_mode", "false".to_owned())]
    );
}

#[test]
fn active_record_carries_method_tag() {
    let status = DevModeStatus {
        active: true,
        method: Some("magic_file"),
        activated_at: Some(99),
    };
    let tags = record(status).tags();
    assert!(tags.contains(&("dev_mode", "true".to_owned())));
    assert!(tags.contains(&("dev_mode_method", "magic_file".to_owned())));
}

#[test]
fn extra_tags_follow_standard_tags() {
    let mut rec = record(DevModeStatus::default());
    rec.extra_tags = vec![("from_app", "firefox".into()), ("to_app", "chrome".into())];
    let tags = rec.tags();
    assert_eq!(tags[2], ("from_app", "firefox".to_owned()));
    assert_eq!(tags[3], ("to_app", "chrome".to_owned()));
}

#[test]
fn json_mirror_shape() -> anyhow::Result<()> {
    let json = record(DevModeStatus::default()).to_json();
    assert_eq!(json["measurement"], "keystroke_features");
    assert_eq!(json["user"], "alice");
    assert_eq!(json["dev_mode"], "false");
    assert_eq!(json["fields"]["dwell_mean"], 80.0);
    assert_eq!(json["fields"]["total_keys"], 2.0);
    assert_eq!(json["ts_us"], 123);
    // The mirror round-trips through a single JSON line.
    let line = json.to_string();
    let back: serde_json::Value = serde_json::from_str(&line)?;
    assert_eq!(back, json);
    Ok(())
}
