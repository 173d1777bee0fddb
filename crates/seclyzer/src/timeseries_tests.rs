// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{render_line, FieldValue};

#[test]
fn renders_basic_line() {
    let line = render_line(
        "keystroke_features",
        &[("user", "alice".into()), ("dev_mode", "false".into())],
        &[("dwell_mean", FieldValue::Float(80.0)), ("total_keys", FieldValue::Float(2.0))],
        1_700_000_000_000_000,
    );
    assert_eq!(
        line,
        "keystroke_features,dev_mode=false,user=alice dwell_mean=80,total_keys=2 1700000000000000"
    );
}

#[test]
fn tags_are_sorted_by_key() {
    let line = render_line(
        "m",
        &[("zeta", "1".into()), ("alpha", "2".into()), ("mid", "3".into())],
        &[("f", FieldValue::Float(1.0))],
        0,
    );
    assert!(line.starts_with("m,alpha=2,mid=3,zeta=1 "));
}

#[test]
fn escapes_tag_values_and_measurement() {
    let line = render_line(
        "app transitions",
        &[("from_app", "code editor, stable".into()), ("to_app", "a=b".into())],
        &[("duration_ms", FieldValue::Float(1.5))],
        10,
    );
    assert_eq!(
        line,
        "app\\ transitions,from_app=code\\ editor\\,\\ stable,to_app=a\\=b duration_ms=1.5 10"
    );
}

#[test]
fn renders_bools_and_sanitizes_non_finite() {
    let line = render_line(
        "m",
        &[],
        &[
            ("ok", FieldValue::Bool(true)),
            ("bad", FieldValue::Float(f64::NAN)),
            ("inf", FieldValue::Float(f64::INFINITY)),
        ],
        7,
    );
    assert_eq!(line, "m ok=true,bad=0,inf=0 7");
}

#[test]
fn field_value_conversions() {
    assert_eq!(FieldValue::from(1.25), FieldValue::Float(1.25));
    assert_eq!(FieldValue::from(false), FieldValue::Bool(false));
}
