// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::{restart_delay, ExtractorKind};

#[test]
fn restart_delay_doubles_from_half_a_second() {
    assert_eq!(restart_delay(0), Duration::from_millis(500));
    assert_eq!(restart_delay(1), Duration::from_secs(1));
    assert_eq!(restart_delay(2), Duration::from_secs(2));
    assert_eq!(restart_delay(5), Duration::from_secs(16));
}

#[test]
fn restart_delay_caps_at_thirty_seconds() {
    assert_eq!(restart_delay(6), Duration::from_secs(30));
    assert_eq!(restart_delay(20), Duration::from_secs(30));
    assert_eq!(restart_delay(u32::MAX), Duration::from_secs(30));
}

#[test]
fn all_extractors_are_supervised() {
    assert_eq!(ExtractorKind::ALL.len(), 3);
    let names: Vec<&str> = ExtractorKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(names, ["keystroke", "mouse", "app"]);
}
