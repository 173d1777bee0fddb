// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{decode, Decoded, Event, MouseButton, Phase};

fn expect_event(payload: &str) -> anyhow::Result<Event> {
    match decode(payload.as_bytes()) {
        Decoded::Event(event) => Ok(event),
        other => anyhow::bail!("expected event, got {other:?}"),
    }
}

// ── known kinds ───────────────────────────────────────────────────────────

#[test]
fn decodes_keystroke() -> anyhow::Result<()> {
    let event = expect_event(r#"{"type":"keystroke","ts":1000,"key":"a","event":"press"}"#)?;
    assert_eq!(
        event,
        Event::Keystroke { ts_us: 1000, key: "a".into(), phase: Phase::Press, user: None }
    );
    Ok(())
}

#[test]
fn decodes_mouse_move() -> anyhow::Result<()> {
    let event = expect_event(r#"{"type":"mouse_move","ts":5,"x":-3,"y":17}"#)?;
    assert_eq!(event, Event::MouseMove { ts_us: 5, x: -3, y: 17, user: None });
    Ok(())
}

#[test]
fn decodes_mouse_click_and_scroll() -> anyhow::Result<()> {
    let click =
        expect_event(r#"{"type":"mouse_click","ts":9,"button":"right","event":"release"}"#)?;
    assert_eq!(
        click,
        Event::MouseClick {
            ts_us: 9,
            button: MouseButton::Right,
            phase: Phase::Release,
            user: None
        }
    );

    let scroll = expect_event(r#"{"type":"mouse_scroll","ts":10,"dx":0,"dy":-2}"#)?;
    assert_eq!(scroll, Event::MouseScroll { ts_us: 10, dx: 0, dy: -2, user: None });
    Ok(())
}

#[test]
fn decodes_app_focus() -> anyhow::Result<()> {
    let event = expect_event(
        r#"{"type":"app","ts":77,"app_name":"firefox","window_title":"doc","user":"alice"}"#,
    )?;
    assert_eq!(
        event,
        Event::App {
            ts_us: 77,
            app_name: "firefox".into(),
            window_title: "doc".into(),
            user: Some("alice".into()),
        }
    );
    assert_eq!(event.user(), Some("alice"));
    assert_eq!(event.ts_us(), 77);
    Ok(())
}

// ── tolerance ─────────────────────────────────────────────────────────────

#[test]
fn unknown_fields_are_ignored() -> anyhow::Result<()> {
    let event =
        expect_event(r#"{"type":"keystroke","ts":1,"key":"b","event":"release","extra":42}"#)?;
    assert_eq!(event.ts_us(), 1);
    Ok(())
}

#[test]
fn unrecognised_button_maps_to_other() -> anyhow::Result<()> {
    let event = expect_event(r#"{"type":"mouse_click","ts":1,"button":"back","event":"press"}"#)?;
    let Event::MouseClick { button, .. } = event else {
        anyhow::bail!("expected mouse click");
    };
    assert_eq!(button, MouseButton::Other);
    Ok(())
}

#[test]
fn unknown_kind_is_reported_as_such() -> anyhow::Result<()> {
    match decode(br#"{"type":"gamepad","ts":1}"#) {
        Decoded::UnknownKind(kind) => assert_eq!(kind, "gamepad"),
        other => anyhow::bail!("expected unknown kind, got {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_payloads() {
    assert!(matches!(decode(b"not json"), Decoded::Malformed));
    assert!(matches!(decode(br#"{"ts":1}"#), Decoded::Malformed));
    // Known kind, missing required field.
    assert!(matches!(decode(br#"{"type":"keystroke","ts":1}"#), Decoded::Malformed));
    // Known kind, out-of-domain phase.
    assert!(matches!(
        decode(br#"{"type":"keystroke","ts":1,"key":"a","event":"hold"}"#),
        Decoded::Malformed
    ));
}
