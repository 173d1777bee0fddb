// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed event model for the `seclyzer:events` wire envelope.
//!
//! Collectors publish single-line JSON objects tagged with a `type` field.
//! Decoding distinguishes unknown types (counted, dropped) from malformed
//! payloads (counted, dropped); unknown fields inside a known type are
//! ignored. Timestamps are microseconds since epoch, near-monotonic but
//! never trusted to be ordered.

use serde::{Deserialize, Serialize};

/// Key or button transition direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Press,
    Release,
}

/// Mouse button identifier. Unrecognised button names map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl<'de> Deserialize<'de> for MouseButton {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(match name.as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            "middle" => Self::Middle,
            _ => Self::Other,
        })
    }
}

/// One decoded record from the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Keystroke {
        #[serde(rename = "ts")]
        ts_us: u64,
        key: String,
        #[serde(rename = "event")]
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
    MouseMove {
        #[serde(rename = "ts")]
        ts_us: u64,
        x: i32,
        y: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
    MouseClick {
        #[serde(rename = "ts")]
        ts_us: u64,
        button: MouseButton,
        #[serde(rename = "event")]
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
    MouseScroll {
        #[serde(rename = "ts")]
        ts_us: u64,
        dx: i32,
        dy: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
    App {
        #[serde(rename = "ts")]
        ts_us: u64,
        app_name: String,
        window_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
    },
}

impl Event {
    pub fn ts_us(&self) -> u64 {
        match self {
            Self::Keystroke { ts_us, .. }
            | Self::MouseMove { ts_us, .. }
            | Self::MouseClick { ts_us, .. }
            | Self::MouseScroll { ts_us, .. }
            | Self::App { ts_us, .. } => *ts_us,
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Keystroke { user, .. }
            | Self::MouseMove { user, .. }
            | Self::MouseClick { user, .. }
            | Self::MouseScroll { user, .. }
            | Self::App { user, .. } => user.as_deref(),
        }
    }
}

/// Outcome of decoding one bus payload.
#[derive(Debug)]
pub enum Decoded {
    Event(Event),
    UnknownKind(String),
    Malformed,
}

const KNOWN_KINDS: [&str; 5] = [
    "keystroke",
    "mouse_move",
    "mouse_click",
    "mouse_scroll",
    "app",
];

/// Decode one wire payload. Two-stage so an unrecognised `type` is
/// reported distinctly from JSON that fails to parse at all.
pub fn decode(payload: &[u8]) -> Decoded {
    let value: serde_json::Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(_) => return Decoded::Malformed,
    };
    let kind = match value.get("type").and_then(|v| v.as_str()) {
        Some(kind) => kind,
        None => return Decoded::Malformed,
    };
    if !KNOWN_KINDS.contains(&kind) {
        return Decoded::UnknownKind(kind.to_owned());
    }
    match serde_json::from_value(value) {
        Ok(event) => Decoded::Event(event),
        Err(_) => Decoded::Malformed,
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
