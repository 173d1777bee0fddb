// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-bus client over Redis pub/sub.
//!
//! Each subscriber owns a dedicated pub/sub connection and hands decoded
//! events to its extractor through a bounded channel. Transport failures
//! reconnect with capped exponential backoff; a resumed subscription
//! starts from "now" and events published in the gap are lost, which the
//! pipeline tolerates. Decode failures are counted and skipped, never
//! fatal.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{self, Decoded, Event};
use crate::state::PipelineCounters;

/// Input channel carrying raw collector events.
pub const EVENTS_CHANNEL: &str = "seclyzer:events";
/// Output channel mirroring keystroke feature records.
pub const FEATURES_KEYSTROKE_CHANNEL: &str = "seclyzer:features:keystroke";
/// Output channel mirroring mouse feature records.
pub const FEATURES_MOUSE_CHANNEL: &str = "seclyzer:features:mouse";
/// Output channel mirroring app transition records.
pub const FEATURES_APP_CHANNEL: &str = "seclyzer:features:app";

const RECONNECT_MIN: Duration = Duration::from_millis(100);
const RECONNECT_MAX: Duration = Duration::from_secs(10);
const SUBSCRIBER_QUEUE: usize = 1024;

/// Shared pub/sub handle. Publishing goes through a reconnecting
/// connection manager; subscriptions spawn their own connections.
pub struct EventBus {
    client: redis::Client,
    publisher: redis::aio::ConnectionManager,
    counters: Arc<PipelineCounters>,
}

impl EventBus {
    /// Connect the shared publisher side.
    pub async fn connect(
        client: redis::Client,
        counters: Arc<PipelineCounters>,
    ) -> anyhow::Result<Self> {
        let publisher = client.get_connection_manager().await?;
        Ok(Self { client, publisher, counters })
    }

    /// Subscribe to a channel, spawning a background task that decodes
    /// events into the returned receiver until shutdown.
    pub fn subscribe(&self, channel: &str, shutdown: CancellationToken) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        let client = self.client.clone();
        let counters = Arc::clone(&self.counters);
        let channel = channel.to_owned();
        tokio::spawn(async move {
            run_subscriber(client, channel, tx, counters, shutdown).await;
        });
        rx
    }

    /// Best-effort publish of a JSON payload.
    pub async fn publish(&self, channel: &str, payload: String) -> anyhow::Result<()> {
        let mut conn = self.publisher.clone();
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }
}

async fn run_subscriber(
    client: redis::Client,
    channel: String,
    tx: mpsc::Sender<Event>,
    counters: Arc<PipelineCounters>,
    shutdown: CancellationToken,
) {
    let mut backoff = RECONNECT_MIN;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        match subscribe_once(&client, &channel).await {
            Ok(mut pubsub) => {
                backoff = RECONNECT_MIN;
                tracing::debug!(channel = %channel, "bus subscriber connected");
                let mut stream = pubsub.on_message();

                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        msg = stream.next() => {
                            // Stream end means the connection dropped.
                            let Some(msg) = msg else { break };
                            match events::decode(msg.get_payload_bytes()) {
                                Decoded::Event(event) => {
                                    counters.decoded_events.fetch_add(1, Ordering::Relaxed);
                                    if tx.send(event).await.is_err() {
                                        return; // receiver gone, extractor ended
                                    }
                                }
                                Decoded::UnknownKind(kind) => {
                                    counters.unknown_events.fetch_add(1, Ordering::Relaxed);
                                    tracing::trace!(kind = %kind, "dropping unknown event kind");
                                }
                                Decoded::Malformed => {
                                    counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                                    tracing::debug!(channel = %channel, "dropping malformed event payload");
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!(channel = %channel, err = %e, "bus subscribe failed");
            }
        }

        counters.bus_reconnects.fetch_add(1, Ordering::Relaxed);
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = next_backoff(backoff);
    }
}

async fn subscribe_once(
    client: &redis::Client,
    channel: &str,
) -> anyhow::Result<redis::aio::PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    Ok(pubsub)
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(RECONNECT_MAX)
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
