// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent string key–value store backed by Redis.
//!
//! Writes are serialised by the store itself; callers hold clones of a
//! reconnecting connection manager and keep no state of their own.

use redis::AsyncCommands;

/// Key holding the serialized AppTracker snapshot.
pub const APP_PATTERNS_KEY: &str = "app_patterns";

pub struct ConfigStore {
    conn: redis::aio::ConnectionManager,
}

impl ConfigStore {
    pub async fn connect(client: &redis::Client) -> anyhow::Result<Self> {
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    pub async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
