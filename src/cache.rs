// src/cache.rs
// Thin wrapper over the shared cache store (Redis) used by both the rate
// limiter (`ratelimit:*` keys) and the job queue (`bull:*` keys).

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

#[derive(Clone)]
pub struct CacheStore {
    client: redis::Client,
    manager: ConnectionManager,
}

impl CacheStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid cache store url")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("failed to connect to cache store")?;
        Ok(Self { client, manager })
    }

    pub async fn ping(&self) -> bool {
        let mut con = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut con)
            .await
            .is_ok()
    }

    /// Atomically increment `key`, arming a TTL only when the counter was just
    /// created (new value == 1). Returns the post-increment value.
    pub async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64> {
        let mut con = self.manager.clone();
        let value: i64 = con.incr(key, 1).await?;
        if value == 1 {
            let _: () = con.expire(key, ttl.as_secs() as i64).await?;
        }
        Ok(value)
    }

    pub async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let mut con = self.manager.clone();
        let value: Option<i64> = con.get(key).await?;
        Ok(value)
    }

    pub async fn ttl_seconds(&self, key: &str) -> Result<i64> {
        let mut con = self.manager.clone();
        let ttl: i64 = con.ttl(key).await?;
        Ok(ttl.max(0))
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.del(key).await?;
        Ok(())
    }

    pub async fn incr_by(&self, key: &str, amount: i64, ttl: Duration) -> Result<i64> {
        let mut con = self.manager.clone();
        let value: i64 = con.incr(key, amount).await?;
        if value == amount {
            let _: () = con.expire(key, ttl.as_secs() as i64).await?;
        }
        Ok(value)
    }

    pub async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.rpush(key, value).await?;
        Ok(())
    }

    pub async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.manager.clone();
        let value: Option<String> = con.lpop(key, None).await?;
        Ok(value)
    }

    pub async fn llen(&self, key: &str) -> Result<i64> {
        let mut con = self.manager.clone();
        let len: i64 = con.llen(key).await?;
        Ok(len)
    }

    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.hset(key, field, value).await?;
        Ok(())
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut con = self.manager.clone();
        let value: Option<String> = con.hget(key, field).await?;
        Ok(value)
    }

    pub async fn hgetall(&self, key: &str) -> Result<std::collections::HashMap<String, String>> {
        let mut con = self.manager.clone();
        let value: std::collections::HashMap<String, String> = con.hgetall(key).await?;
        Ok(value)
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }

    pub async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        let mut con = self.manager.clone();
        let _: () = con.publish(channel, message).await?;
        Ok(())
    }

    /// Open a dedicated pub/sub connection subscribed to `channel`. The
    /// `ConnectionManager` used for everything else cannot enter subscriber
    /// mode, so job-completion waiters get their own connection from the
    /// underlying client.
    pub async fn subscribe(&self, channel: &str) -> Result<redis::aio::PubSub> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        Ok(pubsub)
    }
}
