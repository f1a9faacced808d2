//! Distributed locks on Redis: atomic set-if-absent with a TTL, released by
//! compare-and-delete so an expired holder can never delete a lock that now
//! belongs to someone else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fred::interfaces::{KeysInterface, LuaInterface};
use fred::prelude::*;
use log::warn;
use uuid::Uuid;

// Deletes the key only while it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
end
return 0
"#;

#[async_trait]
pub trait LockManager: Send + Sync {
    /// Tries to take the lock; `None` means contended after all retries.
    async fn acquire(&self, key: &str) -> Result<Option<String>, RedisError>;

    /// Compare-and-delete. `false` when the key is absent or held by another
    /// token; neither case is an error.
    async fn release(&self, key: &str, token: &str) -> Result<bool, RedisError>;
}

pub struct RedisLockManager {
    client: RedisClient,
    ttl: Duration,
    retries: u32,
    backoff: Duration,
}

impl RedisLockManager {
    // The TTL must comfortably exceed the worst-case handler duration; it is
    // the safety net that frees locks of crashed holders.
    pub fn new(client: RedisClient, ttl: Duration, retries: u32, backoff: Duration) -> Self {
        Self {
            client,
            ttl,
            retries,
            backoff,
        }
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn acquire(&self, key: &str) -> Result<Option<String>, RedisError> {
        let token = Uuid::new_v4().to_string();
        for attempt in 0..=self.retries {
            let set: Option<String> = self
                .client
                .set(
                    key,
                    token.as_str(),
                    Some(Expiration::PX(self.ttl.as_millis() as i64)),
                    Some(SetOptions::NX),
                    false,
                )
                .await?;
            if set.is_some() {
                return Ok(Some(token));
            }
            if attempt < self.retries {
                tokio::time::sleep(self.backoff).await;
            }
        }
        Ok(None)
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, RedisError> {
        let removed: i64 = self
            .client
            .eval(RELEASE_SCRIPT, vec![key], vec![token])
            .await?;
        Ok(removed == 1)
    }
}

/// An acquired lock. Call [`OwnedLock::release`] on orderly exits; if the
/// holding request is cancelled or errors out early, drop runs the release
/// on a detached task, so cancellation cannot leak the lock past its TTL.
pub struct OwnedLock {
    manager: Arc<dyn LockManager>,
    key: String,
    token: String,
    released: bool,
}

impl OwnedLock {
    pub fn new(
        manager: Arc<dyn LockManager>,
        key: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            key: key.into(),
            token: token.into(),
            released: false,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn release(mut self) {
        self.released = true;
        if let Err(err) = self.manager.release(&self.key, &self.token).await {
            warn!("failed to release lock {}: {:?}", self.key, err);
        }
    }
}

impl Drop for OwnedLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let manager = Arc::clone(&self.manager);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = manager.release(&key, &token).await {
                    warn!("failed to release lock {}: {:?}", key, err);
                }
            });
        }
    }
}
