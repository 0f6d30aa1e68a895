//! Ephemeral per-session key/value buckets.
//!
//! Guest favorites, guest history and the suggestion bridge slot live here.
//! Redis backs the store in deployments; `MemorySessionStore` is used when no
//! `REDIS_URL` is configured and in tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

pub const FAVORITES_KEY: &str = "gift_favorites";
pub const HISTORY_KEY: &str = "gift_search_history";
pub const SAVED_SEARCHES_KEY: &str = "saved_searches";
pub const SUGGESTIONS_KEY: &str = "giftSuggestions";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Stored value is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Session store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError>;
    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError>;
    async fn remove(&self, session_id: &str, key: &str) -> Result<(), SessionError>;
}

/// Reads a JSON value from the session, or `T::default()` when absent.
pub async fn load_json<T>(
    store: &dyn SessionStore,
    session_id: &str,
    key: &str,
) -> Result<T, SessionError>
where
    T: DeserializeOwned + Default,
{
    match store.get(session_id, key).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(T::default()),
    }
}

pub async fn save_json<T>(
    store: &dyn SessionStore,
    session_id: &str,
    key: &str,
    value: &T,
) -> Result<(), SessionError>
where
    T: Serialize + ?Sized,
{
    store
        .set(session_id, key, serde_json::to_string(value)?)
        .await
}

const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(86_400);

struct MemoryEntry {
    value: String,
    written_at: Instant,
}

/// In-process buckets. Like the Redis store, a value expires `ttl` after
/// its last write; expired values are swept on every write.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<(String, String), MemoryEntry>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_MEMORY_TTL)
    }
}

impl MemorySessionStore {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn is_live(&self, entry: &MemoryEntry, now: Instant) -> bool {
        now.duration_since(entry.written_at) < self.ttl
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let entries = self.entries.lock().map_err(|_| SessionError::Poisoned)?;
        let now = Instant::now();
        Ok(entries
            .get(&(session_id.to_string(), key.to_string()))
            .filter(|entry| self.is_live(entry, now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().map_err(|_| SessionError::Poisoned)?;
        let now = Instant::now();
        entries.retain(|_, entry| self.is_live(entry, now));
        entries.insert(
            (session_id.to_string(), key.to_string()),
            MemoryEntry {
                value,
                written_at: now,
            },
        );
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        let mut entries = self.entries.lock().map_err(|_| SessionError::Poisoned)?;
        entries.remove(&(session_id.to_string(), key.to_string()));
        Ok(())
    }
}

/// Redis-backed buckets. Every write refreshes the key's TTL, so a bucket
/// disappears once its session has been idle for `ttl_secs`.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis session store connected (ttl {ttl_secs}s)");
        Ok(Self { conn, ttl_secs })
    }
}

fn redis_key(session_id: &str, key: &str) -> String {
    format!("giftgenie:session:{session_id}:{key}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(redis_key(session_id, key)).await?;
        Ok(value)
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(redis_key(session_id, key), value, self.ttl_secs)
            .await?;
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(redis_key(session_id, key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_isolates_sessions() {
        let store = MemorySessionStore::new();
        store.set("a", FAVORITES_KEY, "[1]".into()).await.unwrap();
        assert_eq!(
            store.get("a", FAVORITES_KEY).await.unwrap().as_deref(),
            Some("[1]")
        );
        assert!(store.get("b", FAVORITES_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_json_defaults_when_absent() {
        let store = MemorySessionStore::new();
        let ids: Vec<i64> = load_json(&store, "a", FAVORITES_KEY).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_json() {
        let store = MemorySessionStore::new();
        save_json(&store, "a", FAVORITES_KEY, &vec![3_i64, 7]).await.unwrap();
        let ids: Vec<i64> = load_json(&store, "a", FAVORITES_KEY).await.unwrap();
        assert_eq!(ids, vec![3, 7]);
    }

    #[tokio::test]
    async fn test_load_json_rejects_garbage() {
        let store = MemorySessionStore::new();
        store.set("a", HISTORY_KEY, "{not json".into()).await.unwrap();
        let result: Result<Vec<i64>, _> = load_json(&store, "a", HISTORY_KEY).await;
        assert!(matches!(result, Err(SessionError::Serde(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expires_idle_values() {
        let store = MemorySessionStore::with_ttl(Duration::from_secs(60));
        store.set("old", HISTORY_KEY, "[]".into()).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(store.get("old", HISTORY_KEY).await.unwrap().is_none());
        store.set("new", HISTORY_KEY, "[]".into()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("new", HISTORY_KEY).await.unwrap().is_some());
    }

    #[test]
    fn test_redis_key_layout() {
        assert_eq!(
            redis_key("abc", SUGGESTIONS_KEY),
            "giftgenie:session:abc:giftSuggestions"
        );
    }
}
