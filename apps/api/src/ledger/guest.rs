//! Guest ledgers stored as JSON values in the caller's session bucket.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::errors::AppError;
use crate::ledger::capped::CappedLog;
use crate::ledger::{FavoritesStore, SearchCriteria, SearchLog, SearchRecord};
use crate::session::{load_json, save_json, SessionStore, FAVORITES_KEY};

/// Favorites as a JSON array of gift ids.
pub struct SessionFavorites {
    store: Arc<dyn SessionStore>,
    session_id: String,
}

impl SessionFavorites {
    pub fn new(store: Arc<dyn SessionStore>, session_id: String) -> Self {
        Self { store, session_id }
    }

    async fn load(&self) -> Result<Vec<i64>, AppError> {
        Ok(load_json(self.store.as_ref(), &self.session_id, FAVORITES_KEY).await?)
    }

    async fn save(&self, ids: &[i64]) -> Result<(), AppError> {
        Ok(save_json(self.store.as_ref(), &self.session_id, FAVORITES_KEY, ids).await?)
    }
}

#[async_trait]
impl FavoritesStore for SessionFavorites {
    async fn add(&self, gift_id: i64) -> Result<bool, AppError> {
        let mut ids = self.load().await?;
        if ids.contains(&gift_id) {
            return Ok(false);
        }
        ids.push(gift_id);
        self.save(&ids).await?;
        debug!("Session {} favorited gift {gift_id}", self.session_id);
        Ok(true)
    }

    async fn remove(&self, gift_id: i64) -> Result<(), AppError> {
        let mut ids = self.load().await?;
        ids.retain(|id| *id != gift_id);
        self.save(&ids).await
    }

    async fn list(&self) -> Result<Vec<i64>, AppError> {
        self.load().await
    }

    async fn clear(&self) -> Result<(), AppError> {
        Ok(self.store.remove(&self.session_id, FAVORITES_KEY).await?)
    }
}

/// A capped, newest-first search log under one session key.
pub struct SessionSearchLog {
    store: Arc<dyn SessionStore>,
    session_id: String,
    key: &'static str,
    limit: usize,
}

impl SessionSearchLog {
    pub fn new(
        store: Arc<dyn SessionStore>,
        session_id: String,
        key: &'static str,
        limit: usize,
    ) -> Self {
        Self {
            store,
            session_id,
            key,
            limit,
        }
    }

    async fn load(&self) -> Result<CappedLog<SearchRecord>, AppError> {
        let entries: Vec<SearchRecord> =
            load_json(self.store.as_ref(), &self.session_id, self.key).await?;
        Ok(CappedLog::from_entries(entries, self.limit))
    }
}

#[async_trait]
impl SearchLog for SessionSearchLog {
    async fn record(&self, criteria: SearchCriteria) -> Result<(), AppError> {
        let mut log = self.load().await?;
        let evicted = log.push(SearchRecord {
            criteria,
            timestamp: Utc::now(),
        });
        if !evicted.is_empty() {
            debug!(
                "Evicted {} old {} entries for session {}",
                evicted.len(),
                self.key,
                self.session_id
            );
        }
        save_json(self.store.as_ref(), &self.session_id, self.key, log.entries()).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SearchRecord>, AppError> {
        Ok(self.load().await?.into_entries())
    }

    async fn clear(&self) -> Result<(), AppError> {
        Ok(self.store.remove(&self.session_id, self.key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, HISTORY_KEY};

    fn store() -> Arc<dyn SessionStore> {
        Arc::new(MemorySessionStore::new())
    }

    fn criteria(occasion: &str) -> SearchCriteria {
        SearchCriteria {
            recipient: Some("friend".into()),
            occasion: occasion.to_string(),
            min_budget: None,
            max_budget: None,
            country: None,
            prompt: None,
        }
    }

    #[tokio::test]
    async fn test_add_favorite_twice_stores_once() {
        let favorites = SessionFavorites::new(store(), "s1".into());
        assert!(favorites.add(4).await.unwrap());
        assert!(!favorites.add(4).await.unwrap());
        assert_eq!(favorites.list().await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_remove_favorite_filters_only_that_id() {
        let favorites = SessionFavorites::new(store(), "s1".into());
        for id in [1, 2, 3] {
            favorites.add(id).await.unwrap();
        }
        favorites.remove(2).await.unwrap();
        favorites.remove(99).await.unwrap();
        assert_eq!(favorites.list().await.unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_clear_favorites() {
        let favorites = SessionFavorites::new(store(), "s1".into());
        favorites.add(1).await.unwrap();
        favorites.clear().await.unwrap();
        assert!(favorites.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_ten_most_recent() {
        let history = SessionSearchLog::new(store(), "s1".into(), HISTORY_KEY, 10);
        for n in 1..=11 {
            history.record(criteria(&format!("occasion-{n}"))).await.unwrap();
        }

        let entries = history.list().await.unwrap();
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].criteria.occasion, "occasion-11");
        assert_eq!(entries[9].criteria.occasion, "occasion-2");
        assert!(entries.iter().all(|e| e.criteria.occasion != "occasion-1"));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_history() {
        let shared = store();
        let a = SessionSearchLog::new(shared.clone(), "a".into(), HISTORY_KEY, 10);
        let b = SessionSearchLog::new(shared, "b".into(), HISTORY_KEY, 10);
        a.record(criteria("birthday")).await.unwrap();
        assert!(b.list().await.unwrap().is_empty());
    }
}
