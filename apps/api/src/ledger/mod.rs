//! Favorites and search-history ledger.
//!
//! Every ledger operation runs against one owner: a signed-in user (durable
//! rows in Postgres) or a guest session (JSON values in the session store).
//! Callers resolve the owner once from the request's [`Identity`] and then
//! talk to the capability traits only.

pub mod capped;
pub mod durable;
pub mod guest;
pub mod handlers;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::identity::Identity;
use crate::session::{SessionStore, HISTORY_KEY, SAVED_SEARCHES_KEY};

use self::durable::{PgFavorites, PgSearchLog, SearchTable};
use self::guest::{SessionFavorites, SessionSearchLog};

/// The form fields of one gift search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default)]
    pub recipient: Option<String>,
    pub occasion: String,
    #[serde(default)]
    pub min_budget: Option<f64>,
    #[serde(default)]
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(flatten)]
    pub criteria: SearchCriteria,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Idempotent. Returns `false` when the gift was already a favorite.
    async fn add(&self, gift_id: i64) -> Result<bool, AppError>;
    async fn remove(&self, gift_id: i64) -> Result<(), AppError>;
    async fn list(&self) -> Result<Vec<i64>, AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// A bounded, newest-first log of searches.
#[async_trait]
pub trait SearchLog: Send + Sync {
    async fn record(&self, criteria: SearchCriteria) -> Result<(), AppError>;
    /// Newest first, at most the configured limit.
    async fn list(&self) -> Result<Vec<SearchRecord>, AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// Builds owner-bound ledger stores.
#[derive(Clone)]
pub struct Ledger {
    pool: PgPool,
    sessions: Arc<dyn SessionStore>,
    history_limit: usize,
    saved_search_limit: usize,
}

impl Ledger {
    pub fn new(
        pool: PgPool,
        sessions: Arc<dyn SessionStore>,
        history_limit: usize,
        saved_search_limit: usize,
    ) -> Self {
        Self {
            pool,
            sessions,
            history_limit,
            saved_search_limit,
        }
    }

    pub fn favorites(&self, identity: &Identity) -> Box<dyn FavoritesStore> {
        match identity {
            Identity::User(user_id) => Box::new(PgFavorites::new(self.pool.clone(), *user_id)),
            Identity::Guest(session_id) => Box::new(SessionFavorites::new(
                self.sessions.clone(),
                session_id.clone(),
            )),
        }
    }

    pub fn history(&self, identity: &Identity) -> Box<dyn SearchLog> {
        self.search_log(
            identity,
            SearchTable::History,
            HISTORY_KEY,
            self.history_limit,
        )
    }

    pub fn saved_searches(&self, identity: &Identity) -> Box<dyn SearchLog> {
        self.search_log(
            identity,
            SearchTable::SavedSearches,
            SAVED_SEARCHES_KEY,
            self.saved_search_limit,
        )
    }

    fn search_log(
        &self,
        identity: &Identity,
        table: SearchTable,
        session_key: &'static str,
        limit: usize,
    ) -> Box<dyn SearchLog> {
        match identity {
            Identity::User(user_id) => Box::new(PgSearchLog::new(
                self.pool.clone(),
                *user_id,
                table,
                limit,
            )),
            Identity::Guest(session_id) => Box::new(SessionSearchLog::new(
                self.sessions.clone(),
                session_id.clone(),
                session_key,
                limit,
            )),
        }
    }
}
