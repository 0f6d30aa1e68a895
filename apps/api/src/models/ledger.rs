use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::ledger::{SearchCriteria, SearchRecord};

/// A row of `search_history` or `saved_searches`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SearchRow {
    pub id: i64,
    pub user_id: Uuid,
    pub recipient: Option<String>,
    pub occasion: String,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub country: Option<String>,
    pub prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SearchRow> for SearchRecord {
    fn from(row: SearchRow) -> Self {
        SearchRecord {
            criteria: SearchCriteria {
                recipient: row.recipient,
                occasion: row.occasion,
                min_budget: row.min_budget,
                max_budget: row.max_budget,
                country: row.country,
                prompt: row.prompt,
            },
            timestamp: row.created_at,
        }
    }
}
