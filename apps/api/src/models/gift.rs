use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GiftRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub recipient: Option<String>,
    pub occasion: String,
    pub country: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
