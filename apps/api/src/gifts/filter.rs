//! Catalog filter behind `POST /api/gift-suggestions`.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::ledger::SearchCriteria;
use crate::models::gift::GiftRow;

pub const SUGGESTION_LIMIT: i64 = 12;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionRequest {
    pub recipient: Option<String>,
    pub occasion: Option<String>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub country: Option<String>,
    pub prompt: Option<String>,
}

/// A validated request. Blank text fields are treated as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionFilter {
    pub occasion: String,
    pub recipient: Option<String>,
    pub country: Option<String>,
    /// Present only when both bounds were given.
    pub budget: Option<(f64, f64)>,
    pub prompt: Option<String>,
    min_budget: Option<f64>,
    max_budget: Option<f64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SuggestionRequest {
    pub fn validate(self) -> Result<SuggestionFilter, AppError> {
        let mut problems = Vec::new();

        let occasion = non_blank(self.occasion);
        if occasion.is_none() {
            problems.push(("occasion", "is required"));
        }
        if self.min_budget.is_some_and(|v| v < 0.0) {
            problems.push(("min_budget", "must be a number >= 0"));
        }
        if self.max_budget.is_some_and(|v| v < 0.0) {
            problems.push(("max_budget", "must be a number >= 0"));
        }

        let Some(occasion) = occasion.filter(|_| problems.is_empty()) else {
            return Err(AppError::fields(&problems));
        };

        Ok(SuggestionFilter {
            occasion,
            recipient: non_blank(self.recipient),
            country: non_blank(self.country),
            budget: self.min_budget.zip(self.max_budget),
            prompt: non_blank(self.prompt),
            min_budget: self.min_budget,
            max_budget: self.max_budget,
        })
    }
}

impl SuggestionFilter {
    /// The search as it is written to history.
    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            recipient: self.recipient.clone(),
            occasion: self.occasion.clone(),
            min_budget: self.min_budget,
            max_budget: self.max_budget,
            country: self.country.clone(),
            prompt: self.prompt.clone(),
        }
    }

    /// AND-combines every present filter. Text matches ignore case; the
    /// budget clause keeps gifts whose price range overlaps the budget.
    pub fn build_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT * FROM gifts WHERE LOWER(occasion) = LOWER(");
        qb.push_bind(self.occasion.clone()).push(")");

        if let Some(recipient) = &self.recipient {
            qb.push(" AND LOWER(recipient) = LOWER(")
                .push_bind(recipient.clone())
                .push(")");
        }
        if let Some(country) = &self.country {
            qb.push(" AND LOWER(country) = LOWER(")
                .push_bind(country.clone())
                .push(")");
        }
        if let Some((min, max)) = self.budget {
            qb.push(" AND min_price <= ")
                .push_bind(max)
                .push(" AND max_price >= ")
                .push_bind(min);
        }

        qb.push(" ORDER BY id LIMIT ").push_bind(SUGGESTION_LIMIT);
        qb
    }

    pub async fn fetch(&self, pool: &PgPool) -> Result<Vec<GiftRow>, AppError> {
        let mut qb = self.build_query();
        let gifts = qb.build_query_as::<GiftRow>().fetch_all(pool).await?;
        Ok(gifts)
    }
}
