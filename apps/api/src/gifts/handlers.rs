use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::gifts::filter::SuggestionRequest;
use crate::identity::Caller;
use crate::models::gift::GiftRow;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub success: bool,
    pub suggestions: Vec<GiftRow>,
    pub count: usize,
}

/// POST /api/gift-suggestions
///
/// Filters the catalog and records the search in the caller's history.
/// Zero matches is a successful, empty answer.
pub async fn handle_gift_suggestions(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let filter = request.validate()?;
    let suggestions = filter.fetch(&state.db).await?;

    state
        .ledger
        .history(&caller.identity)
        .record(filter.criteria())
        .await?;

    info!(
        "Gift suggestions for occasion '{}': {} matches",
        filter.occasion,
        suggestions.len()
    );

    Ok(Json(SuggestionResponse {
        success: true,
        count: suggestions.len(),
        suggestions,
    }))
}
