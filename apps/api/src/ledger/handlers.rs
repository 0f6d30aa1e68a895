//! Axum route handlers for favorites, search history and saved searches.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ClearScope;
use crate::errors::AppError;
use crate::gifts::catalog::{gift_exists, gifts_by_ids};
use crate::gifts::filter::SuggestionRequest;
use crate::identity::{Caller, Identity};
use crate::ledger::SearchRecord;
use crate::models::gift::GiftRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

const OK: SuccessResponse = SuccessResponse { success: true };

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub gift_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AddFavoriteResponse {
    pub success: bool,
    /// `false` when the gift was already a favorite.
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<GiftRow>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<SearchRecord>,
}

#[derive(Debug, Serialize)]
pub struct SavedSearchesResponse {
    pub saved_searches: Vec<SearchRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Search history
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/search-history
///
/// Oldest first. Only the most recent entries are kept, so the last
/// element is the latest search.
pub async fn handle_get_history(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<HistoryResponse>, AppError> {
    let mut history = state.ledger.history(&caller.identity).list().await?;
    history.reverse();
    Ok(Json(HistoryResponse { history }))
}

/// DELETE /api/search-history
pub async fn handle_clear_history(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SuccessResponse>, AppError> {
    state.ledger.history(&caller.identity).clear().await?;
    Ok(Json(OK))
}

// ────────────────────────────────────────────────────────────────────────────
// Favorites
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/favorites
pub async fn handle_add_favorite(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<AddFavoriteRequest>,
) -> Result<Json<AddFavoriteResponse>, AppError> {
    if !gift_exists(&state.db, request.gift_id).await? {
        return Err(AppError::NotFound(format!("Gift {} not found", request.gift_id)));
    }

    let added = state
        .ledger
        .favorites(&caller.identity)
        .add(request.gift_id)
        .await?;

    Ok(Json(AddFavoriteResponse {
        success: true,
        added,
    }))
}

/// GET /api/favorites
pub async fn handle_get_favorites(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<FavoritesResponse>, AppError> {
    let ids = state.ledger.favorites(&caller.identity).list().await?;
    let favorites = gifts_by_ids(&state.db, &ids).await?;
    Ok(Json(FavoritesResponse { favorites }))
}

/// DELETE /api/favorites/:gift_id
pub async fn handle_remove_favorite(
    State(state): State<AppState>,
    caller: Caller,
    Path(gift_id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .ledger
        .favorites(&caller.identity)
        .remove(gift_id)
        .await?;
    Ok(Json(OK))
}

/// DELETE /api/favorites
///
/// With `FAVORITES_CLEAR_SCOPE=session` only the guest bucket of the
/// request's session is emptied, whoever is signed in.
pub async fn handle_clear_favorites(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SuccessResponse>, AppError> {
    let target = match state.config.favorites_clear_scope {
        ClearScope::Identity => Some(caller.identity),
        ClearScope::Session => caller.session_id.map(Identity::Guest),
    };

    match target {
        Some(identity) => state.ledger.favorites(&identity).clear().await?,
        None => info!("Clear favorites skipped: session scope but no session header"),
    }
    Ok(Json(OK))
}

// ────────────────────────────────────────────────────────────────────────────
// Saved searches
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/saved-searches
pub async fn handle_save_search(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let filter = request.validate()?;
    state
        .ledger
        .saved_searches(&caller.identity)
        .record(filter.criteria())
        .await?;
    Ok(Json(OK))
}

/// GET /api/saved-searches
pub async fn handle_get_saved_searches(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SavedSearchesResponse>, AppError> {
    let saved_searches = state
        .ledger
        .saved_searches(&caller.identity)
        .list()
        .await?;
    Ok(Json(SavedSearchesResponse { saved_searches }))
}

/// DELETE /api/saved-searches
pub async fn handle_clear_saved_searches(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .ledger
        .saved_searches(&caller.identity)
        .clear()
        .await?;
    Ok(Json(OK))
}
