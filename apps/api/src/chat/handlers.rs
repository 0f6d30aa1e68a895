//! Axum route handlers for the assistant conversation and the suggestion
//! listing it feeds.

use std::sync::PoisonError;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai_client::QuestionsResponse;
use crate::chat::bridge::SuggestionBridge;
use crate::chat::conversation::{
    run_turn, ConversationSnapshot, Notice, TurnRejected, TurnReport,
};
use crate::chat::listing::{sort_gifts, GiftItem, SortKey};
use crate::errors::AppError;
use crate::identity::Caller;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    pub categories: usize,
    pub total_products: usize,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub items: Vec<GiftItem>,
    pub categories: Vec<String>,
    pub sort: SortKey,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub notice: Notice,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub reachable: bool,
    pub service_url: String,
}

impl From<TurnRejected> for AppError {
    fn from(rejected: TurnRejected) -> Self {
        match rejected {
            TurnRejected::Empty => AppError::fields(&[("message", "cannot be empty")]),
            TurnRejected::Busy => AppError::Conflict(rejected.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Conversation
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/chat
///
/// Runs one turn. Assistant failures are reported inside the turn (an
/// apology message plus an error notice), not as an error response.
pub async fn handle_send_message(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnReport>, AppError> {
    let conversation = state.conversations.get_or_create(&caller.session_key());
    let report = run_turn(&conversation, state.ai.as_ref(), &request.message).await?;
    Ok(Json(report))
}

/// GET /api/chat
pub async fn handle_get_conversation(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<ConversationSnapshot> {
    Json(state.conversations.snapshot(&caller.session_key()))
}

/// DELETE /api/chat
pub async fn handle_reset_conversation(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<ResetResponse> {
    let removed = state.conversations.remove(&caller.session_key());
    info!(
        "Conversation for {} reset (existed: {removed})",
        caller.session_key()
    );
    Json(ResetResponse {
        success: true,
        removed,
    })
}

/// POST /api/chat/questions
///
/// Follow-up questions for a draft message, using the conversation's
/// context. Not part of the main turn.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ChatRequest>,
) -> Result<Json<QuestionsResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(AppError::fields(&[("message", "cannot be empty")]));
    }
    let context = state
        .conversations
        .get(&caller.session_key())
        .map(|conversation| {
            conversation
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .context()
                .to_string()
        })
        .unwrap_or_default();
    let questions = state.ai.generate_questions(&request.message, &context).await?;
    Ok(Json(questions))
}

/// GET /api/assistant/health
pub async fn handle_assistant_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        reachable: state.ai.check_health().await,
        service_url: state.ai.base_url().to_string(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Suggestion listing
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/suggestions
///
/// Publishes the conversation's latest products to the suggestion slot.
pub async fn handle_publish_suggestions(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<PublishResponse>, AppError> {
    let session_key = caller.session_key();
    let products = state
        .conversations
        .get(&session_key)
        .map(|conversation| {
            conversation
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .products()
                .clone()
        })
        .unwrap_or_default();

    if products.is_empty() {
        return Err(AppError::Validation(
            "No suggestions available. Please ask for gift recommendations first!".to_string(),
        ));
    }

    SuggestionBridge::new(state.sessions.as_ref(), &session_key)
        .publish(&products)
        .await?;

    Ok(Json(PublishResponse {
        success: true,
        categories: products.len(),
        total_products: products.values().map(Vec::len).sum(),
    }))
}

/// GET /api/suggestions?sort=relevance|price-low|price-high
pub async fn handle_list_suggestions(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingResponse>, AppError> {
    let sort = match query.sort.as_deref() {
        Some(raw) => raw.parse::<SortKey>()?,
        None => SortKey::default(),
    };

    let session_key = caller.session_key();
    let bridged = SuggestionBridge::new(state.sessions.as_ref(), &session_key)
        .consume()
        .await?;

    Ok(Json(ListingResponse {
        items: sort_gifts(&bridged.items, sort),
        categories: bridged.categories,
        sort,
        published: bridged.published,
        notice: bridged.notice,
    }))
}

/// DELETE /api/suggestions
pub async fn handle_clear_suggestions(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ClearResponse>, AppError> {
    let session_key = caller.session_key();
    SuggestionBridge::new(state.sessions.as_ref(), &session_key)
        .clear()
        .await?;
    Ok(Json(ClearResponse {
        success: true,
        notice: Notice::success(
            "Suggestions cleared! Use the chat to get new recommendations.",
        ),
    }))
}
