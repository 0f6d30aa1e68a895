pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::gifts::handlers as gifts;
use crate::ledger::handlers as ledger;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Catalog search
        .route("/api/gift-suggestions", post(gifts::handle_gift_suggestions))
        // Ledger
        .route(
            "/api/search-history",
            get(ledger::handle_get_history).delete(ledger::handle_clear_history),
        )
        .route(
            "/api/favorites",
            get(ledger::handle_get_favorites)
                .post(ledger::handle_add_favorite)
                .delete(ledger::handle_clear_favorites),
        )
        .route(
            "/api/favorites/:gift_id",
            delete(ledger::handle_remove_favorite),
        )
        .route(
            "/api/saved-searches",
            get(ledger::handle_get_saved_searches)
                .post(ledger::handle_save_search)
                .delete(ledger::handle_clear_saved_searches),
        )
        // Assistant conversation
        .route(
            "/api/chat",
            get(chat::handle_get_conversation)
                .post(chat::handle_send_message)
                .delete(chat::handle_reset_conversation),
        )
        .route("/api/chat/questions", post(chat::handle_generate_questions))
        .route(
            "/api/suggestions",
            get(chat::handle_list_suggestions)
                .post(chat::handle_publish_suggestions)
                .delete(chat::handle_clear_suggestions),
        )
        .route(
            "/api/assistant/health",
            get(chat::handle_assistant_health),
        )
        .with_state(state)
}
