// Assistant conversation flow: chat turns, the suggestion bridge slot, and
// the gift listing derived from it. All assistant calls go through ai_client.

pub mod bridge;
pub mod conversation;
pub mod handlers;
pub mod listing;
