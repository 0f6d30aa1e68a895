//! Conversation state holder.
//!
//! A conversation is an append-only message log plus the running context
//! string sent back to the assistant on every turn. A turn runs in two
//! suspension steps (chat, then optionally product search); the state is
//! locked only between steps, never across a service call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::ai_client::{
    AiClientError, ChatResponse, ProductMap, ProductSearchResponse, RecommendationApi,
    RecommendationMap,
};

pub const GREETING: &str =
    "Hi! I'm here to help you find the perfect gift. Tell me about the person you're shopping for!";
const FALLBACK_REPLY: &str = "I've generated some gift recommendations for you!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<RecommendationMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<ProductMap>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            questions: None,
            recommendations: None,
            products: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient, user-visible status line (toast).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnRejected {
    #[error("message cannot be empty")]
    Empty,
    #[error("a previous message is still being processed")]
    Busy,
}

/// Result of the chat step: notices to surface, and the recommendation map
/// to search with when the assistant produced one.
#[derive(Debug, Default)]
pub struct ChatStep {
    pub notices: Vec<Notice>,
    pub search: Option<RecommendationMap>,
}

/// Everything one turn changed, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub messages: Vec<Message>,
    pub notices: Vec<Notice>,
    pub searched_products: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub is_searching_products: bool,
    pub has_recommendations: bool,
}

#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    context: String,
    products: ProductMap,
    is_loading: bool,
    is_searching_products: bool,
    service_url: String,
}

impl Conversation {
    /// `service_url` is named in the apology shown when the assistant is down.
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::new(Role::Assistant, GREETING)],
            context: String::new(),
            products: ProductMap::new(),
            is_loading: false,
            is_searching_products: false,
            service_url: service_url.into(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Latest non-empty product map found in this conversation.
    pub fn products(&self) -> &ProductMap {
        &self.products
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_searching_products
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            is_loading: self.is_loading,
            is_searching_products: self.is_searching_products,
            has_recommendations: !self.products.is_empty(),
        }
    }

    /// Appends the user's message and marks the conversation loading.
    /// Returns the context to send with the chat call.
    pub fn begin_turn(&mut self, input: &str) -> Result<String, TurnRejected> {
        if input.trim().is_empty() {
            return Err(TurnRejected::Empty);
        }
        if self.is_busy() {
            return Err(TurnRejected::Busy);
        }
        self.messages.push(Message::new(Role::User, input));
        self.is_loading = true;
        Ok(self.context.clone())
    }

    pub fn finish_chat(
        &mut self,
        input: &str,
        result: Result<ChatResponse, AiClientError>,
    ) -> ChatStep {
        self.is_loading = false;

        let response = match result {
            Ok(response) if response.success => response,
            Ok(_) => {
                warn!("AI service answered without success");
                return self.chat_failed();
            }
            Err(e) => {
                error!("Chat error: {e}");
                return self.chat_failed();
            }
        };

        let content = if response.response.is_empty() {
            FALLBACK_REPLY.to_string()
        } else {
            response.response.clone()
        };
        self.messages.push(Message {
            questions: Some(response.questions),
            recommendations: Some(response.recommendations.clone()),
            ..Message::new(Role::Assistant, content)
        });

        self.context.push_str("\nUser: ");
        self.context.push_str(input);
        self.context.push_str("\nAssistant: ");
        self.context.push_str(&response.response);

        if response.recommendations.is_empty() {
            return ChatStep::default();
        }
        self.is_searching_products = true;
        ChatStep {
            notices: Vec::new(),
            search: Some(response.recommendations),
        }
    }

    fn chat_failed(&mut self) -> ChatStep {
        self.messages.push(Message::new(
            Role::Assistant,
            format!(
                "Sorry, I'm having trouble connecting to the AI service. \
                 Please make sure the assistant service is running at {}.",
                self.service_url
            ),
        ));
        ChatStep {
            notices: vec![Notice::error(
                "Failed to get response. Please make sure the AI server is running.",
            )],
            search: None,
        }
    }

    pub fn finish_product_search(
        &mut self,
        result: Result<ProductSearchResponse, AiClientError>,
    ) -> Vec<Notice> {
        self.is_searching_products = false;

        match result {
            Ok(found) if !found.products.is_empty() => {
                self.products = found.products.clone();
                self.messages.push(Message {
                    products: Some(found.products),
                    ..Message::new(
                        Role::Assistant,
                        format!(
                            "I found {} products across {} categories!",
                            found.total_products, found.total_categories
                        ),
                    )
                });
                vec![Notice::success(format!(
                    "Found {} gift suggestions!",
                    found.total_products
                ))]
            }
            Ok(_) => vec![Notice::error("No products found for the recommendations.")],
            Err(e) => {
                error!("Product search error: {e}");
                vec![Notice::error("Failed to search for products.")]
            }
        }
    }
}

fn lock(conversation: &Mutex<Conversation>) -> std::sync::MutexGuard<'_, Conversation> {
    conversation.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one full turn: chat call, then product search when the assistant
/// returned recommendations.
pub async fn run_turn(
    conversation: &Mutex<Conversation>,
    api: &dyn RecommendationApi,
    input: &str,
) -> Result<TurnReport, TurnRejected> {
    let (context, first_new) = {
        let mut state = lock(conversation);
        let first_new = state.messages.len();
        (state.begin_turn(input)?, first_new)
    };

    let chat_result = api.send_chat_message(input, &context).await;
    let step = lock(conversation).finish_chat(input, chat_result);

    let mut notices = step.notices;
    let searched_products = step.search.is_some();
    if let Some(recommendations) = step.search {
        info!(
            "Searching products for {} recommended categories",
            recommendations.len()
        );
        let search_result = api.search_products(&recommendations).await;
        notices.extend(lock(conversation).finish_product_search(search_result));
    }

    let state = lock(conversation);
    Ok(TurnReport {
        messages: state.messages[first_new..].to_vec(),
        notices,
        searched_products,
    })
}

struct Entry {
    conversation: Arc<Mutex<Conversation>>,
    last_seen: Instant,
}

/// Live conversations keyed by session id. Entries idle for longer than
/// `idle_ttl` are swept on the next access unless a request still holds them.
pub struct ConversationRegistry {
    conversations: Mutex<HashMap<String, Entry>>,
    service_url: String,
    idle_ttl: Duration,
}

impl ConversationRegistry {
    pub fn new(service_url: impl Into<String>, idle_ttl: Duration) -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            service_url: service_url.into(),
            idle_ttl,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        let mut conversations = self
            .conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let before = conversations.len();
        conversations.retain(|_, entry| {
            Arc::strong_count(&entry.conversation) > 1
                || now.duration_since(entry.last_seen) < self.idle_ttl
        });
        let swept = before - conversations.len();
        if swept > 0 {
            debug!("Swept {swept} idle conversations");
        }
        conversations
    }

    /// Existing conversation for the session, if any. Never creates one.
    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<Conversation>>> {
        let mut conversations = self.entries();
        let entry = conversations.get_mut(session_id)?;
        entry.last_seen = Instant::now();
        Some(entry.conversation.clone())
    }

    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Conversation>> {
        let mut conversations = self.entries();
        let entry = conversations
            .entry(session_id.to_string())
            .or_insert_with(|| Entry {
                conversation: Arc::new(Mutex::new(Conversation::new(self.service_url.clone()))),
                last_seen: Instant::now(),
            });
        entry.last_seen = Instant::now();
        entry.conversation.clone()
    }

    /// Snapshot of the session's conversation, or of a fresh one when none
    /// is live. The fresh one is not stored.
    pub fn snapshot(&self, session_id: &str) -> ConversationSnapshot {
        match self.get(session_id) {
            Some(conversation) => lock(&conversation).snapshot(),
            None => Conversation::new(self.service_url.clone()).snapshot(),
        }
    }

    /// Drops the conversation; a pending turn finishes against the detached copy.
    pub fn remove(&self, session_id: &str) -> bool {
        self.entries().remove(session_id).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries().len()
    }
}
