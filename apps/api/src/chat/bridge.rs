//! Suggestion bridge: hands the latest product results from the chat flow to
//! the listing view through a session slot, without another search call.

use serde::Serialize;
use tracing::{info, warn};

use crate::ai_client::ProductMap;
use crate::chat::conversation::Notice;
use crate::chat::listing::{display_category, empty_gift_items, products_to_gift_items, GiftItem};
use crate::session::{SessionError, SessionStore, SUGGESTIONS_KEY};

/// What the listing view reads back from the slot.
#[derive(Debug, Clone, Serialize)]
pub struct BridgedSuggestions {
    pub items: Vec<GiftItem>,
    pub categories: Vec<String>,
    /// `false` when the sentinel placeholder is returned.
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

pub struct SuggestionBridge<'a> {
    store: &'a dyn SessionStore,
    session_id: &'a str,
}

impl<'a> SuggestionBridge<'a> {
    pub fn new(store: &'a dyn SessionStore, session_id: &'a str) -> Self {
        Self { store, session_id }
    }

    /// Overwrites the slot with the full product map. No merge.
    pub async fn publish(&self, products: &ProductMap) -> Result<(), SessionError> {
        let raw = serde_json::to_string(products)?;
        self.store.set(self.session_id, SUGGESTIONS_KEY, raw).await?;
        info!(
            "Published {} categories to suggestion slot for session {}",
            products.len(),
            self.session_id
        );
        Ok(())
    }

    /// Reads the slot. A missing or unreadable value yields the placeholder
    /// set; only store failures are errors.
    pub async fn consume(&self) -> Result<BridgedSuggestions, SessionError> {
        let Some(raw) = self.store.get(self.session_id, SUGGESTIONS_KEY).await? else {
            return Ok(placeholder(None));
        };

        match serde_json::from_str::<ProductMap>(&raw) {
            Ok(products) => {
                let items = products_to_gift_items(&products);
                let notice = Notice::success(format!("Loaded {} gift suggestions!", items.len()));
                Ok(BridgedSuggestions {
                    categories: products.keys().map(|c| display_category(c)).collect(),
                    items,
                    published: true,
                    notice: Some(notice),
                })
            }
            Err(e) => {
                warn!(
                    "Suggestion slot for session {} is unreadable: {e}",
                    self.session_id
                );
                Ok(placeholder(Some(Notice::error(
                    "Failed to load gift suggestions",
                ))))
            }
        }
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        self.store.remove(self.session_id, SUGGESTIONS_KEY).await
    }
}

fn placeholder(notice: Option<Notice>) -> BridgedSuggestions {
    BridgedSuggestions {
        items: empty_gift_items(),
        categories: Vec::new(),
        published: false,
        notice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::Product;
    use crate::chat::conversation::NoticeLevel;
    use crate::chat::listing::EMPTY_ITEM_ID;
    use crate::session::MemorySessionStore;

    fn sample_products() -> ProductMap {
        let product = |name: &str| Product {
            name: name.to_string(),
            price: "$10".to_string(),
            url: "https://shop".to_string(),
            source: "Amazon".to_string(),
            ..Default::default()
        };
        let mut products = ProductMap::new();
        products.insert("books".into(), vec![product("Novel"), product("Atlas")]);
        products.insert("board_games".into(), vec![product("Chess")]);
        products
    }

    #[tokio::test]
    async fn test_publish_then_consume_keeps_every_product() {
        let store = MemorySessionStore::new();
        let bridge = SuggestionBridge::new(&store, "s1");
        let products = sample_products();

        bridge.publish(&products).await.unwrap();
        let consumed = bridge.consume().await.unwrap();

        let total: usize = products.values().map(Vec::len).sum();
        assert_eq!(consumed.items.len(), total);
        assert!(consumed.published);
        assert_eq!(consumed.categories, vec!["books", "board games"]);
    }

    #[tokio::test]
    async fn test_consume_without_publish_is_placeholder() {
        let store = MemorySessionStore::new();
        let consumed = SuggestionBridge::new(&store, "s1").consume().await.unwrap();
        assert!(!consumed.published);
        assert_eq!(consumed.items.len(), 1);
        assert_eq!(consumed.items[0].id, EMPTY_ITEM_ID);
        assert!(consumed.notice.is_none());
    }

    #[tokio::test]
    async fn test_consume_corrupt_slot_is_placeholder_with_notice() {
        let store = MemorySessionStore::new();
        store
            .set("s1", SUGGESTIONS_KEY, "[broken".to_string())
            .await
            .unwrap();
        let consumed = SuggestionBridge::new(&store, "s1").consume().await.unwrap();
        assert!(!consumed.published);
        assert_eq!(consumed.notice.map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_publish_overwrites_previous_value() {
        let store = MemorySessionStore::new();
        let bridge = SuggestionBridge::new(&store, "s1");
        bridge.publish(&sample_products()).await.unwrap();

        let mut smaller = ProductMap::new();
        smaller.insert("books".into(), sample_products()["books"][..1].to_vec());
        bridge.publish(&smaller).await.unwrap();

        assert_eq!(bridge.consume().await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_slot() {
        let store = MemorySessionStore::new();
        let bridge = SuggestionBridge::new(&store, "s1");
        bridge.publish(&sample_products()).await.unwrap();
        bridge.clear().await.unwrap();
        assert!(!bridge.consume().await.unwrap().published);
    }
}
