//! AI Client: the only module that talks to the external gift assistant
//! service (intent extraction, follow-up questions, product search).
//!
//! Calls are single request/response pairs. There is no retry, backoff or
//! caching; a failed call is reported to the caller once and the user retries.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Category name -> free-text search keyword, as produced by the assistant.
/// Keeps the service's category order.
pub type RecommendationMap = IndexMap<String, String>;

/// Category name -> products found for that category's keyword.
pub type ProductMap = IndexMap<String, Vec<Product>>;

#[derive(Debug, Error)]
pub enum AiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned status {status}")]
    Status { status: u16 },

    #[error("Malformed response body: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    context: &'a str,
    preferences: Value,
}

#[derive(Debug, Serialize)]
struct SearchProductsRequest<'a> {
    recommendations: &'a RecommendationMap,
}

#[derive(Debug, Serialize)]
struct QuestionsRequest<'a> {
    message: &'a str,
    context: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub recommendations: RecommendationMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSearchResponse {
    #[serde(default)]
    pub products: ProductMap,
    #[serde(default)]
    pub total_products: u32,
    #[serde(default)]
    pub total_categories: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionsResponse {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub count: u32,
}

/// A product as returned by the search endpoint. `price` is a display
/// string such as `"$25.99"`; see [`crate::chat::listing::parse_price`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<String>,
}

/// The recommendation contract. `AppState` carries an `Arc<dyn RecommendationApi>`
/// so the conversation flow can run against a stand-in service in tests.
#[async_trait]
pub trait RecommendationApi: Send + Sync {
    /// Base URL of the service, used in user-facing failure messages.
    fn base_url(&self) -> &str;

    async fn send_chat_message(
        &self,
        message: &str,
        context: &str,
    ) -> Result<ChatResponse, AiClientError>;

    async fn search_products(
        &self,
        recommendations: &RecommendationMap,
    ) -> Result<ProductSearchResponse, AiClientError>;

    async fn generate_questions(
        &self,
        message: &str,
        context: &str,
    ) -> Result<QuestionsResponse, AiClientError>;

    /// `true` only for a 200 from `/health`.
    async fn check_health(&self) -> bool;
}

/// HTTP implementation of [`RecommendationApi`].
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
}

impl AiClient {
    /// `base_url` includes the `/api` prefix. `timeout` of `None` leaves
    /// outbound calls without a client-side deadline.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, AiClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("AI service {url} returned {status}: {body}");
            return Err(AiClientError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed = serde_json::from_str(&text)?;
        debug!("AI service call to {url} succeeded ({} bytes)", text.len());
        Ok(parsed)
    }
}

#[async_trait]
impl RecommendationApi for AiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_chat_message(
        &self,
        message: &str,
        context: &str,
    ) -> Result<ChatResponse, AiClientError> {
        let request = ChatRequest {
            message,
            context,
            preferences: Value::Object(Default::default()),
        };
        self.post_json("chat", &request).await
    }

    async fn search_products(
        &self,
        recommendations: &RecommendationMap,
    ) -> Result<ProductSearchResponse, AiClientError> {
        self.post_json("search-products", &SearchProductsRequest { recommendations })
            .await
    }

    async fn generate_questions(
        &self,
        message: &str,
        context: &str,
    ) -> Result<QuestionsResponse, AiClientError> {
        self.post_json("generate-questions", &QuestionsRequest { message, context })
            .await
    }

    async fn check_health(&self) -> bool {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                warn!("AI service health check failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = AiClient::new("http://localhost:5001/api/", None).unwrap();
        assert_eq!(client.endpoint("chat"), "http://localhost:5001/api/chat");
        assert_eq!(
            client.endpoint("/search-products"),
            "http://localhost:5001/api/search-products"
        );
    }

    #[test]
    fn test_chat_response_defaults_missing_fields() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(parsed.success);
        assert!(parsed.response.is_empty());
        assert!(parsed.questions.is_empty());
        assert!(parsed.recommendations.is_empty());
    }

    #[test]
    fn test_product_search_response_parses() {
        let body = r#"{
            "products": {
                "electronics": [
                    {"name": "Headphones", "price": "$59.99", "url": "https://shop/1", "source": "Daraz", "rating": 4.5},
                    {"name": "Speaker", "price": "$1,299.00", "url": "https://shop/2", "source": "Amazon"}
                ]
            },
            "total_products": 2,
            "total_categories": 1
        }"#;
        let parsed: ProductSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total_products, 2);
        let electronics = &parsed.products["electronics"];
        assert_eq!(electronics.len(), 2);
        assert_eq!(electronics[0].rating, Some(4.5));
        assert!(electronics[1].image.is_none());
    }

    #[test]
    fn test_chat_request_sends_empty_preferences() {
        let request = ChatRequest {
            message: "hi",
            context: "",
            preferences: Value::Object(Default::default()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["preferences"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unhealthy() {
        let client = AiClient::new("http://127.0.0.1:1/api", Some(Duration::from_secs(2))).unwrap();
        assert!(!client.check_health().await);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client = AiClient::new("http://127.0.0.1:1/api", Some(Duration::from_secs(2))).unwrap();
        let err = client.send_chat_message("hello", "").await.unwrap_err();
        assert!(matches!(err, AiClientError::Http(_)), "{err}");
    }
}
