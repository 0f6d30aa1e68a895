//! Gift listing: derives display items from product maps and orders them.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ai_client::ProductMap;
use crate::errors::AppError;

const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x400?text=No+Image";
const EMPTY_IMAGE: &str = "https://via.placeholder.com/400x400?text=Ask+for+Suggestions";
pub const EMPTY_ITEM_ID: &str = "default-1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "relevance")]
    Relevance,
    #[serde(rename = "price-low")]
    PriceLow,
    #[serde(rename = "price-high")]
    PriceHigh,
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(SortKey::Relevance),
            "price-low" => Ok(SortKey::PriceLow),
            "price-high" => Ok(SortKey::PriceHigh),
            other => Err(AppError::Validation(format!(
                "sort must be one of relevance, price-low, price-high (got '{other}')"
            ))),
        }
    }
}

fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\d,]+\.?\d*").expect("price pattern is valid"))
}

/// Best-effort numeric price from a display string like `"$1,299.00"`.
/// Takes the first digit run, drops commas, and yields `0.0` when nothing parses.
pub fn parse_price(display: &str) -> f64 {
    price_pattern()
        .find(display)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// `"home_decor"` -> `"home decor"`.
pub fn display_category(category: &str) -> String {
    category.replace('_', " ")
}

/// Flattens a product map into gift items. Ids are `"1"`, `"2"`, ... in
/// category order and are only unique within this one call.
pub fn products_to_gift_items(products: &ProductMap) -> Vec<GiftItem> {
    products
        .iter()
        .flat_map(|(category, list)| list.iter().map(move |product| (category, product)))
        .enumerate()
        .map(|(index, (category, product))| GiftItem {
            id: (index + 1).to_string(),
            name: product.name.clone(),
            price: parse_price(&product.price),
            image: product
                .image
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            url: product.url.clone(),
            description: Some(format!(
                "{} from {}",
                display_category(category),
                product.source
            )),
        })
        .collect()
}

/// Placeholder shown when nothing has been published yet.
pub fn empty_gift_items() -> Vec<GiftItem> {
    vec![GiftItem {
        id: EMPTY_ITEM_ID.to_string(),
        name: "No suggestions yet".to_string(),
        price: 0.0,
        image: EMPTY_IMAGE.to_string(),
        url: "#".to_string(),
        description: Some("Use the chat to get personalized gift recommendations!".to_string()),
    }]
}

/// Returns the items ordered by `key`. Both price orders are stable, so
/// equal prices keep their relevance order.
pub fn sort_gifts(items: &[GiftItem], key: SortKey) -> Vec<GiftItem> {
    let mut sorted = items.to_vec();
    match key {
        SortKey::Relevance => {}
        SortKey::PriceLow => sorted.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortKey::PriceHigh => sorted.sort_by(|a, b| b.price.total_cmp(&a.price)),
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::Product;

    fn item(id: &str, price: f64) -> GiftItem {
        GiftItem {
            id: id.to_string(),
            name: format!("gift {id}"),
            price,
            image: String::new(),
            url: "#".to_string(),
            description: None,
        }
    }

    fn product(name: &str, price: &str, source: &str) -> Product {
        Product {
            name: name.to_string(),
            price: price.to_string(),
            url: format!("https://shop/{name}"),
            source: source.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_price_plain() {
        assert_eq!(parse_price("$25.99"), 25.99);
    }

    #[test]
    fn test_parse_price_strips_every_comma() {
        assert_eq!(parse_price("$1,299.50"), 1299.5);
        assert_eq!(parse_price("৳ 1,234,567"), 1_234_567.0);
    }

    #[test]
    fn test_parse_price_takes_first_match() {
        assert_eq!(parse_price("From $19 to $29"), 19.0);
    }

    #[test]
    fn test_parse_price_without_digits_is_zero() {
        assert_eq!(parse_price("Price unavailable"), 0.0);
        assert_eq!(parse_price(""), 0.0);
    }

    #[test]
    fn test_parse_price_lone_comma_is_zero() {
        assert_eq!(parse_price("a, b"), 0.0);
    }

    #[test]
    fn test_relevance_keeps_input_order() {
        let items = vec![item("a", 30.0), item("b", 10.0), item("c", 20.0)];
        assert_eq!(sort_gifts(&items, SortKey::Relevance), items);
    }

    #[test]
    fn test_price_orders_are_reverses_without_ties() {
        let items = vec![item("a", 30.0), item("b", 10.0), item("c", 20.0)];
        let low: Vec<_> = sort_gifts(&items, SortKey::PriceLow)
            .into_iter()
            .map(|g| g.id)
            .collect();
        let mut high: Vec<_> = sort_gifts(&items, SortKey::PriceHigh)
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(low, vec!["b", "c", "a"]);
        high.reverse();
        assert_eq!(low, high);
    }

    #[test]
    fn test_price_sort_is_stable_on_ties() {
        let items = vec![item("a", 10.0), item("b", 5.0), item("c", 10.0)];
        let ids: Vec<_> = sort_gifts(&items, SortKey::PriceHigh)
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("price-low".parse::<SortKey>().unwrap(), SortKey::PriceLow);
        assert!("cheapest".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_products_to_gift_items_numbers_across_categories() {
        let mut products = ProductMap::new();
        products.insert(
            "home_decor".to_string(),
            vec![product("Lamp", "$40.00", "Daraz")],
        );
        products.insert(
            "electronics".to_string(),
            vec![
                product("Headphones", "$59.99", "Amazon"),
                product("Speaker", "N/A", "Amazon"),
            ],
        );

        let items = products_to_gift_items(&products);
        assert_eq!(items.len(), 3);
        let ids: Vec<_> = items.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        // Categories keep the order the service sent them in.
        assert_eq!(items[0].name, "Lamp");
        assert_eq!(items[0].description.as_deref(), Some("home decor from Daraz"));
        assert_eq!(items[0].image, PLACEHOLDER_IMAGE);
        assert_eq!(items[1].name, "Headphones");
        assert_eq!(items[2].price, 0.0);
    }

    #[test]
    fn test_relevance_follows_service_category_order() {
        let products: ProductMap = serde_json::from_str(
            r#"{
                "watches": [{"name": "Watch", "price": "$90", "url": "u", "source": "Amazon"}],
                "books": [{"name": "Novel", "price": "$10", "url": "u", "source": "Amazon"}]
            }"#,
        )
        .unwrap();
        let names: Vec<_> = sort_gifts(&products_to_gift_items(&products), SortKey::Relevance)
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Watch", "Novel"]);
    }

    #[test]
    fn test_empty_gift_items_is_single_sentinel() {
        let items = empty_gift_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, EMPTY_ITEM_ID);
        assert_eq!(items[0].price, 0.0);
    }
}
