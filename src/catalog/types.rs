//! Normalized product records.
//!
//! Upstream catalog records carry many more fields than the pipeline needs;
//! only the fixed subset below is retained. Absent or wrong-typed fields
//! degrade to documented sentinels instead of failing the turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel for absent text fields.
const UNKNOWN: &str = "Unknown";

/// A normalized product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Option<i64>,
    pub title: String,
    pub brand: String,
    pub price: Option<f64>,
    /// 0–5 star rating when present.
    pub rating: Option<f64>,
    pub category: String,
    pub description: String,
    pub availability_status: String,
    pub discount_percentage: f64,
    pub stock: Option<i64>,
}

impl Product {
    /// Normalize a raw record field by field.
    ///
    /// Deliberately not a serde deserialization: records echoed back through
    /// a model may carry wrong-typed fields, and one bad field must not drop
    /// the whole product.
    pub fn from_value(raw: &Value) -> Self {
        Self {
            id: raw.get("id").and_then(Value::as_i64),
            title: str_field(raw, "title"),
            brand: str_field(raw, "brand"),
            price: num_field(raw, "price"),
            rating: num_field(raw, "rating"),
            category: raw
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: raw
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            availability_status: raw
                .get("availabilityStatus")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            discount_percentage: num_field(raw, "discountPercentage").unwrap_or(0.0),
            stock: raw.get("stock").and_then(Value::as_i64),
        }
    }

    /// Price for display; `N/A` when the catalog did not report one.
    pub fn price_label(&self) -> String {
        match self.price {
            Some(p) => format!("{:.2}", p),
            None => "N/A".to_string(),
        }
    }

    /// Rating for display; `N/A` when the catalog did not report one.
    pub fn rating_label(&self) -> String {
        match self.rating {
            Some(r) => format!("{:.1}", r),
            None => "N/A".to_string(),
        }
    }
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Numbers sometimes arrive as strings after a round-trip through a model;
/// accept both encodings.
fn num_field(raw: &Value, key: &str) -> Option<f64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// One search round-trip's worth of candidates.
///
/// Constructed once per user turn by the search stage and consumed by the
/// analysis stage; product order is the catalog's relevance order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub products: Vec<Product>,
    /// Advertised total matches; at least the length of any single page.
    pub total: u64,
    /// The keyword actually used against the catalog.
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full_record() {
        let raw = json!({
            "id": 11,
            "title": "Annibale Colombo Bed",
            "brand": "Annibale Colombo",
            "price": 1899.99,
            "rating": 4.77,
            "category": "furniture",
            "description": "Luxurious bed.",
            "availabilityStatus": "In Stock",
            "discountPercentage": 8.1,
            "stock": 88,
            "sku": "dropped-upstream-field"
        });
        let p = Product::from_value(&raw);
        assert_eq!(p.id, Some(11));
        assert_eq!(p.title, "Annibale Colombo Bed");
        assert_eq!(p.price, Some(1899.99));
        assert_eq!(p.rating, Some(4.77));
        assert_eq!(p.availability_status, "In Stock");
        assert_eq!(p.discount_percentage, 8.1);
        assert_eq!(p.stock, Some(88));
    }

    #[test]
    fn test_from_value_missing_fields_degrade_to_sentinels() {
        let p = Product::from_value(&json!({}));
        assert_eq!(p.id, None);
        assert_eq!(p.title, "Unknown");
        assert_eq!(p.brand, "Unknown");
        assert_eq!(p.price, None);
        assert_eq!(p.rating, None);
        assert_eq!(p.category, "");
        assert_eq!(p.discount_percentage, 0.0);
        assert_eq!(p.price_label(), "N/A");
        assert_eq!(p.rating_label(), "N/A");
    }

    #[test]
    fn test_from_value_wrong_types_do_not_fail() {
        let raw = json!({
            "id": "eleven",
            "title": 42,
            "price": "199.99",
            "rating": {"stars": 4}
        });
        let p = Product::from_value(&raw);
        assert_eq!(p.id, None);
        assert_eq!(p.title, "Unknown");
        // String-encoded numbers are accepted.
        assert_eq!(p.price, Some(199.99));
        assert_eq!(p.rating, None);
    }

    #[test]
    fn test_from_value_blank_title_is_unknown() {
        let p = Product::from_value(&json!({"title": "   "}));
        assert_eq!(p.title, "Unknown");
    }

    #[test]
    fn test_labels_format() {
        let p = Product::from_value(&json!({"price": 199.9, "rating": 4.25}));
        assert_eq!(p.price_label(), "199.90");
        assert_eq!(p.rating_label(), "4.2");
    }
}
