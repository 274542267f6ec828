//! Products and categories

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product as served by the catalog endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Server assigned id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Long form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price
    pub price: Decimal,
    /// Primary image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Additional image URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_images: Vec<String>,
    /// Units in stock
    #[serde(default)]
    pub stock_quantity: u32,
    /// Category id, if categorized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    /// Category name, if categorized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// Whether the product is featured on the storefront
    #[serde(default)]
    pub featured: bool,
    /// Owning shop id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<i64>,
    /// Owning shop name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
}

/// Payload for creating or updating a product
///
/// Server assigned fields are absent; the shop id is filled in by the shop
/// manager before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    /// Display name
    pub name: String,
    /// Long form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price
    pub price: Decimal,
    /// Primary image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Additional image URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_images: Vec<String>,
    /// Units in stock
    #[serde(default)]
    pub stock_quantity: u32,
    /// Category id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    /// Whether to feature the product
    #[serde(default)]
    pub featured: bool,
    /// Owning shop id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<i64>,
}

/// Catalog category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Server assigned id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Long form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
