//! Cart line items and snapshots

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::Product;

/// One product line in the cart
///
/// Identity is the product id: a cart never holds two lines for the same
/// product. The price is the unit price captured when the product was
/// added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product id
    pub product_id: i64,
    /// Product name
    pub name: String,
    /// Unit price
    pub unit_price: Decimal,
    /// Units in the cart, always at least one
    pub quantity: u32,
    /// Product image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    /// Category name for display grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_label: Option<String>,
}

impl LineItem {
    /// Build a line from a product and quantity
    pub fn new(product: &Product, quantity: u32) -> Self {
        LineItem {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            image_ref: product.image_url.clone(),
            category_label: product.category_name.clone(),
        }
    }

    /// Price of this line: unit price times quantity
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Immutable view of the cart with derived totals
///
/// Totals are always computed from the items; there is no write path that
/// stores them independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Lines, in insertion order
    pub items: Vec<LineItem>,
    /// Sum of all quantities
    pub total_items: u64,
    /// Sum of all line totals
    pub total_price: Decimal,
}

impl CartSnapshot {
    /// Compute a snapshot from raw items
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let total_items = items.iter().map(|item| u64::from(item.quantity)).sum();
        let total_price = items.iter().map(LineItem::line_total).sum();
        CartSnapshot {
            items,
            total_items,
            total_price,
        }
    }

    /// Whether the cart holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
