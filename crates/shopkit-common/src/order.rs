//! Orders

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::LineItem;
use crate::ensure_shopkit;
use crate::error::Error as CommonError;

/// Order errors
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown order status
    #[error("Unknown order status")]
    UnknownStatus,
}

/// Order lifecycle status as reported by the API
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created, payment outstanding
    #[default]
    Pending,
    /// Paid, being prepared
    Processing,
    /// Handed to the carrier
    Shipped,
    /// Delivered to the buyer
    Delivered,
    /// Cancelled before fulfilment
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        match status {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(Error::UnknownStatus),
        }
    }
}

/// Shipping address captured during checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Recipient full name
    pub full_name: String,
    /// Street address
    pub address_line1: String,
    /// Apartment, suite, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Country
    pub country: String,
    /// Contact phone number
    pub phone_number: String,
}

impl ShippingAddress {
    /// Check that every required field is non empty.
    ///
    /// Presence only; no postal or phone format rules are applied.
    pub fn validate(&self) -> Result<(), CommonError> {
        ensure_shopkit!(
            !self.full_name.trim().is_empty(),
            CommonError::MissingField("fullName")
        );
        ensure_shopkit!(
            !self.address_line1.trim().is_empty(),
            CommonError::MissingField("addressLine1")
        );
        ensure_shopkit!(
            !self.city.trim().is_empty(),
            CommonError::MissingField("city")
        );
        ensure_shopkit!(
            !self.state.trim().is_empty(),
            CommonError::MissingField("state")
        );
        ensure_shopkit!(
            !self.postal_code.trim().is_empty(),
            CommonError::MissingField("postalCode")
        );
        ensure_shopkit!(
            !self.country.trim().is_empty(),
            CommonError::MissingField("country")
        );
        ensure_shopkit!(
            !self.phone_number.trim().is_empty(),
            CommonError::MissingField("phoneNumber")
        );
        Ok(())
    }
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product id
    pub product_id: i64,
    /// Product name at time of order
    pub product_name: String,
    /// Unit price at time of order
    pub price: Decimal,
    /// Units ordered
    pub quantity: u32,
    /// Product image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&LineItem> for OrderItem {
    fn from(item: &LineItem) -> Self {
        OrderItem {
            product_id: item.product_id,
            product_name: item.name.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            image_url: item.image_ref.clone(),
        }
    }
}

/// Payload for creating an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Lines to order
    pub items: Vec<OrderItem>,
    /// Where to ship
    pub shipping_address: ShippingAddress,
}

/// Order as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Server assigned id
    pub id: i64,
    /// Human readable order number
    pub order_number: String,
    /// Buying user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Ordered lines
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Charged amount including tax
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    /// Shipping destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    /// Creation timestamp, as formatted by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Fox".to_string(),
            address_line1: "12 Mill Lane".to_string(),
            address_line2: None,
            city: "Sheffield".to_string(),
            state: "South Yorkshire".to_string(),
            postal_code: "S1 2BJ".to_string(),
            country: "United Kingdom".to_string(),
            phone_number: "0114 555 0199".to_string(),
        }
    }

    #[test]
    fn address_validation_requires_each_field() {
        assert!(address().validate().is_ok());

        let mut missing_city = address();
        missing_city.city = "  ".to_string();
        assert!(matches!(
            missing_city.validate(),
            Err(CommonError::MissingField("city"))
        ));

        let mut missing_phone = address();
        missing_phone.phone_number = String::new();
        assert!(matches!(
            missing_phone.validate(),
            Err(CommonError::MissingField("phoneNumber"))
        ));

        // Second address line stays optional
        let mut no_line2 = address();
        no_line2.address_line2 = None;
        assert!(no_line2.validate().is_ok());
    }

    #[test]
    fn order_status_round_trips_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert_eq!(
            serde_json::from_str::<OrderStatus>("\"CANCELLED\"").unwrap(),
            OrderStatus::Cancelled
        );
        assert_eq!(OrderStatus::from_str("SHIPPED").unwrap(), OrderStatus::Shipped);
        assert!(OrderStatus::from_str("shipped").is_err());
    }

    #[test]
    fn order_request_serializes_camel_case() {
        let request = OrderRequest {
            items: vec![OrderItem {
                product_id: 7,
                product_name: "Walnut board".to_string(),
                price: Decimal::new(4950, 2),
                quantity: 2,
                image_url: None,
            }],
            shipping_address: address(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["items"][0]["productId"], 7);
        assert_eq!(value["items"][0]["productName"], "Walnut board");
        assert_eq!(value["shippingAddress"]["addressLine1"], "12 Mill Lane");
        assert_eq!(value["shippingAddress"]["postalCode"], "S1 2BJ");
    }
}
