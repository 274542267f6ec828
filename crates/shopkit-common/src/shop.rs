//! Shops

use serde::{Deserialize, Serialize};

/// Shop as served by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    /// Server assigned id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Long form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Street address
    pub address: String,
    /// Logo image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Owning user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    /// Owning user display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

/// Payload for creating or updating a shop
///
/// The owner id is filled in by the shop manager from the active session
/// before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopRequest {
    /// Display name
    pub name: String,
    /// Long form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Street address
    pub address: String,
    /// Owning user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
}

/// Marker body returned when the caller owns no shop
///
/// The API answers this at HTTP 200, so absence cannot be read off the
/// status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoShopMarker {
    /// Human readable explanation
    pub message: String,
    /// Always false
    pub shop_exists: bool,
}

/// Response of the owner scoped shop lookup
///
/// Both arms arrive with a success status; the payload shape is the only
/// discriminator, hence the untagged decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MyShopResponse {
    /// The caller owns this shop
    Shop(Box<Shop>),
    /// The caller has not created a shop yet
    Absent(NoShopMarker),
}
