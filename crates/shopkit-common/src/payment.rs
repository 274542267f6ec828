//! Payments

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payment errors
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown payment status
    #[error("Unknown payment status")]
    UnknownStatus,
}

/// Payment method selected at checkout
///
/// The API also knows `DEBIT_CARD`; this client never produces it but must
/// still decode it off the wire.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Credit card, details collected client side
    CreditCard,
    /// Debit card
    DebitCard,
    /// PayPal account
    Paypal,
    /// Manual bank transfer
    BankTransfer,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::CreditCard => write!(f, "CREDIT_CARD"),
            Self::DebitCard => write!(f, "DEBIT_CARD"),
            Self::Paypal => write!(f, "PAYPAL"),
            Self::BankTransfer => write!(f, "BANK_TRANSFER"),
        }
    }
}

/// Payment lifecycle status as reported by the API
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Submitted, not yet settled
    #[default]
    Pending,
    /// Settled successfully
    Completed,
    /// Settlement failed
    Failed,
    /// Settled then returned
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        match status {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            _ => Err(Error::UnknownStatus),
        }
    }
}

/// Card fields collected for card payments
///
/// Presence is validated client side; no checksum or expiry arithmetic is
/// attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    /// Card number
    pub card_number: String,
    /// Name on the card
    pub card_holder_name: String,
    /// Two digit expiry month
    pub expiry_month: String,
    /// Four digit expiry year
    pub expiry_year: String,
    /// Card verification value
    pub cvv: String,
}

/// Payload for submitting a payment against an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Order being paid
    pub order_id: i64,
    /// Amount including tax
    pub amount: Decimal,
    /// Selected method
    pub payment_method: PaymentMethod,
    /// Card fields, only for card methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_details: Option<CardDetails>,
}

/// Payment as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Server assigned id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Order the payment belongs to
    pub order_id: i64,
    /// Order number, when the server includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Charged amount
    pub amount: Decimal,
    /// Method used
    pub payment_method: PaymentMethod,
    /// Settlement status
    pub status: PaymentStatus,
    /// Processor transaction reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Settlement timestamp, as formatted by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<String>,
}
