//! ShopKit shared types and functions.
//!
//! This crate is the base foundation to build things that can interact with the ShopKit engine and
//! its internal crates.
//!
//! This is meant to contain the shared types, traits and common functions that are used across the
//! internal crates.

pub mod api_url;
pub mod cart;
pub mod database;
pub mod error;
pub mod order;
pub mod payment;
pub mod product;
pub mod shop;
pub mod user;

// re-exporting external crates
pub use {parking_lot, rust_decimal};

pub use self::api_url::ApiUrl;
pub use self::cart::{CartSnapshot, LineItem};
pub use self::error::{Error, ErrorResponse};
pub use self::order::{Order, OrderItem, OrderRequest, OrderStatus, ShippingAddress};
pub use self::payment::{CardDetails, Payment, PaymentMethod, PaymentRequest, PaymentStatus};
pub use self::product::{Category, Product, ProductRequest};
pub use self::shop::{MyShopResponse, NoShopMarker, Shop, ShopRequest};
pub use self::user::{AuthResponse, LoginRequest, Session, SignupRequest, User};

/// Return early with the given error when a condition does not hold.
#[macro_export]
macro_rules! ensure_shopkit {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
