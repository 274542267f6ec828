//! Client-side engine for the ShopKit commerce platform
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod database {
    //! Client storage
    pub use shopkit_common::database::{ClientStorage, Error, MemoryStorage};
}

pub mod builder;
pub mod cart;
pub mod checkout;
pub mod client;
pub mod session;
pub mod shop;
pub mod storefront;
pub mod sync;

mod test_utils;

/// Re-export shared types
#[doc(hidden)]
pub use shopkit_common::{
    ensure_shopkit,
    error::{self, Error},
    order, payment, product, user, ApiUrl, AuthResponse, CardDetails, CartSnapshot, Category,
    LineItem, LoginRequest, MyShopResponse, NoShopMarker, Order, OrderItem, OrderRequest,
    OrderStatus, Payment, PaymentMethod, PaymentRequest, PaymentStatus, Product, ProductRequest,
    Session, ShippingAddress, Shop, ShopRequest, SignupRequest, User,
};

#[doc(hidden)]
pub use self::builder::StorefrontBuilder;
#[doc(hidden)]
pub use self::cart::CartStore;
#[doc(hidden)]
pub use self::checkout::{CheckoutFlow, CheckoutStep, PaymentSelection};
#[doc(hidden)]
pub use self::client::{ApiConnector, HttpClient};
#[doc(hidden)]
pub use self::session::SessionManager;
#[doc(hidden)]
pub use self::shop::{ShopEvent, ShopManager};
#[doc(hidden)]
pub use self::storefront::Storefront;

/// Result
#[doc(hidden)]
pub type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;
