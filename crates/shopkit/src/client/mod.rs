//! Storefront client

use std::fmt::Debug;

use async_trait::async_trait;
use shopkit_common::{
    AuthResponse, Category, LoginRequest, MyShopResponse, Order, OrderRequest, Payment,
    PaymentRequest, Product, ProductRequest, Session, Shop, ShopRequest, SignupRequest,
};

use super::Error;

pub mod http_client;

pub use http_client::HttpClient;

/// Interface that connects the engine to the commerce API. Typically
/// represents an [`HttpClient`].
///
/// Read methods map to GET endpoints and are retried on transient
/// failures by the HTTP implementation; mutating methods are submitted
/// exactly once.
#[async_trait]
pub trait ApiConnector: Debug {
    /// List the whole catalog
    async fn get_products(&self) -> Result<Vec<Product>, Error>;
    /// List featured products
    async fn get_featured_products(&self) -> Result<Vec<Product>, Error>;
    /// Get a single product
    async fn get_product(&self, product_id: i64) -> Result<Product, Error>;
    /// List products in a category
    async fn get_products_by_category(&self, category_id: i64) -> Result<Vec<Product>, Error>;
    /// Keyword search over the catalog
    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, Error>;
    /// List the products of one shop
    async fn get_products_by_shop(&self, shop_id: i64) -> Result<Vec<Product>, Error>;
    /// List all categories
    async fn get_categories(&self) -> Result<Vec<Category>, Error>;
    /// Get a single category
    async fn get_category(&self, category_id: i64) -> Result<Category, Error>;

    /// List all shops
    async fn get_shops(&self) -> Result<Vec<Shop>, Error>;
    /// Get a single shop
    async fn get_shop(&self, shop_id: i64) -> Result<Shop, Error>;
    /// Get the shop owned by the authenticated user, or the absence marker
    async fn get_my_shop(&self) -> Result<MyShopResponse, Error>;
    /// Create a shop for the authenticated user
    async fn create_shop(&self, request: ShopRequest) -> Result<Shop, Error>;
    /// Update a shop
    async fn update_shop(&self, shop_id: i64, request: ShopRequest) -> Result<Shop, Error>;
    /// Upload a shop logo image
    async fn upload_shop_logo(
        &self,
        shop_id: i64,
        image: Vec<u8>,
        filename: String,
    ) -> Result<Shop, Error>;

    /// Add a product to the authenticated user's shop
    async fn create_product(&self, request: ProductRequest) -> Result<Product, Error>;
    /// Update a product
    async fn update_product(
        &self,
        product_id: i64,
        request: ProductRequest,
    ) -> Result<Product, Error>;
    /// Delete a product
    async fn delete_product(&self, product_id: i64) -> Result<(), Error>;

    /// Exchange credentials for a token and identity
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, Error>;
    /// Register a new account
    async fn signup(&self, request: SignupRequest) -> Result<(), Error>;

    /// Create an order from cart lines and a shipping address
    async fn create_order(&self, request: OrderRequest) -> Result<Order, Error>;
    /// List the authenticated user's orders
    async fn get_orders(&self) -> Result<Vec<Order>, Error>;
    /// Get one of the authenticated user's orders
    async fn get_order(&self, order_id: i64) -> Result<Order, Error>;
    /// Look an order up by its order number
    async fn get_order_by_number(&self, order_number: &str) -> Result<Order, Error>;

    /// Submit a payment for an order
    async fn process_payment(&self, request: PaymentRequest) -> Result<Payment, Error>;
    /// Get the settlement status of a payment
    async fn get_payment_status(&self, payment_id: i64) -> Result<Payment, Error>;
    /// Get the payment attached to an order
    async fn get_payment_by_order(&self, order_id: i64) -> Result<Payment, Error>;

    /// Get the session used to authorize requests
    async fn get_session(&self) -> Option<Session>;
    /// Set or clear the session used to authorize requests
    async fn set_session(&self, session: Option<Session>);
}
