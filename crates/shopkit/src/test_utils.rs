#![cfg(test)]
#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shopkit_common::database::{self, ClientStorage, MemoryStorage};
use shopkit_common::rust_decimal::Decimal;
use shopkit_common::{
    AuthResponse, Category, LineItem, LoginRequest, MyShopResponse, NoShopMarker, Order,
    OrderRequest, Payment, PaymentRequest, PaymentStatus, Product, ProductRequest, Session, Shop,
    ShopRequest, SignupRequest, User,
};

use crate::client::ApiConnector;
use crate::Error;

/// Create a test storage backend
pub fn create_test_db() -> Arc<dyn ClientStorage<Err = database::Error> + Send + Sync> {
    Arc::new(MemoryStorage::new())
}

/// Storage whose reads and writes always fail
#[derive(Debug)]
pub struct BrokenStorage;

#[async_trait]
impl ClientStorage for BrokenStorage {
    type Err = database::Error;

    async fn save_cart(&self, _items: &[LineItem]) -> Result<(), Self::Err> {
        Err(database::Error::Internal("disk on fire".to_string()))
    }

    async fn load_cart(&self) -> Result<Option<Vec<LineItem>>, Self::Err> {
        Err(database::Error::Internal("disk on fire".to_string()))
    }

    async fn clear_cart(&self) -> Result<(), Self::Err> {
        Err(database::Error::Internal("disk on fire".to_string()))
    }

    async fn save_session(&self, _session: &Session) -> Result<(), Self::Err> {
        Err(database::Error::Internal("disk on fire".to_string()))
    }

    async fn load_session(&self) -> Result<Option<Session>, Self::Err> {
        Err(database::Error::Internal("disk on fire".to_string()))
    }

    async fn clear_session(&self) -> Result<(), Self::Err> {
        Err(database::Error::Internal("disk on fire".to_string()))
    }
}

/// Create a test user
pub fn test_user() -> User {
    User {
        id: 40,
        first_name: "Ada".to_string(),
        last_name: "Fox".to_string(),
        email: "ada@example.com".to_string(),
        roles: vec!["ROLE_USER".to_string(), "ROLE_SELLER".to_string()],
    }
}

/// Create a test session
pub fn test_session() -> Session {
    Session {
        user: test_user(),
        token: "eyJhbGciOiJIUzI1NiJ9.test.token".to_string(),
    }
}

/// The flat wire response that [`test_session`] is derived from
pub fn test_auth_response() -> AuthResponse {
    let session = test_session();
    AuthResponse {
        token: session.token,
        id: session.user.id,
        first_name: session.user.first_name,
        last_name: session.user.last_name,
        email: session.user.email,
        roles: session.user.roles,
    }
}

/// Create a test product
pub fn test_product(id: i64, price: Decimal) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        description: None,
        price,
        image_url: None,
        additional_images: vec![],
        stock_quantity: 25,
        category_id: Some(1),
        category_name: Some("Kitchen".to_string()),
        featured: false,
        shop_id: Some(2),
        shop_name: Some("Ada's Shop".to_string()),
    }
}

/// Create a test shop
pub fn test_shop(id: i64) -> Shop {
    Shop {
        id,
        name: "Ada's Shop".to_string(),
        description: Some("Handmade kitchenware".to_string()),
        address: "12 Market Street".to_string(),
        logo_url: None,
        owner_id: Some(40),
        owner_name: Some("Ada Fox".to_string()),
    }
}

/// The absence marker the API returns when the user owns no shop
pub fn no_shop_marker() -> MyShopResponse {
    MyShopResponse::Absent(NoShopMarker {
        message: "No shop exists for this user".to_string(),
        shop_exists: false,
    })
}

/// Create a test order
pub fn test_order(id: i64, total: Decimal) -> Order {
    Order {
        id,
        order_number: format!("ORD-2025-{id:06}"),
        user_id: Some(40),
        items: vec![],
        status: Default::default(),
        total_amount: Some(total),
        shipping_address: None,
        created_at: None,
    }
}

/// Create a test payment in the given settlement state
pub fn test_payment(order_id: i64, status: PaymentStatus) -> Payment {
    Payment {
        id: Some(900),
        order_id,
        order_number: None,
        amount: Decimal::new(10800, 2),
        payment_method: shopkit_common::PaymentMethod::CreditCard,
        status,
        transaction_id: Some("TXN-1".to_string()),
        payment_date: None,
    }
}

/// A call observed by [`MockApiConnector`], in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    GetMyShop,
    GetProductsByShop(i64),
    CreateShop(ShopRequest),
    UpdateShop(i64, ShopRequest),
    UploadShopLogo(i64, String),
    CreateProduct(ProductRequest),
    UpdateProduct(i64, ProductRequest),
    DeleteProduct(i64),
    Login(String),
    Signup(String),
    CreateOrder(OrderRequest),
    ProcessPayment(PaymentRequest),
}

/// Mock ApiConnector for driving the engine without a server
///
/// Responses are queued per endpoint and consumed one per call; a call
/// with an empty queue panics so a test cannot silently run against an
/// unconfigured endpoint. Every call is also recorded, which lets tests
/// assert on ordering and on the exact requests sent.
#[derive(Debug, Default)]
pub struct MockApiConnector {
    my_shop_responses: Mutex<VecDeque<Result<MyShopResponse, Error>>>,
    products_by_shop_responses: Mutex<VecDeque<Result<Vec<Product>, Error>>>,
    create_shop_responses: Mutex<VecDeque<Result<Shop, Error>>>,
    update_shop_responses: Mutex<VecDeque<Result<Shop, Error>>>,
    upload_logo_responses: Mutex<VecDeque<Result<Shop, Error>>>,
    create_product_responses: Mutex<VecDeque<Result<Product, Error>>>,
    update_product_responses: Mutex<VecDeque<Result<Product, Error>>>,
    delete_product_responses: Mutex<VecDeque<Result<(), Error>>>,
    login_responses: Mutex<VecDeque<Result<AuthResponse, Error>>>,
    signup_responses: Mutex<VecDeque<Result<(), Error>>>,
    create_order_responses: Mutex<VecDeque<Result<Order, Error>>>,
    process_payment_responses: Mutex<VecDeque<Result<Payment, Error>>>,
    /// Artificial latency applied to get_my_shop, for in flight overlap tests
    my_shop_delay: Mutex<Option<Duration>>,
    /// Artificial latency applied to create_order, for placing step tests
    create_order_delay: Mutex<Option<Duration>>,
    session: Mutex<Option<Session>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockApiConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_my_shop(&self, response: Result<MyShopResponse, Error>) {
        self.my_shop_responses.lock().unwrap().push_back(response);
    }

    pub fn push_products_by_shop(&self, response: Result<Vec<Product>, Error>) {
        self.products_by_shop_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn push_create_shop(&self, response: Result<Shop, Error>) {
        self.create_shop_responses.lock().unwrap().push_back(response);
    }

    pub fn push_update_shop(&self, response: Result<Shop, Error>) {
        self.update_shop_responses.lock().unwrap().push_back(response);
    }

    pub fn push_upload_logo(&self, response: Result<Shop, Error>) {
        self.upload_logo_responses.lock().unwrap().push_back(response);
    }

    pub fn push_create_product(&self, response: Result<Product, Error>) {
        self.create_product_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn push_update_product(&self, response: Result<Product, Error>) {
        self.update_product_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn push_delete_product(&self, response: Result<(), Error>) {
        self.delete_product_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn push_login(&self, response: Result<AuthResponse, Error>) {
        self.login_responses.lock().unwrap().push_back(response);
    }

    pub fn push_signup(&self, response: Result<(), Error>) {
        self.signup_responses.lock().unwrap().push_back(response);
    }

    pub fn push_create_order(&self, response: Result<Order, Error>) {
        self.create_order_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn push_process_payment(&self, response: Result<Payment, Error>) {
        self.process_payment_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn set_my_shop_delay(&self, delay: Duration) {
        *self.my_shop_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_create_order_delay(&self, delay: Duration) {
        *self.create_order_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, matches: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T, Error>>>, endpoint: &str) -> Result<T, Error> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("MockApiConnector: {endpoint} called without configured response"))
    }
}

#[async_trait]
impl ApiConnector for MockApiConnector {
    async fn get_products(&self) -> Result<Vec<Product>, Error> {
        unimplemented!()
    }

    async fn get_featured_products(&self) -> Result<Vec<Product>, Error> {
        unimplemented!()
    }

    async fn get_product(&self, _product_id: i64) -> Result<Product, Error> {
        unimplemented!()
    }

    async fn get_products_by_category(&self, _category_id: i64) -> Result<Vec<Product>, Error> {
        unimplemented!()
    }

    async fn search_products(&self, _keyword: &str) -> Result<Vec<Product>, Error> {
        unimplemented!()
    }

    async fn get_products_by_shop(&self, shop_id: i64) -> Result<Vec<Product>, Error> {
        self.record(RecordedCall::GetProductsByShop(shop_id));
        Self::pop(&self.products_by_shop_responses, "get_products_by_shop")
    }

    async fn get_categories(&self) -> Result<Vec<Category>, Error> {
        unimplemented!()
    }

    async fn get_category(&self, _category_id: i64) -> Result<Category, Error> {
        unimplemented!()
    }

    async fn get_shops(&self) -> Result<Vec<Shop>, Error> {
        unimplemented!()
    }

    async fn get_shop(&self, _shop_id: i64) -> Result<Shop, Error> {
        unimplemented!()
    }

    async fn get_my_shop(&self) -> Result<MyShopResponse, Error> {
        self.record(RecordedCall::GetMyShop);
        let delay = *self.my_shop_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Self::pop(&self.my_shop_responses, "get_my_shop")
    }

    async fn create_shop(&self, request: ShopRequest) -> Result<Shop, Error> {
        self.record(RecordedCall::CreateShop(request));
        Self::pop(&self.create_shop_responses, "create_shop")
    }

    async fn update_shop(&self, shop_id: i64, request: ShopRequest) -> Result<Shop, Error> {
        self.record(RecordedCall::UpdateShop(shop_id, request));
        Self::pop(&self.update_shop_responses, "update_shop")
    }

    async fn upload_shop_logo(
        &self,
        shop_id: i64,
        _image: Vec<u8>,
        filename: String,
    ) -> Result<Shop, Error> {
        self.record(RecordedCall::UploadShopLogo(shop_id, filename));
        Self::pop(&self.upload_logo_responses, "upload_shop_logo")
    }

    async fn create_product(&self, request: ProductRequest) -> Result<Product, Error> {
        self.record(RecordedCall::CreateProduct(request));
        Self::pop(&self.create_product_responses, "create_product")
    }

    async fn update_product(
        &self,
        product_id: i64,
        request: ProductRequest,
    ) -> Result<Product, Error> {
        self.record(RecordedCall::UpdateProduct(product_id, request));
        Self::pop(&self.update_product_responses, "update_product")
    }

    async fn delete_product(&self, product_id: i64) -> Result<(), Error> {
        self.record(RecordedCall::DeleteProduct(product_id));
        Self::pop(&self.delete_product_responses, "delete_product")
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, Error> {
        self.record(RecordedCall::Login(request.email));
        Self::pop(&self.login_responses, "login")
    }

    async fn signup(&self, request: SignupRequest) -> Result<(), Error> {
        self.record(RecordedCall::Signup(request.email));
        Self::pop(&self.signup_responses, "signup")
    }

    async fn create_order(&self, request: OrderRequest) -> Result<Order, Error> {
        self.record(RecordedCall::CreateOrder(request));
        let delay = *self.create_order_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Self::pop(&self.create_order_responses, "create_order")
    }

    async fn get_orders(&self) -> Result<Vec<Order>, Error> {
        unimplemented!()
    }

    async fn get_order(&self, _order_id: i64) -> Result<Order, Error> {
        unimplemented!()
    }

    async fn get_order_by_number(&self, _order_number: &str) -> Result<Order, Error> {
        unimplemented!()
    }

    async fn process_payment(&self, request: PaymentRequest) -> Result<Payment, Error> {
        self.record(RecordedCall::ProcessPayment(request));
        Self::pop(&self.process_payment_responses, "process_payment")
    }

    async fn get_payment_status(&self, _payment_id: i64) -> Result<Payment, Error> {
        unimplemented!()
    }

    async fn get_payment_by_order(&self, _order_id: i64) -> Result<Payment, Error> {
        unimplemented!()
    }

    async fn get_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    async fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }
}
