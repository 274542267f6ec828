use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, IntoUrl, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shopkit_common::{
    ApiUrl, AuthResponse, Category, ErrorResponse, LoginRequest, MyShopResponse, Order,
    OrderRequest, Payment, PaymentRequest, Product, ProductRequest, Session, Shop, ShopRequest,
    SignupRequest,
};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::instrument;

use super::{ApiConnector, Error};

/// Header carrying the acting user's id on user scoped endpoints
const USER_ID_HEADER: &str = "X-User-Id";

/// Maximum number of retries after a transient failure
const MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles after every failed attempt
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Credentials attached to one outgoing request
#[derive(Debug, Clone, Default)]
struct RequestAuth {
    bearer: Option<String>,
    user_id: Option<i64>,
}

impl RequestAuth {
    fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(bearer) = &self.bearer {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {bearer}"));
        }
        if let Some(user_id) = self.user_id {
            request = request.header(USER_ID_HEADER, user_id.to_string());
        }
        request
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(err.to_string())
    }
}

/// Run `operation` until it succeeds, fails non transiently, or the retry
/// budget is spent. The delay between attempts doubles each time.
async fn retry_transient<R, F, Fut>(label: &str, mut operation: F) -> Result<R, Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<R, Error>>,
{
    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::warn!(
                    "{label} failed on attempt {attempt} of {MAX_RETRIES}: {err}; retrying in {delay:?}"
                );
                sleep(delay).await;
                delay *= 2;
            }
            result => return result,
        }
    }
}

#[derive(Debug, Clone)]
struct HttpClientCore {
    inner: Client,
}

impl HttpClientCore {
    fn new() -> Self {
        Self {
            inner: Client::new(),
        }
    }

    fn client(&self) -> &Client {
        &self.inner
    }

    /// Send a request and return the body of a success response.
    ///
    /// Non success statuses are mapped through the error taxonomy, taking
    /// the message from the API's error body when one decodes.
    async fn send(&self, request: RequestBuilder) -> Result<String, Error> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !(200..300).contains(&status) {
            let message = ErrorResponse::from_json(&body)
                .map(|err_response| err_response.message)
                .unwrap_or(body);
            return Err(Error::from_status(status, message));
        }

        Ok(body)
    }

    fn decode<R: DeserializeOwned>(body: &str) -> Result<R, Error> {
        serde_json::from_str::<R>(body).map_err(|err| {
            tracing::warn!("Unexpected response body: {}", err);
            match ErrorResponse::from_json(body) {
                Ok(ok) => <ErrorResponse as Into<Error>>::into(ok),
                Err(err) => err,
            }
        })
    }

    async fn http_get<U: IntoUrl + Send, R: DeserializeOwned>(
        &self,
        url: U,
        auth: RequestAuth,
    ) -> Result<R, Error> {
        let body = self.send(auth.apply(self.client().get(url))).await?;
        Self::decode(&body)
    }

    async fn http_post<U: IntoUrl + Send, P: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: U,
        auth: RequestAuth,
        payload: &P,
    ) -> Result<R, Error> {
        let body = self
            .send(auth.apply(self.client().post(url).json(payload)))
            .await?;
        Self::decode(&body)
    }

    async fn http_put<U: IntoUrl + Send, P: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: U,
        auth: RequestAuth,
        payload: &P,
    ) -> Result<R, Error> {
        let body = self
            .send(auth.apply(self.client().put(url).json(payload)))
            .await?;
        Self::decode(&body)
    }

    /// POST whose success body carries nothing the caller needs
    async fn http_post_unit<U: IntoUrl + Send, P: Serialize + ?Sized>(
        &self,
        url: U,
        auth: RequestAuth,
        payload: &P,
    ) -> Result<(), Error> {
        self.send(auth.apply(self.client().post(url).json(payload)))
            .await?;
        Ok(())
    }

    async fn http_delete<U: IntoUrl + Send>(&self, url: U, auth: RequestAuth) -> Result<(), Error> {
        self.send(auth.apply(self.client().delete(url))).await?;
        Ok(())
    }
}

/// Http Client
#[derive(Debug, Clone)]
pub struct HttpClient {
    core: HttpClientCore,
    api_url: ApiUrl,
    session: Arc<RwLock<Option<Session>>>,
}

impl HttpClient {
    /// Create new [`HttpClient`]
    pub fn new(api_url: ApiUrl) -> Self {
        Self {
            core: HttpClientCore::new(),
            api_url,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Base URL this client talks to
    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    async fn request_auth(&self, user_scoped: bool) -> RequestAuth {
        let session = self.session.read().await;
        RequestAuth {
            bearer: session.as_ref().map(|s| s.token.clone()),
            user_id: if user_scoped {
                session.as_ref().map(|s| s.user.id)
            } else {
                None
            },
        }
    }

    /// GET with transient failure retry.
    ///
    /// Client errors return immediately; network failures, timeouts and
    /// 5xx responses are retried with a doubling delay. Only reads go
    /// through here, writes are submitted exactly once.
    async fn retriable_http_get<R>(&self, url: Url, user_scoped: bool) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let auth = self.request_auth(user_scoped).await;
        let label = format!("GET {}", url.path());
        retry_transient(&label, || self.core.http_get(url.clone(), auth.clone())).await
    }
}

#[async_trait]
impl ApiConnector for HttpClient {
    #[instrument(skip(self))]
    async fn get_products(&self) -> Result<Vec<Product>, Error> {
        let url = self.api_url.join_paths(&["products"])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_featured_products(&self) -> Result<Vec<Product>, Error> {
        let url = self.api_url.join_paths(&["products", "featured"])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_product(&self, product_id: i64) -> Result<Product, Error> {
        let url = self
            .api_url
            .join_paths(&["products", &product_id.to_string()])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_products_by_category(&self, category_id: i64) -> Result<Vec<Product>, Error> {
        let url = self
            .api_url
            .join_paths(&["products", "category", &category_id.to_string()])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn search_products(&self, keyword: &str) -> Result<Vec<Product>, Error> {
        let mut url = self.api_url.join_paths(&["products", "search"])?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_products_by_shop(&self, shop_id: i64) -> Result<Vec<Product>, Error> {
        let url = self
            .api_url
            .join_paths(&["products", "shop", &shop_id.to_string()])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_categories(&self) -> Result<Vec<Category>, Error> {
        let url = self.api_url.join_paths(&["categories"])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_category(&self, category_id: i64) -> Result<Category, Error> {
        let url = self
            .api_url
            .join_paths(&["categories", &category_id.to_string()])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_shops(&self) -> Result<Vec<Shop>, Error> {
        let url = self.api_url.join_paths(&["shops"])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_shop(&self, shop_id: i64) -> Result<Shop, Error> {
        let url = self.api_url.join_paths(&["shops", &shop_id.to_string()])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_my_shop(&self) -> Result<MyShopResponse, Error> {
        let url = self.api_url.join_paths(&["shops", "my-shop"])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip_all)]
    async fn create_shop(&self, request: ShopRequest) -> Result<Shop, Error> {
        let url = self.api_url.join_paths(&["shops"])?;
        let auth = self.request_auth(true).await;
        self.core.http_post(url, auth, &request).await
    }

    #[instrument(skip(self, request))]
    async fn update_shop(&self, shop_id: i64, request: ShopRequest) -> Result<Shop, Error> {
        let url = self.api_url.join_paths(&["shops", &shop_id.to_string()])?;
        let auth = self.request_auth(false).await;
        self.core.http_put(url, auth, &request).await
    }

    #[instrument(skip(self, image))]
    async fn upload_shop_logo(
        &self,
        shop_id: i64,
        image: Vec<u8>,
        filename: String,
    ) -> Result<Shop, Error> {
        let url = self
            .api_url
            .join_paths(&["shops", &shop_id.to_string(), "upload-logo"])?;
        let part = reqwest::multipart::Part::bytes(image).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);
        let auth = self.request_auth(false).await;
        let request = auth.apply(self.core.client().post(url).multipart(form));
        let body = self.core.send(request).await?;
        HttpClientCore::decode(&body)
    }

    #[instrument(skip_all)]
    async fn create_product(&self, request: ProductRequest) -> Result<Product, Error> {
        let url = self.api_url.join_paths(&["products"])?;
        let auth = self.request_auth(false).await;
        self.core.http_post(url, auth, &request).await
    }

    #[instrument(skip(self, request))]
    async fn update_product(
        &self,
        product_id: i64,
        request: ProductRequest,
    ) -> Result<Product, Error> {
        let url = self
            .api_url
            .join_paths(&["products", &product_id.to_string()])?;
        let auth = self.request_auth(false).await;
        self.core.http_put(url, auth, &request).await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, product_id: i64) -> Result<(), Error> {
        let url = self
            .api_url
            .join_paths(&["products", &product_id.to_string()])?;
        let auth = self.request_auth(false).await;
        self.core.http_delete(url, auth).await
    }

    #[instrument(skip_all)]
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, Error> {
        let url = self.api_url.join_paths(&["auth", "login"])?;
        self.core
            .http_post(url, RequestAuth::default(), &request)
            .await
    }

    #[instrument(skip_all)]
    async fn signup(&self, request: SignupRequest) -> Result<(), Error> {
        let url = self.api_url.join_paths(&["auth", "signup"])?;
        self.core
            .http_post_unit(url, RequestAuth::default(), &request)
            .await
    }

    #[instrument(skip_all)]
    async fn create_order(&self, request: OrderRequest) -> Result<Order, Error> {
        let url = self.api_url.join_paths(&["orders"])?;
        let auth = self.request_auth(true).await;
        self.core.http_post(url, auth, &request).await
    }

    #[instrument(skip(self))]
    async fn get_orders(&self) -> Result<Vec<Order>, Error> {
        let url = self.api_url.join_paths(&["orders"])?;
        self.retriable_http_get(url, true).await
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: i64) -> Result<Order, Error> {
        let url = self.api_url.join_paths(&["orders", &order_id.to_string()])?;
        self.retriable_http_get(url, true).await
    }

    #[instrument(skip(self))]
    async fn get_order_by_number(&self, order_number: &str) -> Result<Order, Error> {
        let url = self.api_url.join_paths(&["orders", "number", order_number])?;
        self.retriable_http_get(url, true).await
    }

    #[instrument(skip_all)]
    async fn process_payment(&self, request: PaymentRequest) -> Result<Payment, Error> {
        let url = self.api_url.join_paths(&["payments"])?;
        let auth = self.request_auth(true).await;
        self.core.http_post(url, auth, &request).await
    }

    #[instrument(skip(self))]
    async fn get_payment_status(&self, payment_id: i64) -> Result<Payment, Error> {
        let url = self
            .api_url
            .join_paths(&["payments", &payment_id.to_string(), "status"])?;
        self.retriable_http_get(url, false).await
    }

    #[instrument(skip(self))]
    async fn get_payment_by_order(&self, order_id: i64) -> Result<Payment, Error> {
        let url = self
            .api_url
            .join_paths(&["payments", "order", &order_id.to_string()])?;
        self.retriable_http_get(url, false).await
    }

    async fn get_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }
}
