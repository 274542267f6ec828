//! Shop synchronization
//!
//! Keeps the signed in user's shop and its product collection in sync
//! with the server. Fetches are explicit: the session layer signals auth
//! changes through [`ShopManager::handle_auth`], and everything else goes
//! through the `trigger_*` methods. A fetch that is already running wins;
//! overlapping triggers are dropped rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shopkit_common::parking_lot::Mutex;
use shopkit_common::{MyShopResponse, Product, ProductRequest, Shop, ShopRequest};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::client::ApiConnector;
use crate::sync::{ResourceCell, ResourceState, ResourceValue};
use crate::Error;

/// Quiet window between an auth signal and the initial shop fetch
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Events the shop manager broadcasts to the embedder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopEvent {
    /// The server confirmed the user owns no shop yet. Sent once per
    /// transition into the absent state; a UI would route to shop
    /// creation on this.
    OnboardingRequired,
}

#[derive(Debug)]
struct ShopManagerInner {
    client: Arc<dyn ApiConnector + Send + Sync>,
    shop: ResourceCell<Shop>,
    products: ResourceCell<Vec<Product>>,
    events: broadcast::Sender<ShopEvent>,
    debounce: Duration,
    /// Token for the currently scheduled debounce window, if any
    pending_fetch: Mutex<Option<CancellationToken>>,
    /// Set once the initial post sign in fetch has fired
    initialized: AtomicBool,
}

/// Synchronizes the user's shop and product collection
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct ShopManager {
    inner: Arc<ShopManagerInner>,
}

impl ShopManager {
    /// Create a manager around a connector
    pub fn new(client: Arc<dyn ApiConnector + Send + Sync>, debounce: Duration) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(ShopManagerInner {
                client,
                shop: ResourceCell::new(),
                products: ResourceCell::new(),
                events,
                debounce,
                pending_fetch: Mutex::new(None),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Subscribe to shop events
    pub fn subscribe(&self) -> broadcast::Receiver<ShopEvent> {
        self.inner.events.subscribe()
    }

    /// Current view of the shop resource
    pub fn shop_state(&self) -> ResourceState<Shop> {
        self.inner.shop.state()
    }

    /// Current view of the product collection
    pub fn products_state(&self) -> ResourceState<Vec<Product>> {
        self.inner.products.state()
    }

    /// React to a sign in state change.
    ///
    /// Signing in schedules the initial shop fetch after the debounce
    /// window; another signal inside the window cancels and reschedules
    /// it. Signing out cancels pending work and forgets all state.
    pub fn handle_auth(&self, signed_in: bool) {
        if signed_in {
            self.schedule_initial_fetch();
        } else {
            self.teardown();
        }
    }

    fn schedule_initial_fetch(&self) {
        let token = {
            let mut pending = self.inner.pending_fetch.lock();
            if let Some(previous) = pending.take() {
                previous.cancel();
            } else if self.inner.initialized.load(Ordering::Acquire) {
                return;
            }
            let token = CancellationToken::new();
            *pending = Some(token.clone());
            token
        };

        let manager = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Scheduled shop fetch cancelled");
                }
                _ = tokio::time::sleep(manager.inner.debounce) => {
                    {
                        // The canceller swaps tokens under this lock, so
                        // checking under it cannot race a reschedule.
                        let mut pending = manager.inner.pending_fetch.lock();
                        if token.is_cancelled() {
                            return;
                        }
                        *pending = None;
                        manager.inner.initialized.store(true, Ordering::Release);
                    }
                    manager.trigger_my_shop().await;
                }
            }
        });
    }

    /// Fetch the user's shop.
    ///
    /// Dropped when a shop fetch is already in flight. On resolution the
    /// product collection is fetched once as well; on an absent answer
    /// [`ShopEvent::OnboardingRequired`] is broadcast, once per
    /// transition into absence.
    #[instrument(skip(self))]
    pub async fn trigger_my_shop(&self) {
        let Some(permit) = self.inner.shop.begin() else {
            tracing::debug!("Shop fetch already in flight, dropping trigger");
            return;
        };
        let prior_absent = self.inner.shop.state().value.is_absent();

        match self.inner.client.get_my_shop().await {
            Ok(MyShopResponse::Shop(shop)) => {
                let shop = *shop;
                let shop_id = shop.id;
                if self.inner.shop.complete(permit, Ok(ResourceValue::Present(shop))) {
                    self.trigger_products(shop_id).await;
                }
            }
            Ok(MyShopResponse::Absent(marker)) => {
                tracing::info!("Server reports no shop: {}", marker.message);
                if self.inner.shop.complete(permit, Ok(ResourceValue::Absent)) && !prior_absent {
                    let _ = self.inner.events.send(ShopEvent::OnboardingRequired);
                }
            }
            Err(err) => {
                tracing::warn!("Shop fetch failed: {err}");
                self.inner.shop.complete(permit, Err(err.to_string()));
            }
        }
    }

    /// Fetch the shop's product collection.
    ///
    /// Dropped when a product fetch is already in flight.
    #[instrument(skip(self))]
    pub async fn trigger_products(&self, shop_id: i64) {
        let Some(permit) = self.inner.products.begin() else {
            tracing::debug!("Product fetch already in flight, dropping trigger");
            return;
        };

        match self.inner.client.get_products_by_shop(shop_id).await {
            Ok(products) => {
                self.inner
                    .products
                    .complete(permit, Ok(ResourceValue::Present(products)));
            }
            Err(err) => {
                tracing::warn!("Product fetch failed: {err}");
                self.inner.products.complete(permit, Err(err.to_string()));
            }
        }
    }

    /// Create the user's shop.
    ///
    /// The owner id is filled in from the connector's session. The new
    /// shop is published to the cache and its product collection starts
    /// out empty.
    #[instrument(skip_all)]
    pub async fn create_shop(&self, mut request: ShopRequest) -> Result<Shop, Error> {
        let session = self
            .inner
            .client
            .get_session()
            .await
            .ok_or(Error::NotAuthenticated)?;
        request.owner_id = Some(session.user.id);

        let shop = self
            .inner
            .client
            .create_shop(request)
            .await
            .inspect_err(|err| self.inner.shop.record_error(err.to_string()))?;
        tracing::info!("Created shop {}", shop.id);
        self.inner.shop.publish(shop.clone());
        self.inner.products.publish(Vec::new());
        Ok(shop)
    }

    /// Update the shop profile and cache the server's view of it
    #[instrument(skip_all)]
    pub async fn update_shop(&self, request: ShopRequest) -> Result<Shop, Error> {
        let shop_id = self.current_shop_id().ok_or(Error::NoShop)?;
        let shop = self
            .inner
            .client
            .update_shop(shop_id, request)
            .await
            .inspect_err(|err| self.inner.shop.record_error(err.to_string()))?;
        self.inner.shop.publish(shop.clone());
        Ok(shop)
    }

    /// Upload a new shop logo.
    ///
    /// Separate from profile updates so a failed image upload never
    /// blocks a profile edit.
    #[instrument(skip(self, image))]
    pub async fn upload_logo(&self, image: Vec<u8>, filename: String) -> Result<Shop, Error> {
        let shop_id = self.current_shop_id().ok_or(Error::NoShop)?;
        let shop = self
            .inner
            .client
            .upload_shop_logo(shop_id, image, filename)
            .await
            .inspect_err(|err| self.inner.shop.record_error(err.to_string()))?;
        self.inner.shop.publish(shop.clone());
        Ok(shop)
    }

    /// Add a product to the shop.
    ///
    /// The owning shop id is filled in from the cached shop and the
    /// server's answer is folded into the cached collection.
    #[instrument(skip_all)]
    pub async fn add_product(&self, mut request: ProductRequest) -> Result<Product, Error> {
        let shop_id = self.current_shop_id().ok_or(Error::NoShop)?;
        request.shop_id = Some(shop_id);

        let product = self
            .inner
            .client
            .create_product(request)
            .await
            .inspect_err(|err| self.inner.products.record_error(err.to_string()))?;
        self.update_cached_products(|products| products.push(product.clone()));
        Ok(product)
    }

    /// Update one of the shop's products
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        product_id: i64,
        request: ProductRequest,
    ) -> Result<Product, Error> {
        let product = self
            .inner
            .client
            .update_product(product_id, request)
            .await
            .inspect_err(|err| self.inner.products.record_error(err.to_string()))?;
        self.update_cached_products(|products| {
            if let Some(slot) = products.iter_mut().find(|p| p.id == product_id) {
                *slot = product.clone();
            }
        });
        Ok(product)
    }

    /// Delete one of the shop's products
    #[instrument(skip(self))]
    pub async fn remove_product(&self, product_id: i64) -> Result<(), Error> {
        self.inner
            .client
            .delete_product(product_id)
            .await
            .inspect_err(|err| self.inner.products.record_error(err.to_string()))?;
        self.update_cached_products(|products| products.retain(|p| p.id != product_id));
        Ok(())
    }

    /// Cancel scheduled work and forget all synchronized state.
    ///
    /// Runs on sign out and on storefront shutdown. A fetch that is
    /// already in flight keeps running but its completion is discarded.
    pub fn teardown(&self) {
        {
            // Cancelling under the lock, like rescheduling does, so the
            // fire branch can never observe a half cancelled window.
            let mut pending = self.inner.pending_fetch.lock();
            if let Some(token) = pending.take() {
                token.cancel();
            }
        }
        self.inner.initialized.store(false, Ordering::Release);
        self.inner.shop.reset();
        self.inner.products.reset();
        tracing::debug!("Shop state cleared");
    }

    fn current_shop_id(&self) -> Option<i64> {
        self.inner.shop.state().value.as_present().map(|shop| shop.id)
    }

    /// Apply a mutation to the cached collection, if it has been fetched
    fn update_cached_products<F: Fn(&mut Vec<Product>)>(&self, mutate: F) {
        let state = self.inner.products.state();
        if let Some(products) = state.value.as_present() {
            let mut updated = products.clone();
            mutate(&mut updated);
            self.inner.products.publish(updated);
        }
    }
}
