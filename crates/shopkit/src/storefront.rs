//! ShopKit storefront

use std::sync::Arc;
use std::time::Duration;

use shopkit_common::database::{self, ClientStorage};
use tracing::instrument;

use crate::cart::CartStore;
use crate::checkout::CheckoutFlow;
use crate::client::ApiConnector;
use crate::error::Error;
use crate::session::SessionManager;
use crate::shop::ShopManager;

/// ShopKit storefront
///
/// The [`Storefront`] is the assembled engine: cart, session, shop
/// synchronization and checkout behind one handle. Every part reaches
/// the server through the same connector and persists through the same
/// storage backend; there is no global state.
///
/// Cheap to clone; clones share state.
///
/// # Synopsis
///
/// ```rust
/// use std::str::FromStr;
/// use std::sync::Arc;
///
/// use shopkit::builder::StorefrontBuilder;
/// use shopkit::database::MemoryStorage;
/// use shopkit::ApiUrl;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), shopkit::Error> {
///     let storefront = StorefrontBuilder::new()
///         .api_url(ApiUrl::from_str("https://api.shopkit.dev")?)
///         .localstore(Arc::new(MemoryStorage::new()))
///         .build()
///         .await?;
///
///     assert!(storefront.cart().is_empty().await);
///     storefront.shutdown();
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storefront {
    client: Arc<dyn ApiConnector + Send + Sync>,
    cart: CartStore,
    session: SessionManager,
    shop: ShopManager,
}

impl Storefront {
    /// Assemble the engine and rehydrate persisted state.
    ///
    /// A persisted session schedules the initial shop fetch exactly as a
    /// fresh sign in would.
    pub(crate) async fn new(
        client: Arc<dyn ApiConnector + Send + Sync>,
        localstore: Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>,
        debounce: Duration,
    ) -> Self {
        let cart = CartStore::load(localstore.clone()).await;
        let shop = ShopManager::new(client.clone(), debounce);
        let session = SessionManager::new(localstore, client.clone(), shop.clone());
        session.load().await;

        Self {
            client,
            cart,
            session,
            shop,
        }
    }

    /// The buyer's cart
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Sign in state and credentials
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The seller's shop and product collection
    pub fn shop(&self) -> &ShopManager {
        &self.shop
    }

    /// The raw connector, for reads the engine does not cache
    pub fn client(&self) -> &Arc<dyn ApiConnector + Send + Sync> {
        &self.client
    }

    /// Start a checkout over the current cart.
    ///
    /// Requires a signed in user and a non empty cart. The flow works on
    /// a copy taken now; the live cart is only touched again if the flow
    /// confirms.
    #[instrument(skip(self))]
    pub async fn begin_checkout(&self) -> Result<CheckoutFlow, Error> {
        CheckoutFlow::begin(
            self.cart.clone(),
            self.client.clone(),
            self.session.current_user(),
        )
        .await
    }

    /// Cancel scheduled work and drop synchronized state.
    ///
    /// Call before discarding the storefront; an in flight fetch keeps
    /// running but its completion is discarded.
    pub fn shutdown(&self) {
        self.shop.teardown();
    }
}
