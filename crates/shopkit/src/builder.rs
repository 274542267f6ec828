//! Builder for assembling a [`Storefront`]

use std::sync::Arc;
use std::time::Duration;

use shopkit_common::database::{self, ClientStorage};
use shopkit_common::ApiUrl;

use crate::client::{ApiConnector, HttpClient};
use crate::error::Error;
use crate::shop::DEFAULT_DEBOUNCE;
use crate::storefront::Storefront;

/// Builder for creating a new [`Storefront`]
///
/// A storage backend is always required. The connector defaults to an
/// [`HttpClient`] against the configured API URL; tests and alternative
/// transports can swap in their own.
#[derive(Debug)]
pub struct StorefrontBuilder {
    api_url: Option<ApiUrl>,
    localstore: Option<Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>>,
    client: Option<Arc<dyn ApiConnector + Send + Sync>>,
    debounce: Duration,
}

impl Default for StorefrontBuilder {
    fn default() -> Self {
        Self {
            api_url: None,
            localstore: None,
            client: None,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl StorefrontBuilder {
    /// Create a new StorefrontBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL
    pub fn api_url(mut self, api_url: ApiUrl) -> Self {
        self.api_url = Some(api_url);
        self
    }

    /// Set the local storage backend
    pub fn localstore(
        mut self,
        localstore: Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>,
    ) -> Self {
        self.localstore = Some(localstore);
        self
    }

    /// Set a custom client connector
    pub fn client<C: ApiConnector + 'static + Send + Sync>(mut self, client: C) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Set a custom client connector from Arc
    pub fn shared_client(mut self, client: Arc<dyn ApiConnector + Send + Sync>) -> Self {
        self.client = Some(client);
        self
    }

    /// Override the quiet window between a sign in and the shop fetch
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Build the storefront and rehydrate its persisted state
    pub async fn build(self) -> Result<Storefront, Error> {
        let localstore = self
            .localstore
            .ok_or(Error::Custom("Localstore required".to_string()))?;

        let client = match self.client {
            Some(client) => client,
            None => {
                let api_url = self
                    .api_url
                    .ok_or(Error::Custom("Api url required".to_string()))?;
                Arc::new(HttpClient::new(api_url)) as Arc<dyn ApiConnector + Send + Sync>
            }
        };

        Ok(Storefront::new(client, localstore, self.debounce).await)
    }
}
