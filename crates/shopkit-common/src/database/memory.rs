//! In memory storage backend

use tokio::sync::RwLock;

use super::{ClientStorage, Error};
use crate::cart::LineItem;
use crate::user::Session;

/// Storage backend that keeps everything in process memory
///
/// Useful for tests and for embedders that do not want any state to
/// outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    cart: RwLock<Option<Vec<LineItem>>>,
    session: RwLock<Option<Session>>,
}

impl MemoryStorage {
    /// Create an empty in memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ClientStorage for MemoryStorage {
    type Err = Error;

    async fn save_cart(&self, items: &[LineItem]) -> Result<(), Self::Err> {
        *self.cart.write().await = Some(items.to_vec());
        Ok(())
    }

    async fn load_cart(&self) -> Result<Option<Vec<LineItem>>, Self::Err> {
        Ok(self.cart.read().await.clone())
    }

    async fn clear_cart(&self) -> Result<(), Self::Err> {
        *self.cart.write().await = None;
        Ok(())
    }

    async fn save_session(&self, session: &Session) -> Result<(), Self::Err> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn load_session(&self) -> Result<Option<Session>, Self::Err> {
        Ok(self.session.read().await.clone())
    }

    async fn clear_session(&self) -> Result<(), Self::Err> {
        *self.session.write().await = None;
        Ok(())
    }
}
