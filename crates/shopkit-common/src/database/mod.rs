//! ShopKit Database

use std::fmt::Debug;

use async_trait::async_trait;

use crate::cart::LineItem;
use crate::user::Session;

mod memory;

pub use memory::MemoryStorage;

/// ShopKit database error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database Error
    #[error(transparent)]
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Internal Error
    #[error("Internal Error: {0}")]
    Internal(String),
}

/// Client storage trait
///
/// Durable, local, best effort persistence of client state. What is stored
/// here is a cache: the server stays authoritative for anything it has
/// confirmed, and implementations must tolerate concurrent use behind an
/// `Arc`.
#[async_trait]
pub trait ClientStorage: Debug {
    /// Storage error
    type Err: Into<Error> + From<Error>;

    /// Replace the stored cart with this set of line items
    async fn save_cart(&self, items: &[LineItem]) -> Result<(), Self::Err>;
    /// Load the stored cart, if one was saved
    async fn load_cart(&self) -> Result<Option<Vec<LineItem>>, Self::Err>;
    /// Erase the stored cart
    async fn clear_cart(&self) -> Result<(), Self::Err>;

    /// Persist the signed in session
    async fn save_session(&self, session: &Session) -> Result<(), Self::Err>;
    /// Load the persisted session, if one was saved
    async fn load_session(&self) -> Result<Option<Session>, Self::Err>;
    /// Erase the persisted session
    async fn clear_session(&self) -> Result<(), Self::Err>;
}
