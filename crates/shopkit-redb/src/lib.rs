//! Redb storage backend for ShopKit

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod error;
pub mod store;

pub use error::Error;
pub use store::RedbStorage;
