//! Cart state and persistence

use std::sync::Arc;

use shopkit_common::database::{self, ClientStorage};
use shopkit_common::{CartSnapshot, LineItem, Product};
use tokio::sync::RwLock;
use tracing::instrument;

/// Shared handle to the buyer's cart
///
/// A cart holds at most one line per product id. Every mutation recomputes
/// the derived totals and then writes the new item set to storage, so the
/// in memory cart is never staler than the durable copy. Persistence is
/// best effort: a failing backend is logged and the mutation still
/// succeeds.
#[derive(Debug, Clone)]
pub struct CartStore {
    localstore: Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>,
    items: Arc<RwLock<Vec<LineItem>>>,
}

impl CartStore {
    /// Rehydrate the cart from storage.
    ///
    /// A missing, unreadable or undecodable stored cart yields an empty
    /// one. Rehydration never fails the caller.
    pub async fn load(
        localstore: Arc<dyn ClientStorage<Err = database::Error> + Send + Sync>,
    ) -> Self {
        let items = match localstore.load_cart().await {
            Ok(Some(items)) => items,
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!("Stored cart could not be read, starting empty: {}", err);
                Vec::new()
            }
        };

        Self {
            localstore,
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// If the product is already in the cart its line quantity grows;
    /// otherwise a new line is appended. Adding zero units changes
    /// nothing.
    #[instrument(skip(self, product), fields(product_id = product.id))]
    pub async fn add_item(&self, product: &Product, quantity: u32) -> CartSnapshot {
        let mut items = self.items.write().await;

        if quantity > 0 {
            match items.iter_mut().find(|item| item.product_id == product.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(quantity),
                None => items.push(LineItem::new(product, quantity)),
            }
            self.persist(&items).await;
        }

        CartSnapshot::from_items(items.clone())
    }

    /// Remove a product's line entirely. Unknown ids are a silent no-op.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: i64) -> CartSnapshot {
        let mut items = self.items.write().await;

        let before = items.len();
        items.retain(|item| item.product_id != product_id);
        if items.len() != before {
            self.persist(&items).await;
        }

        CartSnapshot::from_items(items.clone())
    }

    /// Set the quantity of a product's line.
    ///
    /// Zero removes the line. Unknown ids are a silent no-op.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: i64, quantity: u32) -> CartSnapshot {
        let mut items = self.items.write().await;

        if quantity == 0 {
            let before = items.len();
            items.retain(|item| item.product_id != product_id);
            if items.len() != before {
                self.persist(&items).await;
            }
        } else if let Some(line) = items.iter_mut().find(|item| item.product_id == product_id) {
            line.quantity = quantity;
            self.persist(&items).await;
        }

        CartSnapshot::from_items(items.clone())
    }

    /// Empty the cart and erase its durable copy. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> CartSnapshot {
        let mut items = self.items.write().await;

        items.clear();
        if let Err(err) = self.localstore.clear_cart().await {
            tracing::warn!("Failed to clear stored cart: {}", err);
        }

        CartSnapshot::default()
    }

    /// Current cart contents with derived totals
    pub async fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from_items(self.items.read().await.clone())
    }

    /// Whether the cart holds no items
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    async fn persist(&self, items: &[LineItem]) {
        if let Err(err) = self.localstore.save_cart(items).await {
            tracing::warn!("Failed to persist cart: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use shopkit_common::database::MemoryStorage;
    use shopkit_common::rust_decimal::Decimal;

    use super::*;
    use crate::test_utils::BrokenStorage;

    fn product(id: i64, price: Decimal) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            description: None,
            price,
            image_url: None,
            additional_images: vec![],
            stock_quantity: 100,
            category_id: None,
            category_name: None,
            featured: false,
            shop_id: None,
            shop_name: None,
        }
    }

    async fn empty_cart() -> CartStore {
        CartStore::load(Arc::new(MemoryStorage::new())).await
    }

    #[tokio::test]
    async fn adding_merges_lines_by_product_id() {
        let cart = empty_cart().await;
        let p1 = product(1, Decimal::new(1000, 2));

        let snapshot = cart.add_item(&p1, 2).await;
        assert_eq!(snapshot.total_items, 2);
        assert_eq!(snapshot.total_price, Decimal::new(2000, 2));
        assert_eq!(snapshot.items.len(), 1);

        let snapshot = cart.add_item(&p1, 3).await;
        assert_eq!(snapshot.total_items, 5);
        assert_eq!(snapshot.total_price, Decimal::new(5000, 2));
        assert_eq!(snapshot.items.len(), 1, "same product never forks a second line");
    }

    #[tokio::test]
    async fn totals_track_every_mutation() {
        let cart = empty_cart().await;
        cart.add_item(&product(1, Decimal::new(1000, 2)), 2).await;
        let snapshot = cart.add_item(&product(2, Decimal::new(550, 2)), 1).await;
        assert_eq!(snapshot.total_items, 3);
        assert_eq!(snapshot.total_price, Decimal::new(2550, 2));

        let snapshot = cart.remove_item(2).await;
        assert_eq!(snapshot.total_items, 2);
        assert_eq!(snapshot.total_price, Decimal::new(2000, 2));

        let snapshot = cart.set_quantity(1, 7).await;
        assert_eq!(snapshot.total_items, 7);
        assert_eq!(snapshot.total_price, Decimal::new(7000, 2));
    }

    #[tokio::test]
    async fn zero_quantity_removes_the_line() {
        let cart = empty_cart().await;
        cart.add_item(&product(1, Decimal::new(1000, 2)), 2).await;
        cart.add_item(&product(2, Decimal::new(500, 2)), 1).await;

        let snapshot = cart.set_quantity(1, 0).await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].product_id, 2);
        assert_eq!(snapshot.total_items, 1);
        assert_eq!(snapshot.total_price, Decimal::new(500, 2));
    }

    #[tokio::test]
    async fn unknown_ids_are_silent_no_ops() {
        let cart = empty_cart().await;
        cart.add_item(&product(1, Decimal::new(1000, 2)), 1).await;

        let snapshot = cart.remove_item(99).await;
        assert_eq!(snapshot.total_items, 1);

        let snapshot = cart.set_quantity(99, 5).await;
        assert_eq!(snapshot.total_items, 1);
        assert_eq!(snapshot.total_price, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn clear_is_idempotent_and_erases_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::load(storage.clone()).await;
        cart.add_item(&product(1, Decimal::new(1000, 2)), 2).await;
        assert!(storage.load_cart().await.unwrap().is_some());

        let snapshot = cart.clear().await;
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_price, Decimal::ZERO);
        assert!(storage.load_cart().await.unwrap().is_none());

        // Clearing again leaves the same empty state
        let snapshot = cart.clear().await;
        assert!(snapshot.is_empty());
        assert!(storage.load_cart().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mutations_persist_before_returning() {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::load(storage.clone()).await;
        cart.add_item(&product(1, Decimal::new(1000, 2)), 2).await;

        // A second store over the same backend sees the saved items
        let rehydrated = CartStore::load(storage).await;
        let snapshot = rehydrated.snapshot().await;
        assert_eq!(snapshot.total_items, 2);
        assert_eq!(snapshot.items[0].product_id, 1);
    }

    #[tokio::test]
    async fn unreadable_storage_yields_an_empty_cart() {
        let cart = CartStore::load(Arc::new(BrokenStorage)).await;
        assert!(cart.is_empty().await);
    }

    #[tokio::test]
    async fn write_failures_do_not_fail_mutations() {
        let cart = CartStore::load(Arc::new(BrokenStorage)).await;

        let snapshot = cart.add_item(&product(1, Decimal::new(1000, 2)), 2).await;
        assert_eq!(snapshot.total_items, 2);

        let snapshot = cart.clear().await;
        assert!(snapshot.is_empty());
    }
}
