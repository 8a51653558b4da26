use std::sync::Arc;

use async_trait::async_trait;
use oakline_core::{CartSource, CartState, Product, ProductId};
use tracing::{debug, instrument, warn};

use super::CartBackend;
use crate::error::{CartError, Result};
use crate::storage::{LocalStorage, StorageError, snapshot};

/// Cart persisted to local device storage under a single key.
#[derive(Clone)]
pub struct LocalBackedStore {
    storage: Arc<dyn LocalStorage>,
    key: String,
}

impl LocalBackedStore {
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Storage key of the snapshot.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted snapshot.
    ///
    /// Missing, unreadable or malformed snapshots read as an empty cart.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn read_snapshot(&self) -> CartState {
        match self.storage.read(&self.key).await {
            Ok(Some(raw)) => snapshot::decode(&raw),
            Ok(None) => CartState::empty(CartSource::Local),
            Err(e) => {
                warn!(error = %e, "Could not read cart snapshot, starting with an empty cart");
                CartState::empty(CartSource::Local)
            }
        }
    }

    /// Overwrite the snapshot with `cart`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub async fn persist(&self, cart: &CartState) -> std::result::Result<(), StorageError> {
        let raw = snapshot::encode(cart)?;
        self.storage.write(&self.key, &raw).await?;
        debug!(key = %self.key, lines = cart.lines().len(), "Persisted cart snapshot");
        Ok(())
    }

    /// Delete the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    pub async fn discard(&self) -> std::result::Result<(), StorageError> {
        self.storage.delete(&self.key).await
    }

    async fn commit(&self, next: CartState) -> Result<CartState> {
        self.persist(&next).await?;
        Ok(next)
    }
}

#[async_trait]
impl CartBackend for LocalBackedStore {
    fn source(&self) -> CartSource {
        CartSource::Local
    }

    async fn load(&self) -> Result<CartState> {
        Ok(self.read_snapshot().await)
    }

    async fn add_line(
        &self,
        cart: &CartState,
        product: &Product,
        quantity: u32,
    ) -> Result<CartState> {
        let mut next = cart.clone();
        if !next.try_add(product.clone(), quantity) {
            let current = cart.line(product.id).map_or(0, |l| l.quantity);
            return Err(CartError::InvalidQuantity(
                i64::from(current) + i64::from(quantity),
            ));
        }
        self.commit(next).await
    }

    async fn remove_line(&self, cart: &CartState, product_id: ProductId) -> Result<CartState> {
        let mut next = cart.clone();
        if !next.remove(product_id) {
            return Ok(next);
        }
        self.commit(next).await
    }

    async fn set_line_quantity(
        &self,
        cart: &CartState,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartState> {
        let mut next = cart.clone();
        if !next.set_quantity(product_id, quantity) {
            return Ok(next);
        }
        self.commit(next).await
    }

    async fn clear(&self, _cart: &CartState) -> Result<CartState> {
        self.discard().await?;
        Ok(CartState::empty(CartSource::Local))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStorage;

    fn chair() -> Product {
        Product {
            id: ProductId::new(2),
            name: "Side Chair".to_string(),
            description: String::new(),
            price: Decimal::new(7500, 2),
            available_quantity: 20,
            image: None,
            discount_percentage: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let backend = LocalBackedStore::new(storage.clone(), "cart");

        let cart = backend.load().await.unwrap();
        let cart = backend.add_line(&cart, &chair(), 2).await.unwrap();
        assert_eq!(backend.read_snapshot().await, cart);

        let cart = backend
            .set_line_quantity(&cart, ProductId::new(2), 6)
            .await
            .unwrap();
        assert_eq!(backend.read_snapshot().await.item_count(), 6);

        let cart = backend.clear(&cart).await.unwrap();
        assert!(cart.is_empty());
        assert!(!storage.contains("cart").await);
    }

    #[tokio::test]
    async fn test_remove_absent_does_not_touch_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let backend = LocalBackedStore::new(storage.clone(), "cart");

        let cart = CartState::empty(CartSource::Local);
        let next = backend.remove_line(&cart, ProductId::new(9)).await.unwrap();
        assert!(next.is_empty());
        assert!(!storage.contains("cart").await);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_loads_empty() {
        let storage = Arc::new(MemoryStorage::with_entry("cart", "{{{"));
        let backend = LocalBackedStore::new(storage, "cart");
        assert!(backend.load().await.unwrap().is_empty());
    }
}
