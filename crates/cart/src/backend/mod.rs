//! Cart persistence strategies.
//!
//! The store holds exactly one active strategy, chosen by session state:
//! [`LocalBackedStore`] for anonymous sessions and [`RemoteBackedStore`] once
//! the caller is authenticated. Each operation receives the current cart and
//! returns the next one; the store commits it only on success, so a failed
//! operation never leaves a partial update in memory.

mod local;
mod remote;

use async_trait::async_trait;
use oakline_core::{CartSource, CartState, Product, ProductId};

use crate::error::Result;

pub use local::LocalBackedStore;
pub use remote::{MergeInterrupted, RemoteBackedStore};

/// A backing store for cart state.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Which source carts from this backend are tagged with.
    fn source(&self) -> CartSource;

    /// Read the persisted cart.
    async fn load(&self) -> Result<CartState>;

    /// Add `quantity` of `product`, incrementing an existing line.
    async fn add_line(&self, cart: &CartState, product: &Product, quantity: u32)
    -> Result<CartState>;

    /// Remove the line for `product_id`; absent lines are a no-op.
    async fn remove_line(&self, cart: &CartState, product_id: ProductId) -> Result<CartState>;

    /// Set the quantity of an existing line; absent lines are a no-op.
    async fn set_line_quantity(
        &self,
        cart: &CartState,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartState>;

    /// Remove every line.
    async fn clear(&self, cart: &CartState) -> Result<CartState>;
}
