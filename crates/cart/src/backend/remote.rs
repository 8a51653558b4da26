use std::sync::Arc;

use async_trait::async_trait;
use oakline_core::{CartSource, CartState, Product, ProductId};
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use super::{CartBackend, LocalBackedStore};
use crate::api::CartApi;
use crate::error::{CartError, Result};
use crate::identity::IdentityProvider;
use crate::reconcile::{ReconcileReport, plan_merge};

/// Cart owned by the remote cart API.
///
/// Every mutation is followed by a full re-fetch so the returned state carries
/// server-computed prices and availability.
#[derive(Clone)]
pub struct RemoteBackedStore {
    api: Arc<dyn CartApi>,
    identity: Arc<dyn IdentityProvider>,
}

impl RemoteBackedStore {
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { api, identity }
    }

    fn token(&self) -> Result<SecretString> {
        self.identity
            .bearer_token()
            .ok_or(CartError::Unauthenticated)
    }

    async fn fetch(&self, token: &SecretString) -> Result<CartState> {
        let lines = self.api.fetch_cart(token).await?;
        Ok(CartState::from_lines(CartSource::Remote, lines))
    }

    /// Re-fetch after a mutation the server already accepted.
    async fn refetch(&self, token: &SecretString) -> Result<CartState> {
        match self.api.fetch_cart(token).await {
            Ok(lines) => Ok(CartState::from_lines(CartSource::Remote, lines)),
            Err(e) => {
                debug!(error = %e, "Cart mutation applied but re-fetch failed");
                Err(CartError::Refresh(e))
            }
        }
    }

    /// Merge the local snapshot into the remote cart.
    ///
    /// Each local line is sent as an increment. After every successful step
    /// the merged line is pruned from the persisted snapshot. If that write
    /// fails the merge stops at once, before any further line is sent. On
    /// success the snapshot is deleted and the refreshed remote cart returned.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeInterrupted`] carrying the lines not yet merged. Its
    /// error is `CartError::Unauthenticated` (before any I/O) without a bearer
    /// token, `CartError::Reconcile` if an API call fails, or
    /// `CartError::Storage` if a merged line could not be pruned.
    #[instrument(skip_all, fields(lines = snapshot.lines().len()))]
    pub async fn merge_local(
        &self,
        local: &LocalBackedStore,
        snapshot: &CartState,
    ) -> std::result::Result<(CartState, ReconcileReport), MergeInterrupted> {
        let mut remaining = snapshot.clone();
        let token = match self.token() {
            Ok(token) => token,
            Err(error) => return Err(MergeInterrupted { error, remaining }),
        };
        let total = snapshot.lines().len();
        let reconcile_error = |merged: usize, source| CartError::Reconcile {
            merged,
            total,
            source,
        };

        let remote = match self.api.fetch_cart(&token).await {
            Ok(lines) => CartState::from_lines(CartSource::Remote, lines),
            Err(e) => {
                return Err(MergeInterrupted {
                    error: reconcile_error(0, e),
                    remaining,
                });
            }
        };

        let steps = plan_merge(snapshot, &remote);

        for (merged, step) in steps.iter().enumerate() {
            if let Err(e) = self
                .api
                .add_line(&token, step.product_id, step.quantity)
                .await
            {
                debug!(
                    product_id = %step.product_id,
                    merged,
                    total,
                    error = %e,
                    "Cart merge stopped partway"
                );
                return Err(MergeInterrupted {
                    error: reconcile_error(merged, e),
                    remaining,
                });
            }
            debug!(product_id = %step.product_id, kind = ?step.kind, "Merged cart line");

            remaining.remove(step.product_id);
            if let Err(e) = local.persist(&remaining).await {
                debug!(
                    product_id = %step.product_id,
                    error = %e,
                    "Could not prune merged line from local cart snapshot, stopping merge"
                );
                return Err(MergeInterrupted {
                    error: e.into(),
                    remaining,
                });
            }
        }

        let cart = match self.api.fetch_cart(&token).await {
            Ok(lines) => CartState::from_lines(CartSource::Remote, lines),
            Err(e) => {
                return Err(MergeInterrupted {
                    error: reconcile_error(total, e),
                    remaining,
                });
            }
        };

        if let Err(e) = local.discard().await {
            warn!(error = %e, "Could not delete local cart snapshot after merge");
        }

        let report = ReconcileReport { steps };
        info!(
            inserted = report.inserted(),
            increased = report.increased(),
            quantity = report.merged_quantity(),
            "Merged local cart into account cart"
        );
        Ok((cart, report))
    }
}

/// A merge that stopped partway.
///
/// `remaining` holds the local lines that were not merged. It is exact even
/// when the persisted snapshot could not be pruned.
#[derive(Debug)]
pub struct MergeInterrupted {
    pub error: CartError,
    pub remaining: CartState,
}

#[async_trait]
impl CartBackend for RemoteBackedStore {
    fn source(&self) -> CartSource {
        CartSource::Remote
    }

    async fn load(&self) -> Result<CartState> {
        let token = self.token()?;
        self.fetch(&token).await
    }

    async fn add_line(
        &self,
        _cart: &CartState,
        product: &Product,
        quantity: u32,
    ) -> Result<CartState> {
        let token = self.token()?;
        self.api.add_line(&token, product.id, quantity).await?;
        self.refetch(&token).await
    }

    async fn remove_line(&self, cart: &CartState, product_id: ProductId) -> Result<CartState> {
        let token = self.token()?;
        if cart.line(product_id).is_none() {
            return Ok(cart.clone());
        }
        self.api.remove_line(&token, product_id).await?;
        self.refetch(&token).await
    }

    async fn set_line_quantity(
        &self,
        cart: &CartState,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartState> {
        let token = self.token()?;
        match cart.line(product_id) {
            None => return Ok(cart.clone()),
            Some(line) if line.quantity == quantity => return Ok(cart.clone()),
            Some(_) => {}
        }
        self.api
            .set_line_quantity(&token, product_id, quantity)
            .await?;
        self.refetch(&token).await
    }

    async fn clear(&self, cart: &CartState) -> Result<CartState> {
        let token = self.token()?;
        for line in cart.lines() {
            self.api.remove_line(&token, line.product.id).await?;
        }
        Ok(CartState::empty(CartSource::Remote))
    }
}
