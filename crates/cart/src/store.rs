//! The cart store.
//!
//! Owns the cart for the current session and keeps it consistent with
//! whichever backing store is active. Session lifecycle:
//!
//! ```text
//! Uninitialized -> Loading -> LocalBacked
//!                          -> RemoteBacked
//! LocalBacked -> RemoteBacked      (once per authentication, via reconcile)
//! RemoteBacked -> Uninitialized    (on logout, followed by a fresh load)
//! ```
//!
//! The store is constructed by the application root and handed to UI
//! surfaces. Mutations take `&mut self`; surfaces that share one store wrap it
//! in a `tokio::sync::Mutex`, which serializes operations.

use std::sync::Arc;

use oakline_core::{CartLine, CartSource, CartState, Product, ProductId};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::CartApi;
use crate::backend::{CartBackend, LocalBackedStore, MergeInterrupted, RemoteBackedStore};
use crate::error::{CartError, Result};
use crate::identity::IdentityProvider;
use crate::notify::{Notification, Notifier};
use crate::reconcile::ReconcileReport;
use crate::storage::LocalStorage;

/// Session state, holding the cart once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Loading,
    LocalBacked(CartState),
    RemoteBacked(CartState),
}

impl SessionState {
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        match self {
            Self::Uninitialized => SessionPhase::Uninitialized,
            Self::Loading => SessionPhase::Loading,
            Self::LocalBacked(_) => SessionPhase::LocalBacked,
            Self::RemoteBacked(_) => SessionPhase::RemoteBacked,
        }
    }

    /// The loaded cart, if any.
    #[must_use]
    pub const fn cart(&self) -> Option<&CartState> {
        match self {
            Self::LocalBacked(cart) | Self::RemoteBacked(cart) => Some(cart),
            Self::Uninitialized | Self::Loading => None,
        }
    }
}

/// Tag of a [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    LocalBacked,
    RemoteBacked,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::LocalBacked => write!(f, "local"),
            Self::RemoteBacked => write!(f, "remote"),
        }
    }
}

/// Observable store status for progress indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStatus {
    pub phase: SessionPhase,
    /// An operation is in flight.
    pub loading: bool,
}

/// Cart store for one session.
pub struct CartStore {
    local: LocalBackedStore,
    remote: RemoteBackedStore,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    state: SessionState,
    status: watch::Sender<StoreStatus>,
}

impl CartStore {
    /// Create a store. Call [`CartStore::load`] before using it.
    #[must_use]
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        cart_key: &str,
        api: Arc<dyn CartApi>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status, _) = watch::channel(StoreStatus {
            phase: SessionPhase::Uninitialized,
            loading: false,
        });
        Self {
            local: LocalBackedStore::new(storage, cart_key),
            remote: RemoteBackedStore::new(api, Arc::clone(&identity)),
            identity,
            notifier,
            state: SessionState::Uninitialized,
            status,
        }
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Load the cart for the current session.
    ///
    /// Anonymous sessions read the local snapshot. Authenticated sessions
    /// fetch the remote cart, reconciling first if a local snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cart cannot be fetched or merged. The
    /// store is still usable afterwards: a failed fetch leaves an empty
    /// server-backed cart, a failed merge leaves the unmerged local cart.
    pub async fn load(&mut self) -> Result<()> {
        self.load_session().await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn load_session(&mut self) -> Result<Option<ReconcileReport>> {
        self.transition(SessionState::Loading);
        self.set_loading(true);

        let snapshot = self.local.read_snapshot().await;
        if !self.identity.is_authenticated() {
            debug!(lines = snapshot.lines().len(), "Loaded local cart");
            self.set_loading(false);
            self.transition(SessionState::LocalBacked(snapshot));
            return Ok(None);
        }

        if !snapshot.is_empty() {
            return self.reconcile_snapshot(snapshot).await.map(Some);
        }

        let result = self.remote.load().await;
        self.set_loading(false);
        match result {
            Ok(cart) => {
                debug!(lines = cart.lines().len(), "Loaded remote cart");
                self.transition(SessionState::RemoteBacked(cart));
                Ok(None)
            }
            Err(CartError::Unauthenticated) => {
                self.transition(SessionState::LocalBacked(snapshot));
                Err(CartError::Unauthenticated)
            }
            Err(e) => {
                self.transition(SessionState::RemoteBacked(CartState::empty(
                    CartSource::Remote,
                )));
                self.report("load your cart", &e);
                Err(e)
            }
        }
    }

    /// Merge the local cart into the account cart.
    ///
    /// For every local line the remote quantity is increased by the local
    /// quantity (or the line is added). The refreshed remote cart becomes
    /// authoritative and the local snapshot is deleted. Lines merged before a
    /// failure are dropped from the local cart, so retrying never counts a
    /// line twice. Once the session is server-backed this is a no-op.
    ///
    /// A local-backed session merges its in-memory cart, which stays exact
    /// even if pruning the persisted snapshot failed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthenticated` without any I/O if there is no
    /// credential, `CartError::Reconcile` if an API call stops the merge partway,
    /// or `CartError::Storage` if a merged line could not be pruned locally.
    pub async fn reconcile(&mut self) -> Result<ReconcileReport> {
        if self.state.phase() == SessionPhase::RemoteBacked {
            return Ok(ReconcileReport::default());
        }
        if self.identity.bearer_token().is_none() {
            return Err(CartError::Unauthenticated);
        }
        let snapshot = match &self.state {
            SessionState::LocalBacked(cart) => cart.clone(),
            _ => self.local.read_snapshot().await,
        };
        self.reconcile_snapshot(snapshot).await
    }

    #[instrument(skip_all, fields(lines = snapshot.lines().len()))]
    async fn reconcile_snapshot(&mut self, snapshot: CartState) -> Result<ReconcileReport> {
        self.set_loading(true);
        let result = if snapshot.is_empty() {
            self.remote
                .load()
                .await
                .map(|cart| (cart, ReconcileReport::default()))
                .map_err(|error| MergeInterrupted {
                    error,
                    remaining: snapshot.clone(),
                })
        } else {
            self.remote.merge_local(&self.local, &snapshot).await
        };
        self.set_loading(false);

        match result {
            Ok((cart, report)) => {
                if !report.is_empty() {
                    self.notifier
                        .notify(Notification::info("Your cart was saved to your account"));
                }
                self.transition(SessionState::RemoteBacked(cart));
                Ok(report)
            }
            Err(MergeInterrupted { error, remaining }) => {
                self.transition(SessionState::LocalBacked(remaining));
                self.report("save your cart to your account", &error);
                Err(error)
            }
        }
    }

    /// Apply a change in authentication.
    ///
    /// - not yet loaded: load
    /// - local cart and now authenticated: reconcile
    /// - server cart and no longer authenticated: reset and load again; the
    ///   local snapshot was deleted on reconcile, so the cart comes up empty
    ///
    /// # Errors
    ///
    /// Propagates errors from [`CartStore::load`] and [`CartStore::reconcile`].
    #[instrument(skip(self))]
    pub async fn refresh_session(&mut self) -> Result<Option<ReconcileReport>> {
        let authenticated = self.identity.is_authenticated();
        match (self.state.phase(), authenticated) {
            (SessionPhase::Uninitialized | SessionPhase::Loading, _) => self.load_session().await,
            (SessionPhase::LocalBacked, true) => self.reconcile().await.map(Some),
            (SessionPhase::RemoteBacked, false) => {
                info!("Signed out, discarding server cart view");
                self.reset();
                self.load_session().await
            }
            (SessionPhase::LocalBacked, false) | (SessionPhase::RemoteBacked, true) => Ok(None),
        }
    }

    /// Drop the in-memory cart and return to `Uninitialized`.
    pub fn reset(&mut self) {
        self.set_loading(false);
        self.transition(SessionState::Uninitialized);
    }

    // =========================================================================
    // Cart operations
    // =========================================================================

    /// Add `quantity` of `product`, incrementing an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity or one that
    /// would push the line past `u32::MAX`, and the backend's error otherwise.
    /// The cart is unchanged on error.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_line(&mut self, product: &Product, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        let (backend, cart) = self.active()?;
        let current = cart.line(product.id).map_or(0, |l| l.quantity);
        if current.checked_add(quantity).is_none() {
            return Err(CartError::InvalidQuantity(
                i64::from(current) + i64::from(quantity),
            ));
        }
        self.set_loading(true);
        let result = backend.add_line(cart, product, quantity).await;
        self.finish("add to cart", result)
    }

    /// Remove the line for `product_id`. Absent lines are not an error.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; the cart is unchanged on error.
    #[instrument(skip(self))]
    pub async fn remove_line(&mut self, product_id: ProductId) -> Result<()> {
        let (backend, cart) = self.active()?;
        self.set_loading(true);
        let result = backend.remove_line(cart, product_id).await;
        self.finish("remove from cart", result)
    }

    /// Set (not increment) the quantity of a line.
    ///
    /// A quantity of zero or below is the same as [`CartStore::remove_line`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` above `u32::MAX`, and the
    /// backend's error otherwise; the cart is unchanged on error.
    #[instrument(skip(self))]
    pub async fn update_line_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<()> {
        if quantity <= 0 {
            return self.remove_line(product_id).await;
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;
        let (backend, cart) = self.active()?;
        self.set_loading(true);
        let result = backend.set_line_quantity(cart, product_id, quantity).await;
        self.finish("update your cart", result)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; the cart is unchanged on error.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<()> {
        let (backend, cart) = self.active()?;
        self.set_loading(true);
        let result = backend.clear(cart).await;
        self.finish("clear your cart", result)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum over all lines of price times quantity.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.state.cart().map_or(Decimal::ZERO, CartState::total)
    }

    /// Sum over all lines of quantity.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state.cart().map_or(0, CartState::item_count)
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.state.cart().map(CartState::lines).unwrap_or_default()
    }

    #[must_use]
    pub const fn cart(&self) -> Option<&CartState> {
        self.state.cart()
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// Whether an operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status.borrow().loading
    }

    /// Watch phase and loading changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreStatus> {
        self.status.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn active(&self) -> Result<(&dyn CartBackend, &CartState)> {
        match &self.state {
            SessionState::LocalBacked(cart) => Ok((&self.local as &dyn CartBackend, cart)),
            SessionState::RemoteBacked(cart) => Ok((&self.remote as &dyn CartBackend, cart)),
            SessionState::Uninitialized | SessionState::Loading => Err(CartError::NotLoaded),
        }
    }

    fn finish(&mut self, action: &str, result: Result<CartState>) -> Result<()> {
        self.set_loading(false);
        match result {
            Ok(next) => {
                if let SessionState::LocalBacked(cart) | SessionState::RemoteBacked(cart) =
                    &mut self.state
                {
                    *cart = next;
                }
                Ok(())
            }
            Err(e) => {
                self.report(action, &e);
                Err(e)
            }
        }
    }

    fn report(&self, action: &str, error: &CartError) {
        warn!(action, phase = %self.state.phase(), error = %error, "Cart operation failed");
        if error.is_user_visible() {
            self.notifier
                .notify(Notification::error(error.user_message(action)));
        }
    }

    fn transition(&mut self, next: SessionState) {
        let from = self.state.phase();
        self.state = next;
        let phase = self.state.phase();
        if from != phase {
            debug!(%from, to = %phase, "Cart session transition");
        }
        self.status.send_modify(|status| status.phase = phase);
    }

    fn set_loading(&self, loading: bool) {
        self.status.send_if_modified(|status| {
            let changed = status.loading != loading;
            status.loading = loading;
            changed
        });
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.local.key())
            .field("state", &self.state)
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}
