//! Oakline cart store.
//!
//! Keeps a shopper's cart consistent across two backing stores: local device
//! storage while the shopper is anonymous, and the remote cart API once they
//! sign in. When a shopper signs in with items in a local cart, the local
//! lines are merged into their account cart exactly once.
//!
//! # Architecture
//!
//! - [`store::CartStore`] - session state machine and the public operations
//! - [`backend`] - the local and remote persistence strategies
//! - [`reconcile`] - merge planning for local-to-remote reconciliation
//! - [`api`] - remote cart and catalog ports, plus the REST client
//! - [`storage`] - local key-value storage port and implementations
//! - [`identity`] / [`notify`] - authentication signal and user notifications
//!
//! # Example
//!
//! ```rust,ignore
//! let api = Arc::new(StoreApiClient::new(&config.api)?);
//! let mut store = CartStore::new(
//!     Arc::new(FileStorage::new(&config.data_dir)),
//!     &config.cart_key,
//!     api.clone(),
//!     Arc::new(SessionIdentity::anonymous()),
//!     Arc::new(TracingNotifier),
//! );
//! store.load().await?;
//! store.add_line(&api.product(ProductId::new(3)).await?, 1).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod notify;
pub mod reconcile;
pub mod storage;
pub mod store;
pub mod view;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{CartError, Result};
pub use store::{CartStore, SessionPhase, SessionState, StoreStatus};
