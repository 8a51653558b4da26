//! Unified error handling for cart operations.
//!
//! Every cart store operation returns `Result<T, CartError>`. No variant is
//! fatal: callers keep a usable store after any error, with the cart either
//! unchanged or reset to a safe empty state.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Cart-level error type.
#[derive(Debug, Error)]
pub enum CartError {
    /// A server-backed operation was attempted without a bearer credential.
    /// Raised before any I/O.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The store has not finished loading.
    #[error("Cart is not loaded")]
    NotLoaded,

    /// Quantity must be a positive integer.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Remote cart API operation failed.
    #[error("Cart API error: {0}")]
    Api(#[from] ApiError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The server accepted a change but the cart could not be re-fetched.
    /// The in-memory cart is stale until the next load.
    #[error("Cart changed on the server but could not be refreshed: {0}")]
    Refresh(#[source] ApiError),

    /// Reconciliation stopped partway through.
    #[error("Cart merge stopped after {merged} of {total} lines: {source}")]
    Reconcile {
        merged: usize,
        total: usize,
        #[source]
        source: ApiError,
    },
}

impl CartError {
    /// Whether this failure should be shown to the user as a notification.
    ///
    /// Network, API and storage failures are; precondition failures are
    /// reported to the caller only.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::Api(_) | Self::Storage(_) | Self::Refresh(_) | Self::Reconcile { .. }
        )
    }

    /// Short message suitable for a user-facing notification.
    #[must_use]
    pub fn user_message(&self, action: &str) -> String {
        match self {
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Could not {action}: too many requests, try again in {secs}s")
            }
            Self::Api(ApiError::Http(_)) => {
                format!("Could not {action}: network unavailable")
            }
            Self::Api(_) => format!("Could not {action}: the store is unavailable"),
            Self::Storage(_) => format!("Could not {action}: unable to save your cart"),
            Self::Refresh(_) => {
                "Your cart was updated but could not be refreshed. Reload to see it".to_string()
            }
            Self::Reconcile { merged, total, .. } => format!(
                "Only {merged} of {total} items from your cart were saved to your account"
            ),
            Self::Unauthenticated => format!("Sign in to {action}"),
            Self::NotLoaded | Self::InvalidQuantity(_) => format!("Could not {action}"),
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        assert_eq!(CartError::Unauthenticated.to_string(), "Not authenticated");
        assert_eq!(
            CartError::InvalidQuantity(0).to_string(),
            "Invalid quantity: 0"
        );

        let err = CartError::Reconcile {
            merged: 1,
            total: 3,
            source: ApiError::RateLimited(5),
        };
        assert_eq!(
            err.to_string(),
            "Cart merge stopped after 1 of 3 lines: Rate limited, retry after 5 seconds"
        );
    }

    #[test]
    fn test_user_visible_classification() {
        assert!(CartError::Api(ApiError::NotFound("cart".into())).is_user_visible());
        assert!(
            CartError::Storage(StorageError::InvalidKey("..".into())).is_user_visible()
        );
        assert!(!CartError::Unauthenticated.is_user_visible());
        assert!(!CartError::InvalidQuantity(0).is_user_visible());
        assert!(!CartError::NotLoaded.is_user_visible());
    }

    #[test]
    fn test_user_message() {
        let err = CartError::Api(ApiError::RateLimited(30));
        assert_eq!(
            err.user_message("add to cart"),
            "Could not add to cart: too many requests, try again in 30s"
        );

        let err = CartError::Refresh(ApiError::RateLimited(30));
        assert!(err.is_user_visible());
        assert!(!err.user_message("add to cart").starts_with("Could not"));
    }
}
