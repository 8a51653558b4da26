//! Remote cart and product catalog APIs.
//!
//! # Architecture
//!
//! - The remote cart is the source of truth for authenticated users; every
//!   mutation is followed by a full re-fetch to pick up server-computed state
//! - Catalog reads are cached in memory via `moka`; cart reads never are
//! - [`StoreApiClient`] is the REST implementation of both ports
//!
//! # Example
//!
//! ```rust,ignore
//! use oakline_cart::api::{CartApi, ProductCatalog, StoreApiClient};
//!
//! let client = StoreApiClient::new(&config.api)?;
//!
//! let product = client.product(ProductId::new(3)).await?;
//! client.add_line(&token, product.id, 1).await?;
//! let lines = client.fetch_cart(&token).await?;
//! ```

mod cache;
mod client;
mod wire;

use async_trait::async_trait;
use oakline_core::{CartLine, CategoryId, Product, ProductId};
use secrecy::SecretString;
use thiserror::Error;

pub use client::StoreApiClient;

/// Errors that can occur when calling the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Remote cart API for an authenticated customer.
///
/// `add_line` increments: posting a product already in the cart raises its
/// quantity by the posted amount.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the full cart.
    async fn fetch_cart(&self, token: &SecretString) -> Result<Vec<CartLine>, ApiError>;

    /// Add `quantity` of `product_id`.
    async fn add_line(
        &self,
        token: &SecretString,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Remove the line for `product_id`.
    async fn remove_line(&self, token: &SecretString, product_id: ProductId)
    -> Result<(), ApiError>;

    /// Set the quantity of the line for `product_id`.
    ///
    /// The API has no set-quantity endpoint, so this removes the line and
    /// adds it back. Implementations with a dedicated call may override it.
    async fn set_line_quantity(
        &self,
        token: &SecretString,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.remove_line(token, product_id).await?;
        self.add_line(token, product_id, quantity).await
    }
}

/// Read access to product records.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Look up one product.
    async fn product(&self, id: ProductId) -> Result<Product, ApiError>;

    /// List products, optionally restricted to one category.
    async fn products(&self, category: Option<CategoryId>) -> Result<Vec<Product>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API returned 502: bad gateway");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
