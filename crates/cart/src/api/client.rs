//! REST client for the storefront API.
//!
//! Uses `reqwest` for HTTP and caches catalog reads with `moka`
//! (TTL from configuration, 5 minutes by default).

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use oakline_core::{CartLine, CategoryId, Product, ProductId};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::wire::{AddLineRequest, CartResponse, ProductList};
use super::{ApiError, CartApi, ProductCatalog};
use crate::config::ApiConfig;

/// Maximum number of body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

// =============================================================================
// StoreApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Cheaply cloneable; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct StoreApiClient {
    inner: Arc<StoreApiClientInner>,
}

struct StoreApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl StoreApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("oakline-cart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(StoreApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read the body first for better error diagnostics
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(what.to_string()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Storefront API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        Ok(body)
    }

    fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse storefront API response"
            );
            ApiError::Parse(e)
        })
    }
}

// =============================================================================
// Cart Methods (not cached - mutable state)
// =============================================================================

#[async_trait]
impl CartApi for StoreApiClient {
    #[instrument(skip(self, token))]
    async fn fetch_cart(&self, token: &SecretString) -> Result<Vec<CartLine>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url("/cart"))
            .bearer_auth(token.expose_secret());
        let body = self.send(request, "cart").await?;
        let lines = Self::parse::<CartResponse>(&body)?.into_lines();
        debug!(lines = lines.len(), "Fetched remote cart");
        Ok(lines)
    }

    #[instrument(skip(self, token))]
    async fn add_line(
        &self,
        token: &SecretString,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .post(self.url("/cart/items"))
            .bearer_auth(token.expose_secret())
            .json(&AddLineRequest {
                product_id,
                quantity,
            });
        self.send(request, &format!("product {product_id}")).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn remove_line(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .delete(self.url(&format!("/cart/items/{product_id}")))
            .bearer_auth(token.expose_secret());
        match self.send(request, &format!("cart line {product_id}")).await {
            // Already gone
            Ok(_) | Err(ApiError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Catalog Methods (cached)
// =============================================================================

#[async_trait]
impl ProductCatalog for StoreApiClient {
    #[instrument(skip(self))]
    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.inner.client.get(self.url(&format!("/products/{id}")));
        let body = self.send(request, &format!("product {id}")).await?;
        let product = Self::parse::<Product>(&body)?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn products(&self, category: Option<CategoryId>) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Products { category };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let path = category.map_or_else(
            || "/products".to_string(),
            |category| format!("/products?category={category}"),
        );
        let request = self.inner.client.get(self.url(&path));
        let body = self.send(request, "products").await?;
        let products = Self::parse::<ProductList>(&body)?.into_products();

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }
}
