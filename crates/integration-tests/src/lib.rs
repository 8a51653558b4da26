//! Integration tests for Oakline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p oakline-integration-tests
//! ```
//!
//! No external services are needed. [`TestServer`] serves the storefront
//! REST API in-process on an ephemeral port, with a cart per bearer token.
//!
//! # Test Categories
//!
//! - `store_api_client` - `StoreApiClient` and `CartStore` over HTTP
//! - `cart_session` - session lifecycle across restarts, sign-in and sign-out

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use oakline_cart::config::ApiConfig;
use oakline_core::{CartLine, CategoryId, Product, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// A catalog product priced in cents.
#[must_use]
pub fn product(id: i32, name: &str, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: String::new(),
        price: Decimal::new(cents, 2),
        available_quantity: 10,
        image: None,
        discount_percentage: Decimal::ZERO,
    }
}

/// A fresh, not yet created directory under the system temp dir.
#[must_use]
pub fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("oakline-it-{}", uuid::Uuid::new_v4()))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Server state
// ============================================================================

/// Storefront data behind the test server.
#[derive(Debug, Default)]
pub struct StorefrontState {
    products: Mutex<BTreeMap<ProductId, (Product, Option<CategoryId>)>>,
    carts: Mutex<HashMap<String, Vec<CartLine>>>,
    /// Mutations still allowed before every mutation answers 503.
    mutation_budget: Mutex<Option<usize>>,
    /// Answer every request with 429 and this `Retry-After`.
    rate_limit: Mutex<Option<u64>>,
    product_requests: AtomicUsize,
    cart_requests: AtomicUsize,
}

impl StorefrontState {
    /// Register a product, optionally in a category.
    pub fn add_product(&self, product: Product, category: Option<CategoryId>) {
        lock(&self.products).insert(product.id, (product, category));
    }

    /// Put `quantity` of a registered product into `token`'s cart.
    ///
    /// # Panics
    ///
    /// Panics if the product was not registered.
    pub fn seed_cart(&self, token: &str, product_id: ProductId, quantity: u32) {
        let product = lock(&self.products)
            .get(&product_id)
            .map(|(p, _)| p.clone())
            .unwrap_or_else(|| panic!("product {product_id} not registered"));
        lock(&self.carts)
            .entry(token.to_string())
            .or_default()
            .push(CartLine { product, quantity });
    }

    /// `(product id, quantity)` pairs of `token`'s cart, in cart order.
    #[must_use]
    pub fn cart_of(&self, token: &str) -> Vec<(i32, u32)> {
        lock(&self.carts)
            .get(token)
            .map(|lines| {
                lines
                    .iter()
                    .map(|l| (l.product.id.as_i32(), l.quantity))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fail_mutations_after(&self, n: usize) {
        *lock(&self.mutation_budget) = Some(n);
    }

    pub fn rate_limit(&self, retry_after: Option<u64>) {
        *lock(&self.rate_limit) = retry_after;
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        *lock(&self.mutation_budget) = None;
        self.rate_limit(None);
    }

    /// Requests served under `/products`.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.product_requests.load(Ordering::SeqCst)
    }

    /// Requests served under `/cart`.
    #[must_use]
    pub fn cart_requests(&self) -> usize {
        self.cart_requests.load(Ordering::SeqCst)
    }

    fn spend_mutation(&self) -> Result<(), Failure> {
        let mut budget = lock(&self.mutation_budget);
        match budget.as_mut() {
            None => Ok(()),
            Some(0) => Err(Failure::Unavailable),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }

    fn check_rate_limit(&self) -> Result<(), Failure> {
        lock(&self.rate_limit).map_or(Ok(()), |secs| Err(Failure::RateLimited(secs)))
    }
}

// ============================================================================
// Handlers
// ============================================================================

enum Failure {
    Unauthorized,
    NotFound,
    Invalid(&'static str),
    Unavailable,
    RateLimited(u64),
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing bearer token").into_response(),
            Self::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
            Self::Invalid(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason).into_response(),
            Self::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "cart service unavailable").into_response()
            }
            Self::RateLimited(secs) => {
                let mut response = (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
        }
    }
}

type Shared = State<Arc<StorefrontState>>;

fn bearer(headers: &HeaderMap) -> Result<String, Failure> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(Failure::Unauthorized)
}

fn cart_body(lines: &[CartLine]) -> Json<Value> {
    let items: Vec<Value> = lines
        .iter()
        .map(|l| json!({ "product": l.product, "quantity": l.quantity }))
        .collect();
    Json(json!({ "items": items }))
}

async fn get_cart(State(state): Shared, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    state.cart_requests.fetch_add(1, Ordering::SeqCst);
    state.check_rate_limit()?;
    let token = bearer(&headers)?;
    let carts = lock(&state.carts);
    Ok(cart_body(carts.get(&token).map(Vec::as_slice).unwrap_or_default()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItem {
    product_id: ProductId,
    quantity: i64,
}

async fn add_item(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<AddItem>,
) -> Result<StatusCode, Failure> {
    state.cart_requests.fetch_add(1, Ordering::SeqCst);
    state.check_rate_limit()?;
    let token = bearer(&headers)?;
    let quantity = u32::try_from(body.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or(Failure::Invalid("quantity must be positive"))?;
    let product = lock(&state.products)
        .get(&body.product_id)
        .map(|(p, _)| p.clone())
        .ok_or(Failure::NotFound)?;
    state.spend_mutation()?;

    let mut carts = lock(&state.carts);
    let lines = carts.entry(token).or_default();
    if let Some(line) = lines.iter_mut().find(|l| l.product.id == body.product_id) {
        line.quantity += quantity;
    } else {
        lines.push(CartLine { product, quantity });
    }
    Ok(StatusCode::CREATED)
}

async fn delete_item(
    State(state): Shared,
    headers: HeaderMap,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode, Failure> {
    state.cart_requests.fetch_add(1, Ordering::SeqCst);
    state.check_rate_limit()?;
    let token = bearer(&headers)?;
    state.spend_mutation()?;

    let mut carts = lock(&state.carts);
    let lines = carts.entry(token).or_default();
    let before = lines.len();
    lines.retain(|l| l.product.id != product_id);
    if lines.len() == before {
        return Err(Failure::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_product(
    State(state): Shared,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Product>, Failure> {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    state.check_rate_limit()?;
    lock(&state.products)
        .get(&product_id)
        .map(|(p, _)| Json(p.clone()))
        .ok_or(Failure::NotFound)
}

#[derive(Deserialize)]
struct ProductQuery {
    category: Option<CategoryId>,
}

/// Unfiltered listings are a bare array; filtered ones are wrapped in
/// `{"products": [...]}`. The client accepts both.
async fn list_products(
    State(state): Shared,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Value>, Failure> {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    state.check_rate_limit()?;
    let products = lock(&state.products);
    let selected: Vec<&Product> = products
        .values()
        .filter(|(_, category)| query.category.is_none() || *category == query.category)
        .map(|(p, _)| p)
        .collect();
    Ok(Json(match query.category {
        Some(_) => json!({ "products": selected }),
        None => json!(selected),
    }))
}

fn router(state: Arc<StorefrontState>) -> Router {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{product_id}", delete(delete_item))
        .route("/products", get(list_products))
        .route("/products/{product_id}", get(get_product))
        .with_state(state)
}

// ============================================================================
// Test server
// ============================================================================

/// The storefront API served on `127.0.0.1` at an ephemeral port.
///
/// The server task is aborted when this is dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<StorefrontState>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state = Arc::new(StorefrontState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind test server: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("test server has no address: {e}"));

        let app = router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the API.
    ///
    /// # Panics
    ///
    /// Never in practice: the address always forms a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr))
            .unwrap_or_else(|e| panic!("invalid test server URL: {e}"))
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.base_url())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
