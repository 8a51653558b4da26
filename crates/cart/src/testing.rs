//! In-memory fakes for exercising the cart store without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use oakline_core::{CartLine, CategoryId, Product, ProductId};
use secrecy::SecretString;

use crate::api::{ApiError, CartApi, ProductCatalog};

/// A remote cart held in memory, with failure injection.
///
/// `add_line` increments like the real API. Products must be registered with
/// [`InMemoryCartApi::with_products`] before they can be added.
#[derive(Debug, Default)]
pub struct InMemoryCartApi {
    products: Mutex<HashMap<ProductId, Product>>,
    lines: Mutex<Vec<CartLine>>,
    /// Mutations still allowed before every call starts failing.
    mutation_budget: Mutex<Option<usize>>,
    fail_fetches: Mutex<bool>,
    fetch_calls: AtomicUsize,
    add_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

impl InMemoryCartApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register catalog products.
    #[must_use]
    pub fn with_products(self, products: impl IntoIterator<Item = Product>) -> Self {
        lock(&self.products).extend(products.into_iter().map(|p| (p.id, p)));
        self
    }

    /// Seed the remote cart with `quantity` of a registered product.
    ///
    /// # Panics
    ///
    /// Panics if the product was not registered.
    pub fn seed_line(&self, product_id: ProductId, quantity: u32) {
        let product = lock(&self.products)
            .get(&product_id)
            .cloned()
            .unwrap_or_else(|| panic!("product {product_id} not registered"));
        lock(&self.lines).push(CartLine { product, quantity });
    }

    /// Current remote lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        lock(&self.lines).clone()
    }

    /// Remote quantity of `product_id` (0 if absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        lock(&self.lines)
            .iter()
            .find(|l| l.product.id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Allow `n` more successful mutations, then fail every mutation.
    pub fn fail_mutations_after(&self, n: usize) {
        *lock(&self.mutation_budget) = Some(n);
    }

    /// Make cart fetches fail (or succeed again).
    pub fn set_fail_fetches(&self, fail: bool) {
        *lock(&self.fail_fetches) = fail;
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        *lock(&self.mutation_budget) = None;
        self.set_fail_fetches(false);
    }

    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Total API calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.fetch_calls() + self.add_calls() + self.remove_calls()
    }

    fn spend_mutation(&self) -> Result<(), ApiError> {
        let mut budget = lock(&self.mutation_budget);
        match budget.as_mut() {
            None => Ok(()),
            Some(0) => Err(unavailable()),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CartApi for InMemoryCartApi {
    async fn fetch_cart(&self, _token: &SecretString) -> Result<Vec<CartLine>, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if *lock(&self.fail_fetches) {
            return Err(unavailable());
        }
        Ok(self.lines())
    }

    async fn add_line(
        &self,
        _token: &SecretString,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.spend_mutation()?;

        let product = lock(&self.products)
            .get(&product_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("product {product_id}")))?;

        let mut lines = lock(&self.lines);
        if let Some(line) = lines.iter_mut().find(|l| l.product.id == product_id) {
            line.quantity += quantity;
        } else {
            lines.push(CartLine { product, quantity });
        }
        Ok(())
    }

    async fn remove_line(
        &self,
        _token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.spend_mutation()?;
        lock(&self.lines).retain(|l| l.product.id != product_id);
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCartApi {
    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        lock(&self.products)
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("product {id}")))
    }

    async fn products(&self, _category: Option<CategoryId>) -> Result<Vec<Product>, ApiError> {
        let mut products: Vec<Product> = lock(&self.products).values().cloned().collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }
}
