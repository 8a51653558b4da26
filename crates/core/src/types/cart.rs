//! Cart lines and cart state.
//!
//! A cart holds at most one line per product and never holds a line with a
//! quantity below one. Every mutation here preserves both invariants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::Product;

/// One product-and-quantity pair within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Line cost: unit price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Which backing store a cart state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartSource {
    /// Persisted on the device only.
    #[default]
    Local,
    /// Owned by the remote cart API.
    Remote,
}

/// Ordered collection of cart lines tagged with their source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    source: CartSource,
    lines: Vec<CartLine>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn empty(source: CartSource) -> Self {
        Self {
            source,
            lines: Vec::new(),
        }
    }

    /// Build a cart from lines of external origin.
    ///
    /// Lines with quantity zero are dropped and repeated product ids are
    /// collapsed into the first occurrence with their quantities summed.
    #[must_use]
    pub fn from_lines(source: CartSource, lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::empty(source);
        for line in lines {
            if line.quantity > 0 {
                cart.add(line.product, line.quantity);
            }
        }
        cart
    }

    #[must_use]
    pub const fn source(&self) -> CartSource {
        self.source
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for `product_id`, if any.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.id == product_id)
    }

    /// Add `quantity` of `product`, incrementing an existing line.
    ///
    /// Adding zero is a no-op. The product record of an existing line is
    /// refreshed with the one passed in. A line saturates at `u32::MAX`; use
    /// [`CartState::try_add`] where overflow must be rejected.
    pub fn add(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.product = product;
        } else {
            self.lines.push(CartLine { product, quantity });
        }
    }

    /// Like [`CartState::add`], but returns `false` and leaves the cart
    /// unchanged if the line quantity would overflow.
    #[must_use]
    pub fn try_add(&mut self, product: Product, quantity: u32) -> bool {
        let current = self.line(product.id).map_or(0, |l| l.quantity);
        if current.checked_add(quantity).is_none() {
            return false;
        }
        self.add(product, quantity);
        true
    }

    /// Remove the line for `product_id`. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product.id != product_id);
        self.lines.len() != before
    }

    /// Set (not increment) the quantity of an existing line.
    ///
    /// A quantity of zero removes the line. Returns `false` if no line exists
    /// for `product_id`.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self.lines.iter_mut().find(|l| l.product.id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum over all lines of price times quantity.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Sum over all lines of quantity (not the number of lines).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Same lines, different source tag.
    #[must_use]
    pub fn with_source(mut self, source: CartSource) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::new(cents, 2),
            available_quantity: 100,
            image: None,
            discount_percentage: Decimal::ZERO,
        }
    }

    #[test]
    fn test_repeated_adds_accumulate_on_one_line() {
        let mut cart = CartState::empty(CartSource::Local);
        cart.add(product(1, 1000), 2);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 2);

        cart.add(product(1, 1000), 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = CartState::empty(CartSource::Local);
        cart.add(product(1, 1000), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_matches_remove() {
        let mut a = CartState::empty(CartSource::Local);
        a.add(product(1, 1000), 2);
        a.add(product(2, 500), 1);
        let mut b = a.clone();

        assert!(a.set_quantity(ProductId::new(1), 0));
        assert!(b.remove(ProductId::new(1)));
        assert_eq!(a, b);

        let mut c = b.clone();
        assert!(c.set_quantity(ProductId::new(2), 0));
        assert!(c.is_empty());
    }

    #[test]
    fn test_try_add_rejects_overflow() {
        let mut cart = CartState::empty(CartSource::Local);
        cart.add(product(1, 1000), u32::MAX - 1);
        let before = cart.clone();

        assert!(!cart.try_add(product(1, 1000), 2));
        assert_eq!(cart, before);

        assert!(cart.try_add(product(1, 1000), 1));
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, u32::MAX);
    }

    #[test]
    fn test_set_quantity_sets_not_increments() {
        let mut cart = CartState::empty(CartSource::Remote);
        cart.add(product(1, 1000), 2);
        assert!(cart.set_quantity(ProductId::new(1), 7));
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 7);
        assert!(!cart.set_quantity(ProductId::new(9), 7));
    }

    #[test]
    fn test_remove_absent_is_not_an_error() {
        let mut cart = CartState::empty(CartSource::Local);
        assert!(!cart.remove(ProductId::new(4)));
    }

    #[test]
    fn test_totals() {
        let mut cart = CartState::empty(CartSource::Local);
        cart.add(product(1, 1999), 2);
        cart.add(product(2, 500), 3);
        assert_eq!(cart.total(), Decimal::new(5498, 2));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_from_lines_collapses_duplicates_and_drops_zero() {
        let cart = CartState::from_lines(
            CartSource::Remote,
            vec![
                CartLine {
                    product: product(1, 100),
                    quantity: 1,
                },
                CartLine {
                    product: product(2, 100),
                    quantity: 0,
                },
                CartLine {
                    product: product(1, 100),
                    quantity: 4,
                },
            ],
        );
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.source(), CartSource::Remote);
    }
}
