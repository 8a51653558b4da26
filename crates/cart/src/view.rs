//! Display data for cart surfaces.

use oakline_core::{CartLine, CartState, Price};
use rust_decimal::Decimal;
use serde::Serialize;

/// Cart item display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub product_id: i32,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    /// e.g. "20% off", when the product is discounted
    pub discount: Option<String>,
    pub image: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Price::usd(Decimal::ZERO).display(),
            item_count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            subtotal: Price::usd(cart.total()).display(),
            item_count: cart.item_count(),
        }
    }
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        let product = &line.product;
        Self {
            product_id: product.id.as_i32(),
            title: product.name.clone(),
            quantity: line.quantity,
            price: product.unit_price().display(),
            line_price: Price::usd(line.subtotal()).display(),
            discount: product
                .has_discount()
                .then(|| format!("{}% off", product.discount_percentage.normalize())),
            image: product.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use oakline_core::{CartSource, Product, ProductId};

    use super::*;

    #[test]
    fn test_empty_view() {
        let view = CartView::empty();
        assert!(view.is_empty());
        assert_eq!(view.subtotal, "$0.00");
        assert_eq!(view.item_count, 0);
    }

    #[test]
    fn test_view_from_cart() {
        let mut cart = CartState::empty(CartSource::Local);
        cart.add(
            Product {
                id: ProductId::new(7),
                name: "Linen Sofa".to_string(),
                description: String::new(),
                price: Decimal::new(129_900, 2),
                available_quantity: 2,
                image: Some("/img/sofa.jpg".to_string()),
                discount_percentage: Decimal::new(150, 1),
            },
            2,
        );

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, "$2598.00");

        let item = &view.items[0];
        assert_eq!(item.product_id, 7);
        assert_eq!(item.price, "$1299.00");
        assert_eq!(item.line_price, "$2598.00");
        assert_eq!(item.discount.as_deref(), Some("15% off"));
    }
}
