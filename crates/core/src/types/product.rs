//! Product records as served by the catalog and cart APIs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A catalog product.
///
/// This is the product sub-record embedded in cart lines, both in the remote
/// cart response and in the locally persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit cost.
    pub price: Decimal,
    /// Stock available for sale.
    #[serde(default)]
    pub available_quantity: u32,
    /// Image reference (URL or asset path).
    #[serde(default)]
    pub image: Option<String>,
    /// Discount in percent (0-100).
    #[serde(default)]
    pub discount_percentage: Decimal,
}

impl Product {
    /// Unit price after applying the discount percentage.
    ///
    /// Cart totals are computed from [`Product::price`]; this is for display.
    #[must_use]
    pub fn discounted_price(&self) -> Decimal {
        let pct = self.discount_percentage.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        self.price - self.price * pct / Decimal::ONE_HUNDRED
    }

    /// Whether a discount applies.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_percentage > Decimal::ZERO
    }

    /// Unit price as a displayable [`Price`].
    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn armchair() -> Product {
        Product {
            id: ProductId::new(3),
            name: "Walnut Armchair".to_string(),
            description: "Solid walnut frame".to_string(),
            price: Decimal::new(24900, 2),
            available_quantity: 12,
            image: Some("/img/armchair.jpg".to_string()),
            discount_percentage: Decimal::from(20),
        }
    }

    #[test]
    fn test_discounted_price() {
        assert_eq!(armchair().discounted_price(), Decimal::new(19920, 2));
    }

    #[test]
    fn test_discount_is_clamped() {
        let mut product = armchair();
        product.discount_percentage = Decimal::from(150);
        assert_eq!(product.discounted_price(), Decimal::ZERO);
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let json = r#"{"id":5,"name":"Oak Bench","price":"120.00","availableQuantity":4}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.available_quantity, 4);
        assert_eq!(product.price, Decimal::new(12000, 2));
        assert!(product.image.is_none());
        assert!(!product.has_discount());
    }

    #[test]
    fn test_deserialize_numeric_price() {
        let json = r#"{"id":6,"name":"Stool","price":49.5,"discountPercentage":10}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Decimal::new(495, 1));
        assert!(product.has_discount());
    }
}
