//! JSON bodies exchanged with the storefront API.

use oakline_core::{CartLine, Product, ProductId};
use serde::{Deserialize, Serialize};

/// `GET /cart` response.
#[derive(Debug, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: i64,
}

impl CartResponse {
    /// Convert to cart lines, skipping lines with a non-positive quantity.
    pub fn into_lines(self) -> Vec<CartLine> {
        self.items
            .into_iter()
            .filter_map(|item| {
                let quantity = u32::try_from(item.quantity).ok().filter(|q| *q > 0)?;
                Some(CartLine {
                    product: item.product,
                    quantity,
                })
            })
            .collect()
    }
}

/// `POST /cart/items` body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// `GET /products` response. Accepts a bare array or `{"products": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductList {
    Bare(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl ProductList {
    pub fn into_products(self) -> Vec<Product> {
        match self {
            Self::Bare(products) | Self::Wrapped { products } => products,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_response_drops_non_positive_lines() {
        let json = r#"{"items":[
            {"product":{"id":1,"name":"Sofa","price":"999.00"},"quantity":2},
            {"product":{"id":2,"name":"Rug","price":"150.00"},"quantity":0},
            {"product":{"id":3,"name":"Lamp","price":"45.00"},"quantity":-1}
        ]}"#;
        let lines = serde_json::from_str::<CartResponse>(json)
            .unwrap()
            .into_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product.id, ProductId::new(1));
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_empty_cart_response() {
        let lines = serde_json::from_str::<CartResponse>("{}")
            .unwrap()
            .into_lines();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_add_line_request_is_camel_case() {
        let body = serde_json::to_value(AddLineRequest {
            product_id: ProductId::new(8),
            quantity: 3,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"productId": 8, "quantity": 3}));
    }

    #[test]
    fn test_product_list_shapes() {
        let bare = r#"[{"id":1,"name":"Desk","price":"300"}]"#;
        let wrapped = r#"{"products":[{"id":1,"name":"Desk","price":"300"}]}"#;
        for raw in [bare, wrapped] {
            let products = serde_json::from_str::<ProductList>(raw)
                .unwrap()
                .into_products();
            assert_eq!(products.len(), 1);
        }
    }
}
