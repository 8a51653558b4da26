//! Serialized form of the locally persisted cart.
//!
//! ```json
//! {"version":1,"lines":[{"product":{"id":3,"name":"Armchair","price":"249.00"},"quantity":2}]}
//! ```

use oakline_core::{CartLine, CartSource, CartState};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    lines: &'a [CartLine],
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    version: u32,
    lines: Vec<CartLine>,
}

/// Serialize a cart for local storage.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(cart: &CartState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        lines: cart.lines(),
    })
}

/// Parse a stored snapshot.
///
/// Malformed content, or a snapshot written by an unknown format version,
/// decodes as an empty local cart.
#[must_use]
pub fn decode(raw: &str) -> CartState {
    match serde_json::from_str::<Snapshot>(raw) {
        Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
            CartState::from_lines(CartSource::Local, snapshot.lines)
        }
        Ok(snapshot) => {
            warn!(
                version = snapshot.version,
                "Unsupported cart snapshot version, starting with an empty cart"
            );
            CartState::empty(CartSource::Local)
        }
        Err(e) => {
            warn!(error = %e, "Malformed cart snapshot, starting with an empty cart");
            CartState::empty(CartSource::Local)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use oakline_core::{Product, ProductId};
    use rust_decimal::Decimal;

    use super::*;

    fn table() -> Product {
        Product {
            id: ProductId::new(11),
            name: "Dining Table".to_string(),
            description: "Seats six".to_string(),
            price: Decimal::new(89900, 2),
            available_quantity: 3,
            image: None,
            discount_percentage: Decimal::ZERO,
        }
    }

    #[test]
    fn test_encoded_snapshot_decodes_to_same_lines() {
        let mut cart = CartState::empty(CartSource::Local);
        cart.add(table(), 2);

        let decoded = decode(&encode(&cart).unwrap());
        assert_eq!(decoded, cart);
    }

    #[test]
    fn test_malformed_snapshot_is_empty() {
        assert!(decode("not json").is_empty());
        assert!(decode("{\"lines\":42}").is_empty());
        assert!(decode("").is_empty());
    }

    #[test]
    fn test_unknown_version_is_empty() {
        let raw = r#"{"version":99,"lines":[]}"#;
        assert!(decode(raw).is_empty());
    }

    #[test]
    fn test_zero_quantity_lines_are_dropped() {
        let raw = r#"{"version":1,"lines":[{"product":{"id":1,"name":"Lamp","price":"30"},"quantity":0}]}"#;
        assert!(decode(raw).is_empty());
    }
}
