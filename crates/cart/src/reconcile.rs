//! Merge planning for a local cart joining a server-backed cart.
//!
//! Quantities are merged additively: a product in both carts ends up with the
//! sum of both quantities, never the local quantity alone.

use oakline_core::{CartState, ProductId};
use serde::Serialize;

/// How one local line lands in the remote cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MergeKind {
    /// The remote cart has no line for the product yet.
    Insert,
    /// The remote cart already holds `remote_quantity` of the product.
    Increase { remote_quantity: u32 },
}

/// One local line to send to the remote cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeStep {
    pub product_id: ProductId,
    /// Local quantity, sent as an increment.
    pub quantity: u32,
    #[serde(flatten)]
    pub kind: MergeKind,
}

impl MergeStep {
    /// Remote quantity once this step has been applied.
    #[must_use]
    pub const fn merged_quantity(&self) -> u32 {
        match self.kind {
            MergeKind::Insert => self.quantity,
            MergeKind::Increase { remote_quantity } => remote_quantity.saturating_add(self.quantity),
        }
    }
}

/// Plan the merge of `local` into `remote`, in local line order.
#[must_use]
pub fn plan_merge(local: &CartState, remote: &CartState) -> Vec<MergeStep> {
    local
        .lines()
        .iter()
        .map(|line| {
            let kind = remote.line(line.product.id).map_or(MergeKind::Insert, |existing| {
                MergeKind::Increase {
                    remote_quantity: existing.quantity,
                }
            });
            MergeStep {
                product_id: line.product.id,
                quantity: line.quantity,
                kind,
            }
        })
        .collect()
}

/// Outcome of a completed reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub steps: Vec<MergeStep>,
}

impl ReconcileReport {
    /// Total quantity moved from the local cart.
    #[must_use]
    pub fn merged_quantity(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.quantity)).sum()
    }

    /// Number of lines that were new to the remote cart.
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.kind == MergeKind::Insert)
            .count()
    }

    /// Number of lines that increased an existing remote line.
    #[must_use]
    pub fn increased(&self) -> usize {
        self.steps.len() - self.inserted()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use oakline_core::{CartSource, Product};
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::from(10),
            available_quantity: 50,
            image: None,
            discount_percentage: Decimal::ZERO,
        }
    }

    #[test]
    fn test_plan_insert_into_empty_remote() {
        let mut local = CartState::empty(CartSource::Local);
        local.add(product(1), 2);
        let remote = CartState::empty(CartSource::Remote);

        let steps = plan_merge(&local, &remote);
        assert_eq!(
            steps,
            vec![MergeStep {
                product_id: ProductId::new(1),
                quantity: 2,
                kind: MergeKind::Insert,
            }]
        );
        assert_eq!(steps[0].merged_quantity(), 2);
    }

    #[test]
    fn test_plan_is_additive_for_shared_products() {
        let mut local = CartState::empty(CartSource::Local);
        local.add(product(1), 2);
        local.add(product(2), 1);
        let mut remote = CartState::empty(CartSource::Remote);
        remote.add(product(1), 1);

        let steps = plan_merge(&local, &remote);
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[0].kind,
            MergeKind::Increase { remote_quantity: 1 }
        );
        assert_eq!(steps[0].merged_quantity(), 3);
        assert_eq!(steps[1].kind, MergeKind::Insert);

        let report = ReconcileReport { steps };
        assert_eq!(report.merged_quantity(), 3);
        assert_eq!(report.inserted(), 1);
        assert_eq!(report.increased(), 1);
    }

    #[test]
    fn test_plan_empty_local() {
        let local = CartState::empty(CartSource::Local);
        let mut remote = CartState::empty(CartSource::Remote);
        remote.add(product(4), 3);
        assert!(plan_merge(&local, &remote).is_empty());
    }
}
