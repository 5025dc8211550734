//! Variant reconciliation.
//!
//! Makes a product's variant collection match its option/choice
//! configuration: one variant per live combination, none with a stale
//! attribute arity. Planning is pure; [`ReconcilePlan::apply`] mutates the
//! in-memory product and hands the removed/created variants back to the
//! caller for persistence.

use std::ops::Range;

use merchant_core::Entity;

use crate::combinations::{AttributeTuple, combinations};
use crate::product::Product;
use crate::variant::ProductVariant;

/// Variants to delete and tuples that still need a variant.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub to_delete: Vec<ProductVariant>,
    pub to_create: Vec<AttributeTuple>,
}

/// Result of applying a [`ReconcilePlan`] to a product.
#[derive(Debug, Clone, Default)]
pub struct AppliedPlan {
    /// Variants taken out of the product (to be deleted from storage).
    pub removed: Vec<ProductVariant>,
    /// Indices into `product.variants()` of the newly created variants.
    pub created: Range<usize>,
}

/// Compute which variants are orphaned and which combinations are missing.
pub fn reconcile(product: &Product) -> ReconcilePlan {
    let expected_arity = product.options().len();

    let (stale, live): (Vec<&ProductVariant>, Vec<&ProductVariant>) = product
        .variants()
        .iter()
        .partition(|v| v.attributes().len() != expected_arity);

    let to_create = combinations(product.options())
        .filter(|tuple| !live.iter().any(|v| v.has_attributes(tuple.iter().copied())))
        .map(AttributeTuple::from)
        .collect();

    ReconcilePlan {
        to_delete: stale.into_iter().cloned().collect(),
        to_create,
    }
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }

    /// Remove the orphaned variants from `product` and append one new variant
    /// per missing tuple.
    pub fn apply(self, product: &mut Product) -> AppliedPlan {
        let mut removed = Vec::with_capacity(self.to_delete.len());
        for doomed in &self.to_delete {
            if let Some(idx) = product.variants().iter().position(|v| same_variant(v, doomed)) {
                removed.push(product.variants_mut().remove(idx));
            }
        }

        let start = product.variants().len();
        for tuple in self.to_create {
            let variant = variant_for_tuple(product, tuple);
            product.variants_mut().push(variant);
        }
        let created = start..product.variants().len();

        tracing::debug!(
            product_key = ?product.key(),
            removed = removed.len(),
            created = created.len(),
            "variants reconciled"
        );

        AppliedPlan { removed, created }
    }
}

/// Build the variant for `tuple`.
///
/// The variant inherits the product's sellable fields, is named after the
/// product and its choices, and is placed (with zeroed counts) in every catalog
/// the product participates in.
pub fn variant_for_tuple(product: &Product, tuple: AttributeTuple) -> ProductVariant {
    let choices = tuple.into_choices();

    let mut fields = product.fields().clone();
    fields.name = format!(
        "{} - {}",
        product.name(),
        choices.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(" - ")
    );
    fields.sku = format!(
        "{}-{}",
        product.sku(),
        choices.iter().map(|c| c.sku.as_str()).collect::<Vec<_>>().join("-")
    );

    let mut variant = ProductVariant::with_attributes(product.key(), fields, choices);
    for inv in product.catalog_inventories() {
        variant.add_to_catalog_inventory(inv.catalog_key());
    }
    variant
}

fn same_variant(a: &ProductVariant, b: &ProductVariant) -> bool {
    match (a.key(), b.key()) {
        (Some(x), Some(y)) => x == y,
        _ => a.sku() == b.sku() && a.attributes() == b.attributes(),
    }
}
