//! Variant-attribute collaborator.

use merchant_core::Entity;
use merchant_products::{Product, ProductVariant};

use crate::error::StoreError;
use crate::store::UnitOfWork;

/// Keeps a product's variants consistent with its live choices.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProductVariantService;

impl ProductVariantService {
    pub fn new() -> Self {
        Self
    }

    /// Remove, and stage the deletion of, every variant whose attribute tuple
    /// is not a live combination of the product's current choices.
    ///
    /// A tuple is live when each option owns exactly one of its attributes.
    /// When two variants hold the same tuple the first one is kept. Returns
    /// the removed variants.
    pub fn ensure_product_variants_have_attributes(
        &self,
        product: &mut Product,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Vec<ProductVariant>, StoreError> {
        let mut kept: Vec<ProductVariant> = Vec::with_capacity(product.variants().len());
        let mut removed = Vec::new();

        for variant in std::mem::take(product.variants_mut()) {
            let duplicate = kept.iter().any(|k| k.has_attributes(variant.attributes()));
            if duplicate || !is_live(product, &variant) {
                removed.push(variant);
            } else {
                kept.push(variant);
            }
        }
        *product.variants_mut() = kept;

        for variant in &removed {
            uow.delete_variant(variant)?;
        }

        if !removed.is_empty() {
            tracing::debug!(
                product_key = ?product.key(),
                removed = removed.len(),
                "variants without live attributes removed"
            );
        }
        Ok(removed)
    }
}

fn is_live(product: &Product, variant: &ProductVariant) -> bool {
    let options = product.options();
    !options.is_empty()
        && variant.attributes().len() == options.len()
        && options
            .iter()
            .all(|o| variant.attributes().iter().filter(|a| o.owns(a)).count() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryProductStore, ProductStore};
    use merchant_core::{ChoiceKey, OptionKey, ProductKey, VariantKey};
    use merchant_products::{ProductAttribute, ProductOption, reconcile};

    fn persisted_shirt() -> Product {
        let mut product = Product::new("Shirt", "SHIRT", 2500);
        product.set_key(ProductKey::new());
        product.add_option(
            ProductOption::new("Size", true)
                .with_key(OptionKey::new())
                .with_choice(ProductAttribute::new("Small", "S").with_key(ChoiceKey::new()))
                .with_choice(ProductAttribute::new("Large", "L").with_key(ChoiceKey::new())),
        );
        let applied = reconcile(&product).apply(&mut product);
        for idx in applied.created {
            product.variants_mut()[idx].set_key(VariantKey::new());
        }
        product
    }

    #[test]
    fn live_variants_are_untouched() {
        let store = InMemoryProductStore::new();
        let mut product = persisted_shirt();
        let before = product.variants().to_vec();

        let mut uow = store.begin();
        let removed = ProductVariantService::new()
            .ensure_product_variants_have_attributes(&mut product, uow.as_mut())
            .unwrap();

        assert!(removed.is_empty());
        assert_eq!(product.variants(), before.as_slice());
    }

    #[test]
    fn variants_holding_a_removed_choice_are_dropped() {
        let store = InMemoryProductStore::new();
        let mut product = persisted_shirt();
        let large = product.options()[0].choices()[1].key().unwrap();
        let option = product.options()[0].key().unwrap();
        product.option_mut(option).unwrap().remove_choice(large);

        let mut uow = store.begin();
        let removed = ProductVariantService::new()
            .ensure_product_variants_have_attributes(&mut product, uow.as_mut())
            .unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].sku(), "SHIRT-L");
        assert_eq!(product.variants().len(), 1);
        assert_eq!(product.variants()[0].sku(), "SHIRT-S");
    }

    #[test]
    fn duplicate_tuples_keep_the_first_variant() {
        let store = InMemoryProductStore::new();
        let mut product = persisted_shirt();
        let mut twin = product.variants()[0].clone();
        twin.set_key(VariantKey::new());
        product.variants_mut().push(twin.clone());

        let mut uow = store.begin();
        let removed = ProductVariantService::new()
            .ensure_product_variants_have_attributes(&mut product, uow.as_mut())
            .unwrap();

        assert_eq!(removed, vec![twin]);
        assert_eq!(product.variants().len(), 2);
    }
}
