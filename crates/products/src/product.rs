use chrono::{DateTime, Utc};

use merchant_core::{
    CatalogKey, ChoiceKey, DomainError, DomainResult, Entity, OptionKey, ProductKey,
};

use crate::inventory::CatalogInventory;
use crate::option::ProductOption;
use crate::variant::{ProductVariant, SellableFields};

/// Aggregate root: Product.
///
/// The product's own sellable fields and catalog placements live on its master
/// variant, which always exists. `variants` holds the generated, non-master
/// variants (one per live option/choice combination).
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    key: Option<ProductKey>,
    master: ProductVariant,
    options: Vec<ProductOption>,
    variants: Vec<ProductVariant>,
    was_cancelled: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create a product seeded with its master variant. Not persisted.
    pub fn new(name: impl Into<String>, sku: impl Into<String>, price: u64) -> Self {
        Self::from_master(ProductVariant::master(SellableFields::new(name, sku, price)))
    }

    pub fn from_master(master: ProductVariant) -> Self {
        Self {
            key: None,
            master,
            options: Vec::new(),
            variants: Vec::new(),
            was_cancelled: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Assign the product key, propagating it to the master and every variant.
    pub fn set_key(&mut self, key: ProductKey) {
        self.key = Some(key);
        self.master.set_product_key(Some(key));
        for variant in &mut self.variants {
            variant.set_product_key(Some(key));
        }
    }

    pub fn master(&self) -> &ProductVariant {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut ProductVariant {
        &mut self.master
    }

    pub fn fields(&self) -> &SellableFields {
        self.master.fields()
    }

    pub fn fields_mut(&mut self) -> &mut SellableFields {
        self.master.fields_mut()
    }

    pub fn name(&self) -> &str {
        self.master.name()
    }

    pub fn sku(&self) -> &str {
        self.master.sku()
    }

    pub fn price(&self) -> u64 {
        self.master.fields().price
    }

    pub fn on_sale(&self) -> bool {
        self.master.on_sale()
    }

    pub fn set_on_sale(&mut self, on_sale: bool) {
        self.master.fields_mut().on_sale = on_sale;
    }

    pub fn options(&self) -> &[ProductOption] {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Vec<ProductOption> {
        &mut self.options
    }

    pub fn option(&self, key: OptionKey) -> Option<&ProductOption> {
        self.options.iter().find(|o| o.key() == Some(key))
    }

    pub fn option_mut(&mut self, key: OptionKey) -> Option<&mut ProductOption> {
        self.options.iter_mut().find(|o| o.key() == Some(key))
    }

    /// Append an option; an option without explicit sort order goes last.
    pub fn add_option(&mut self, mut option: ProductOption) {
        if option.sort_order == 0 {
            option.sort_order = self.options.len() as i32 + 1;
        }
        self.options.push(option);
    }

    pub fn remove_option(&mut self, key: OptionKey) -> Option<ProductOption> {
        let idx = self.options.iter().position(|o| o.key() == Some(key))?;
        Some(self.options.remove(idx))
    }

    /// Options in sort order (stable for equal sort orders).
    pub fn sorted_options(&self) -> Vec<&ProductOption> {
        let mut sorted: Vec<&ProductOption> = self.options.iter().collect();
        sorted.sort_by_key(|o| o.sort_order);
        sorted
    }

    pub fn variants(&self) -> &[ProductVariant] {
        &self.variants
    }

    pub fn variants_mut(&mut self) -> &mut Vec<ProductVariant> {
        &mut self.variants
    }

    /// Catalog placements of the product itself (held by the master).
    pub fn catalog_inventories(&self) -> &[CatalogInventory] {
        self.master.catalog_inventories()
    }

    pub fn add_to_catalog_inventory(&mut self, catalog_key: CatalogKey) -> bool {
        self.master.add_to_catalog_inventory(catalog_key)
    }

    pub fn remove_from_catalog_inventory(&mut self, catalog_key: CatalogKey) -> Option<CatalogInventory> {
        self.master.remove_from_catalog_inventory(catalog_key)
    }

    /// The variant whose attribute tuple is exactly `choices`.
    pub fn variant_for_purchase(&self, choices: &[ChoiceKey]) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.has_choice_keys(choices))
    }

    /// Aggregate on-sale status.
    ///
    /// Without variants the product's own flag stands; with variants the
    /// product is on sale only if every variant is.
    pub fn on_sale_value(&self) -> bool {
        if self.variants.is_empty() {
            self.on_sale()
        } else {
            self.variants.iter().all(ProductVariant::on_sale)
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.was_cancelled
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.was_cancelled = cancelled;
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Record a persistence timestamp (first call also sets `created_at`).
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.created_at.get_or_insert(at);
        self.updated_at = Some(at);
    }

    /// Check the invariants a product must satisfy before it is persisted.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name().trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.sku().trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if !self.master.is_master() {
            return Err(DomainError::invariant("product master variant is not flagged master"));
        }
        for option in &self.options {
            if option.name.trim().is_empty() {
                return Err(DomainError::validation("option name cannot be empty"));
            }
            if let Some(choice) = option.choices().iter().find(|c| c.sku.is_empty()) {
                return Err(DomainError::validation(format!(
                    "choice '{}' of option '{}' has an empty sku",
                    choice.name, option.name
                )));
            }
        }
        Ok(())
    }
}

impl Entity for Product {
    type Key = ProductKey;

    fn key(&self) -> Option<ProductKey> {
        self.key
    }
}
