//! Product save/delete pipeline (application-level orchestration).
//!
//! Every mutating call follows the same sequence:
//!
//! ```text
//! validate
//!   ↓
//! before-hook (may veto → product flagged cancelled, nothing else happens)
//!   ↓
//! exclusive lock → unit of work
//!   ↓
//! persist product → reconcile variants → persist created / delete removed
//!   ↓
//! variant-attribute check → persist remaining variants
//!   ↓
//! commit → lock released
//!   ↓
//! after-hook
//! ```
//!
//! A storage failure returns early: the unit of work is dropped uncommitted
//! and the lock is released, but the in-memory product may already carry
//! keys or variants that storage never saw. Callers should re-fetch.

use std::cmp::Ordering;
use std::slice;
use std::sync::Arc;

use merchant_core::{DomainError, Entity, ProductKey, VariantKey};
use merchant_events::{LifecycleHooks, LifecyclePhase};
use merchant_products::{Product, ProductVariant, reconcile};

use crate::config::CatalogConfig;
use crate::error::ServiceResult;
use crate::guard::ConcurrencyGuard;
use crate::sort::{SortDirection, SortField};
use crate::store::{ProductStore, UnitOfWork};
use crate::variant_service::ProductVariantService;

/// Aggregate service for products.
///
/// `ProductService` is `Send + Sync` when its store is, and is meant to be
/// shared behind an `Arc`.
#[derive(Debug)]
pub struct ProductService<S> {
    store: S,
    guard: Arc<ConcurrencyGuard>,
    hooks: LifecycleHooks<Product>,
    variants: ProductVariantService,
    config: CatalogConfig,
}

impl<S> ProductService<S>
where
    S: ProductStore,
{
    /// A service using the process-wide lock and default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            guard: ConcurrencyGuard::shared(),
            hooks: LifecycleHooks::new(),
            variants: ProductVariantService::new(),
            config: CatalogConfig::default(),
        }
    }

    pub fn with_guard(mut self, guard: Arc<ConcurrencyGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hooks(mut self, hooks: LifecycleHooks<Product>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut LifecycleHooks<Product> {
        &mut self.hooks
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Build a new product without persisting it.
    ///
    /// A vetoed creation returns the product flagged cancelled.
    pub fn create_product(&self, name: &str, sku: &str, price: u64) -> ServiceResult<Product> {
        let mut product = Product::new(name, sku, price);
        product.validate()?;

        if self.hooks.raise_before(LifecyclePhase::Create, slice::from_ref(&product)) {
            product.set_cancelled(true);
            return Ok(product);
        }

        self.hooks.raise_after(LifecyclePhase::Create, slice::from_ref(&product));
        Ok(product)
    }

    /// Build a new product and persist it.
    pub fn create_product_with_key(&self, name: &str, sku: &str, price: u64) -> ServiceResult<Product> {
        let mut product = Product::new(name, sku, price);
        product.validate()?;

        if self.hooks.raise_before(LifecyclePhase::Create, slice::from_ref(&product)) {
            product.set_cancelled(true);
            return Ok(product);
        }

        {
            let _lock = self.guard.write();
            let mut uow = self.store.begin();
            uow.add_or_update_product(&mut product)?;
            uow.commit()?;
        }

        tracing::info!(product_key = ?product.key(), sku = product.sku(), "product created");
        self.hooks.raise_after(LifecyclePhase::Create, slice::from_ref(&product));
        Ok(product)
    }

    // -----------------------------------------------------------------------
    // Save / delete
    // -----------------------------------------------------------------------

    /// Persist `product` and bring its variants in line with its options.
    pub fn save(&self, product: &mut Product, raise_events: bool) -> ServiceResult<()> {
        product.validate()?;
        product.set_cancelled(false);

        if raise_events && self.hooks.raise_before(LifecyclePhase::Save, slice::from_ref(product)) {
            product.set_cancelled(true);
            return Ok(());
        }

        let on_sale = product.on_sale_value();
        product.set_on_sale(on_sale);

        {
            let _lock = self.guard.write();
            let mut uow = self.store.begin();
            self.save_in(product, uow.as_mut())?;
            uow.commit()?;
        }

        tracing::info!(
            product_key = ?product.key(),
            variants = product.variants().len(),
            "product saved"
        );
        if raise_events {
            self.hooks.raise_after(LifecyclePhase::Save, slice::from_ref(product));
        }
        Ok(())
    }

    /// [`ProductService::save`] with the configured event default.
    pub fn save_default(&self, product: &mut Product) -> ServiceResult<()> {
        self.save(product, self.config.raise_events_by_default)
    }

    /// Save every product under one lock acquisition and one commit.
    ///
    /// Unlike a single [`ProductService::save`], the collection-level hook
    /// sees every product at once and a veto cancels the whole batch (every
    /// product is flagged). Any failure leaves storage untouched.
    pub fn save_all(&self, products: &mut [Product], raise_events: bool) -> ServiceResult<()> {
        if products.is_empty() {
            return Ok(());
        }
        for product in products.iter_mut() {
            product.validate()?;
            product.set_cancelled(false);
        }

        if raise_events && self.hooks.raise_before(LifecyclePhase::Save, products) {
            products.iter_mut().for_each(|p| p.set_cancelled(true));
            return Ok(());
        }

        for product in products.iter_mut() {
            let on_sale = product.on_sale_value();
            product.set_on_sale(on_sale);
        }

        {
            let _lock = self.guard.write();
            let mut uow = self.store.begin();
            for product in products.iter_mut() {
                self.save_in(product, uow.as_mut())?;
            }
            uow.commit()?;
        }

        tracing::info!(products = products.len(), "products saved");
        if raise_events {
            self.hooks.raise_after(LifecyclePhase::Save, products);
        }
        Ok(())
    }

    /// Delete `product` and every variant it owns.
    pub fn delete(&self, product: &mut Product, raise_events: bool) -> ServiceResult<()> {
        ensure_persisted(product)?;
        product.set_cancelled(false);

        if raise_events && self.hooks.raise_before(LifecyclePhase::Delete, slice::from_ref(product)) {
            product.set_cancelled(true);
            return Ok(());
        }

        {
            let _lock = self.guard.write();
            let mut uow = self.store.begin();
            uow.delete_product(product)?;
            uow.commit()?;
        }

        tracing::info!(product_key = ?product.key(), "product deleted");
        if raise_events {
            self.hooks.raise_after(LifecyclePhase::Delete, slice::from_ref(product));
        }
        Ok(())
    }

    /// [`ProductService::delete`] with the configured event default.
    pub fn delete_default(&self, product: &mut Product) -> ServiceResult<()> {
        self.delete(product, self.config.raise_events_by_default)
    }

    /// Delete every product under one lock acquisition and one commit.
    ///
    /// A veto of the collection-level hook cancels the whole batch.
    pub fn delete_all(&self, products: &mut [Product], raise_events: bool) -> ServiceResult<()> {
        if products.is_empty() {
            return Ok(());
        }
        for product in products.iter_mut() {
            ensure_persisted(product)?;
            product.set_cancelled(false);
        }

        if raise_events && self.hooks.raise_before(LifecyclePhase::Delete, products) {
            products.iter_mut().for_each(|p| p.set_cancelled(true));
            return Ok(());
        }

        {
            let _lock = self.guard.write();
            let mut uow = self.store.begin();
            for product in products.iter() {
                uow.delete_product(product)?;
            }
            uow.commit()?;
        }

        tracing::info!(products = products.len(), "products deleted");
        if raise_events {
            self.hooks.raise_after(LifecyclePhase::Delete, products);
        }
        Ok(())
    }

    /// The locked part of a save. Must be called with the exclusive lock held.
    ///
    /// The in-memory variant set is authoritative: stored variants of the
    /// product that it does not hold (e.g. written from another copy of the
    /// product) are deleted before reconciling.
    fn save_in(&self, product: &mut Product, uow: &mut dyn UnitOfWork) -> ServiceResult<()> {
        let orphaned: Vec<ProductVariant> = match product.key() {
            Some(key) => self
                .store
                .variants_for_product(key)?
                .into_iter()
                .filter(|stored| !product.variants().iter().any(|v| v.key() == stored.key()))
                .collect(),
            None => Vec::new(),
        };
        for variant in &orphaned {
            uow.delete_variant(variant)?;
        }

        uow.add_or_update_product(product)?;

        let applied = reconcile(product).apply(product);
        for variant in &applied.removed {
            uow.delete_variant(variant)?;
        }
        for idx in applied.created.clone() {
            uow.add_or_update_variant(&mut product.variants_mut()[idx])?;
        }

        let stale = self
            .variants
            .ensure_product_variants_have_attributes(product, uow)?;

        for variant in product.variants_mut() {
            uow.add_or_update_variant(variant)?;
        }

        tracing::debug!(
            product_key = ?product.key(),
            created = applied.created.len(),
            removed = applied.removed.len() + stale.len() + orphaned.len(),
            "product staged"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn get_by_key(&self, key: ProductKey) -> ServiceResult<Option<Product>> {
        Ok(self.store.get(key)?)
    }

    pub fn get_by_keys(&self, keys: &[ProductKey]) -> ServiceResult<Vec<Product>> {
        Ok(self.store.get_many(keys)?)
    }

    /// The product whose own (master) sku is `sku`.
    pub fn get_by_sku(&self, sku: &str) -> ServiceResult<Option<Product>> {
        Ok(self.store.find_by_master_sku(sku)?)
    }

    pub fn get_all(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.all()?)
    }

    pub fn count(&self) -> ServiceResult<usize> {
        Ok(self.store.all()?.len())
    }

    /// Every product ordered by `sort_by` (`sku`, `name` or `price`, any
    /// case). An empty field name uses the configured default.
    pub fn list_sorted(&self, sort_by: &str, direction: SortDirection) -> ServiceResult<Vec<Product>> {
        let field = if sort_by.trim().is_empty() {
            self.config.default_sort_field
        } else {
            sort_by.parse::<SortField>()?
        };

        let mut products = self.store.all()?;
        products.sort_by(|a, b| {
            let ord = compare(a, b, field);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        Ok(products)
    }

    /// A variant together with its owning product, read under the shared
    /// lock so no save or delete lands between the two lookups.
    pub fn get_variant_with_product(&self, key: VariantKey) -> ServiceResult<Option<(ProductVariant, Product)>> {
        let _lock = self.guard.read();
        let Some(variant) = self.store.get_variant(key)? else {
            return Ok(None);
        };
        let Some(product_key) = variant.product_key() else {
            return Ok(None);
        };
        Ok(self.store.get(product_key)?.map(|product| (variant, product)))
    }

    pub fn get_variant_by_key(&self, key: VariantKey) -> ServiceResult<Option<ProductVariant>> {
        Ok(self.store.get_variant(key)?)
    }

    pub fn get_variant_by_sku(&self, sku: &str) -> ServiceResult<Option<ProductVariant>> {
        Ok(self.store.find_variant_by_sku(sku)?)
    }

    pub fn get_variants_by_product_key(&self, product_key: ProductKey) -> ServiceResult<Vec<ProductVariant>> {
        Ok(self.store.variants_for_product(product_key)?)
    }

    pub fn sku_exists(&self, sku: &str) -> ServiceResult<bool> {
        Ok(self.store.sku_exists(sku)?)
    }
}

fn ensure_persisted(product: &Product) -> Result<(), DomainError> {
    if product.has_identity() {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "product '{}' has never been saved",
            product.sku()
        )))
    }
}

fn compare(a: &Product, b: &Product, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        SortField::Sku => a.sku().cmp(b.sku()),
        SortField::Price => a.price().cmp(&b.price()),
    }
}
