//! Storage collaborator: unit-of-work persistence for products and variants.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;

use merchant_core::{ChoiceKey, Entity, OptionKey, ProductKey, VariantKey};
use merchant_products::{Product, ProductVariant};

use crate::error::StoreError;

/// Read side of product storage plus a factory for units of work.
///
/// Reads serve committed state only; staged changes are invisible until
/// [`UnitOfWork::commit`] returns.
pub trait ProductStore: Send + Sync {
    /// Open a unit of work. Dropping it without committing discards every
    /// staged change.
    fn begin(&self) -> Box<dyn UnitOfWork>;

    /// A product with its variants attached.
    fn get(&self, key: ProductKey) -> Result<Option<Product>, StoreError>;
    /// Products for every key that exists; missing keys are skipped.
    fn get_many(&self, keys: &[ProductKey]) -> Result<Vec<Product>, StoreError>;
    fn all(&self) -> Result<Vec<Product>, StoreError>;
    /// The product whose master variant carries `sku`.
    fn find_by_master_sku(&self, sku: &str) -> Result<Option<Product>, StoreError>;

    /// Any variant, master variants included.
    fn get_variant(&self, key: VariantKey) -> Result<Option<ProductVariant>, StoreError>;
    fn find_variant_by_sku(&self, sku: &str) -> Result<Option<ProductVariant>, StoreError>;
    /// The non-master variants of a product.
    fn variants_for_product(&self, product_key: ProductKey) -> Result<Vec<ProductVariant>, StoreError>;
    /// Whether any product or variant uses `sku`.
    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn begin(&self) -> Box<dyn UnitOfWork> {
        (**self).begin()
    }

    fn get(&self, key: ProductKey) -> Result<Option<Product>, StoreError> {
        (**self).get(key)
    }

    fn get_many(&self, keys: &[ProductKey]) -> Result<Vec<Product>, StoreError> {
        (**self).get_many(keys)
    }

    fn all(&self) -> Result<Vec<Product>, StoreError> {
        (**self).all()
    }

    fn find_by_master_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        (**self).find_by_master_sku(sku)
    }

    fn get_variant(&self, key: VariantKey) -> Result<Option<ProductVariant>, StoreError> {
        (**self).get_variant(key)
    }

    fn find_variant_by_sku(&self, sku: &str) -> Result<Option<ProductVariant>, StoreError> {
        (**self).find_variant_by_sku(sku)
    }

    fn variants_for_product(&self, product_key: ProductKey) -> Result<Vec<ProductVariant>, StoreError> {
        (**self).variants_for_product(product_key)
    }

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError> {
        (**self).sku_exists(sku)
    }
}

/// A batch of staged writes committed (or discarded) as one.
///
/// Staging assigns persisted identity: entities without a key get one, and
/// the key is written back into the caller's entity immediately.
pub trait UnitOfWork: Send {
    /// Stage an insert or update of the product record (options, choices,
    /// master variant). Variants are staged separately.
    fn add_or_update_product(&mut self, product: &mut Product) -> Result<(), StoreError>;
    /// Stage deletion of a product and every variant it owns.
    fn delete_product(&mut self, product: &Product) -> Result<(), StoreError>;
    fn add_or_update_variant(&mut self, variant: &mut ProductVariant) -> Result<(), StoreError>;
    /// Stage deletion of a variant. A variant that was never persisted is
    /// ignored.
    fn delete_variant(&mut self, variant: &ProductVariant) -> Result<(), StoreError>;
    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
enum StagedOp {
    UpsertProduct(Product),
    DeleteProduct(ProductKey),
    UpsertVariant(ProductVariant),
    DeleteVariant(VariantKey),
}

/// Committed state. Product records never carry their variants.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    products: Vec<Product>,
    variants: Vec<ProductVariant>,
}

impl Snapshot {
    fn assemble(&self, record: &Product) -> Product {
        let mut product = record.clone();
        product.set_cancelled(false);
        *product.variants_mut() = self
            .variants
            .iter()
            .filter(|v| v.product_key() == record.key())
            .cloned()
            .collect();
        product
    }

    fn apply(&mut self, op: StagedOp) -> Result<(), StoreError> {
        match op {
            StagedOp::UpsertProduct(record) => {
                match self.products.iter_mut().find(|p| p.key() == record.key()) {
                    Some(existing) => *existing = record,
                    None => self.products.push(record),
                }
            }
            StagedOp::DeleteProduct(key) => {
                let before = self.products.len();
                self.products.retain(|p| p.key() != Some(key));
                if self.products.len() == before {
                    return Err(StoreError::NotFound {
                        entity: "product",
                        key: key.to_string(),
                    });
                }
                self.variants.retain(|v| v.product_key() != Some(key));
            }
            StagedOp::UpsertVariant(variant) => {
                let owner = variant.product_key();
                if !self.products.iter().any(|p| owner.is_some() && p.key() == owner) {
                    return Err(StoreError::MissingOwner(variant.sku().to_string()));
                }
                match self.variants.iter_mut().find(|v| v.key() == variant.key()) {
                    Some(existing) => *existing = variant,
                    None => self.variants.push(variant),
                }
            }
            StagedOp::DeleteVariant(key) => {
                self.variants.retain(|v| v.key() != Some(key));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: RwLock<Snapshot>,
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

/// In-memory product store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    shared: Arc<Shared>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail without applying anything.
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        // Commits swap in a fully built snapshot, so a poisoned lock still
        // guards consistent state.
        let state = self.shared.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}

impl ProductStore for InMemoryProductStore {
    fn begin(&self) -> Box<dyn UnitOfWork> {
        Box::new(InMemoryUnitOfWork {
            shared: self.shared.clone(),
            staged: Vec::new(),
        })
    }

    fn get(&self, key: ProductKey) -> Result<Option<Product>, StoreError> {
        Ok(self.read(|s| {
            s.products
                .iter()
                .find(|p| p.key() == Some(key))
                .map(|p| s.assemble(p))
        }))
    }

    fn get_many(&self, keys: &[ProductKey]) -> Result<Vec<Product>, StoreError> {
        Ok(self.read(|s| {
            keys.iter()
                .filter_map(|k| s.products.iter().find(|p| p.key() == Some(*k)))
                .map(|p| s.assemble(p))
                .collect()
        }))
    }

    fn all(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read(|s| s.products.iter().map(|p| s.assemble(p)).collect()))
    }

    fn find_by_master_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.read(|s| {
            s.products
                .iter()
                .find(|p| p.sku() == sku)
                .map(|p| s.assemble(p))
        }))
    }

    fn get_variant(&self, key: VariantKey) -> Result<Option<ProductVariant>, StoreError> {
        Ok(self.read(|s| {
            s.products
                .iter()
                .map(Product::master)
                .chain(&s.variants)
                .find(|v| v.key() == Some(key))
                .cloned()
        }))
    }

    fn find_variant_by_sku(&self, sku: &str) -> Result<Option<ProductVariant>, StoreError> {
        Ok(self.read(|s| {
            s.products
                .iter()
                .map(Product::master)
                .chain(&s.variants)
                .find(|v| v.sku() == sku)
                .cloned()
        }))
    }

    fn variants_for_product(&self, product_key: ProductKey) -> Result<Vec<ProductVariant>, StoreError> {
        Ok(self.read(|s| {
            s.variants
                .iter()
                .filter(|v| v.product_key() == Some(product_key))
                .cloned()
                .collect()
        }))
    }

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError> {
        Ok(self.read(|s| {
            s.products.iter().any(|p| p.sku() == sku) || s.variants.iter().any(|v| v.sku() == sku)
        }))
    }
}

struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    staged: Vec<StagedOp>,
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn add_or_update_product(&mut self, product: &mut Product) -> Result<(), StoreError> {
        if product.key().is_none() {
            product.set_key(ProductKey::new());
        }
        if product.master().key().is_none() {
            product.master_mut().set_key(VariantKey::new());
        }
        for option in product.options_mut() {
            if option.key().is_none() {
                option.set_key(OptionKey::new());
            }
            let option_key = option.key();
            for choice in option.choices_mut() {
                if choice.key().is_none() {
                    choice.set_key(ChoiceKey::new());
                }
                choice.option_key = option_key;
            }
        }
        product.touch(Utc::now());

        let mut record = product.clone();
        record.variants_mut().clear();
        record.set_cancelled(false);
        self.staged.push(StagedOp::UpsertProduct(record));
        Ok(())
    }

    fn delete_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let key = product.key().ok_or_else(|| StoreError::NotFound {
            entity: "product",
            key: product.sku().to_string(),
        })?;
        self.staged.push(StagedOp::DeleteProduct(key));
        Ok(())
    }

    fn add_or_update_variant(&mut self, variant: &mut ProductVariant) -> Result<(), StoreError> {
        if variant.product_key().is_none() {
            return Err(StoreError::MissingOwner(variant.sku().to_string()));
        }
        if variant.key().is_none() {
            variant.set_key(VariantKey::new());
        }
        self.staged.push(StagedOp::UpsertVariant(variant.clone()));
        Ok(())
    }

    fn delete_variant(&mut self, variant: &ProductVariant) -> Result<(), StoreError> {
        if let Some(key) = variant.key() {
            self.staged.push(StagedOp::DeleteVariant(key));
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryUnitOfWork { shared, staged } = *self;

        if shared.fail_next_commit.swap(false, Ordering::SeqCst) {
            tracing::warn!(staged = staged.len(), "injected commit failure");
            return Err(StoreError::Commit("injected failure".to_string()));
        }

        let mut state = shared.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = state.clone();
        let count = staged.len();
        for op in staged {
            next.apply(op)?;
        }
        *state = next;
        shared.commits.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(staged = count, "unit of work committed");
        Ok(())
    }
}
