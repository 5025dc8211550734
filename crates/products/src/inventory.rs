use serde::{Deserialize, Serialize};

use merchant_core::{CatalogKey, Entity, VariantKey};

/// Stock record of one variant in one catalog.
///
/// Identity is the `(catalog_key, variant_key)` pair; within the owning variant
/// the catalog key alone identifies the placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogInventory {
    catalog_key: CatalogKey,
    variant_key: Option<VariantKey>,
    pub count: i32,
    pub low_count: i32,
    pub location: String,
}

impl CatalogInventory {
    /// New placement with zeroed counts and no location.
    pub fn new(catalog_key: CatalogKey, variant_key: Option<VariantKey>) -> Self {
        Self {
            catalog_key,
            variant_key,
            count: 0,
            low_count: 0,
            location: String::new(),
        }
    }

    pub fn catalog_key(&self) -> CatalogKey {
        self.catalog_key
    }

    pub fn variant_key(&self) -> Option<VariantKey> {
        self.variant_key
    }

    pub fn set_variant_key(&mut self, variant_key: VariantKey) {
        self.variant_key = Some(variant_key);
    }

    /// Stock at or below the low-count threshold.
    pub fn is_low(&self) -> bool {
        self.count <= self.low_count
    }
}

impl Entity for CatalogInventory {
    type Key = CatalogKey;

    fn key(&self) -> Option<CatalogKey> {
        Some(self.catalog_key)
    }
}
