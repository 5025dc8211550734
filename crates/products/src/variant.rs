use serde::{Deserialize, Serialize};

use merchant_core::{CatalogKey, ChoiceKey, Entity, ProductKey, VariantKey};

use crate::inventory::CatalogInventory;
use crate::option::ProductAttribute;

/// Scalar, sellable fields shared by a product (through its master variant)
/// and every generated variant.
///
/// Amounts are in the smallest currency unit (e.g. cents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SellableFields {
    pub name: String,
    pub sku: String,
    pub price: u64,
    pub cost_of_goods: u64,
    pub sale_price: u64,
    pub on_sale: bool,
    pub manufacturer: String,
    pub manufacturer_model_number: String,
    pub weight: Option<f64>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub barcode: String,
    pub available: bool,
    pub track_inventory: bool,
    pub out_of_stock_purchase: bool,
    pub taxable: bool,
    pub shippable: bool,
    pub download: bool,
    pub download_media_id: Option<i64>,
}

impl SellableFields {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            price,
            cost_of_goods: 0,
            sale_price: 0,
            on_sale: false,
            manufacturer: String::new(),
            manufacturer_model_number: String::new(),
            weight: None,
            length: None,
            width: None,
            height: None,
            barcode: String::new(),
            available: true,
            track_inventory: false,
            out_of_stock_purchase: false,
            taxable: true,
            shippable: true,
            download: false,
            download_media_id: None,
        }
    }
}

impl Default for SellableFields {
    fn default() -> Self {
        Self::new(String::new(), String::new(), 0)
    }
}

/// The sellable entity for one attribute tuple, or the product's master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    key: Option<VariantKey>,
    product_key: Option<ProductKey>,
    master: bool,
    fields: SellableFields,
    attributes: Vec<ProductAttribute>,
    catalog_inventories: Vec<CatalogInventory>,
}

impl ProductVariant {
    /// The master variant of a product: no attributes, carries the product's
    /// own sellable fields and catalog placements.
    pub fn master(fields: SellableFields) -> Self {
        Self {
            key: None,
            product_key: None,
            master: true,
            fields,
            attributes: Vec::new(),
            catalog_inventories: Vec::new(),
        }
    }

    /// A non-master variant for the given attribute tuple.
    pub fn with_attributes(
        product_key: Option<ProductKey>,
        fields: SellableFields,
        attributes: Vec<ProductAttribute>,
    ) -> Self {
        Self {
            key: None,
            product_key,
            master: false,
            fields,
            attributes,
            catalog_inventories: Vec::new(),
        }
    }

    pub fn set_key(&mut self, key: VariantKey) {
        self.key = Some(key);
        for inv in &mut self.catalog_inventories {
            inv.set_variant_key(key);
        }
    }

    pub fn product_key(&self) -> Option<ProductKey> {
        self.product_key
    }

    pub fn set_product_key(&mut self, product_key: Option<ProductKey>) {
        self.product_key = product_key;
    }

    pub fn is_master(&self) -> bool {
        self.master
    }

    pub fn fields(&self) -> &SellableFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut SellableFields {
        &mut self.fields
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn sku(&self) -> &str {
        &self.fields.sku
    }

    pub fn on_sale(&self) -> bool {
        self.fields.on_sale
    }

    pub fn attributes(&self) -> &[ProductAttribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<ProductAttribute> {
        &mut self.attributes
    }

    pub fn catalog_inventories(&self) -> &[CatalogInventory] {
        &self.catalog_inventories
    }

    pub fn catalog_inventories_mut(&mut self) -> &mut Vec<CatalogInventory> {
        &mut self.catalog_inventories
    }

    /// Place this variant in a catalog with zeroed counts.
    ///
    /// Returns `false` when the variant is already in that catalog.
    pub fn add_to_catalog_inventory(&mut self, catalog_key: CatalogKey) -> bool {
        if self.catalog_inventory(catalog_key).is_some() {
            return false;
        }
        self.catalog_inventories
            .push(CatalogInventory::new(catalog_key, self.key));
        true
    }

    pub fn remove_from_catalog_inventory(&mut self, catalog_key: CatalogKey) -> Option<CatalogInventory> {
        let idx = self
            .catalog_inventories
            .iter()
            .position(|inv| inv.catalog_key() == catalog_key)?;
        Some(self.catalog_inventories.remove(idx))
    }

    pub fn catalog_inventory(&self, catalog_key: CatalogKey) -> Option<&CatalogInventory> {
        self.catalog_inventories
            .iter()
            .find(|inv| inv.catalog_key() == catalog_key)
    }

    /// Stock across every catalog.
    pub fn total_inventory(&self) -> i64 {
        self.catalog_inventories.iter().map(|inv| i64::from(inv.count)).sum()
    }

    /// Whether the attribute tuple holds exactly this set of choices.
    ///
    /// Order-insensitive; the arity must match.
    pub fn has_attributes<'a, I>(&self, tuple: I) -> bool
    where
        I: IntoIterator<Item = &'a ProductAttribute>,
    {
        let mut count = 0;
        for choice in tuple {
            count += 1;
            if !self.attributes.iter().any(|a| a.same_choice(choice)) {
                return false;
            }
        }
        count == self.attributes.len()
    }

    /// Whether the attribute tuple holds exactly these choice keys.
    pub fn has_choice_keys(&self, keys: &[ChoiceKey]) -> bool {
        keys.len() == self.attributes.len()
            && keys
                .iter()
                .all(|k| self.attributes.iter().any(|a| a.key() == Some(*k)))
    }
}

impl Entity for ProductVariant {
    type Key = VariantKey;

    fn key(&self) -> Option<VariantKey> {
        self.key
    }
}
