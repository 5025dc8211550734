//! Display representations and their merge onto domain entities.
//!
//! Displays are the loosely-typed shape edits arrive in (camelCase JSON,
//! every field optional, `null` collections treated as empty). They are never
//! persisted; [`ProductDisplay::merge_into`] and
//! [`ProductVariantDisplay::merge_into`] fold them onto long-lived entities
//! while keeping the identity of every unchanged child.

use serde::{Deserialize, Deserializer, Serialize};

use merchant_core::{
    CatalogKey, ChoiceKey, DomainError, DomainResult, Entity, OptionKey, ProductKey, VariantKey,
};

use crate::inventory::CatalogInventory;
use crate::merge::{MergeReport, MergeRules, merge_collection};
use crate::option::{ProductAttribute, ProductOption, derive_sku};
use crate::product::Product;
use crate::variant::{ProductVariant, SellableFields};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogInventoryDisplay {
    pub catalog_key: Option<CatalogKey>,
    pub product_variant_key: Option<VariantKey>,
    pub count: i32,
    pub low_count: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductAttributeDisplay {
    pub key: Option<ChoiceKey>,
    pub option_key: Option<OptionKey>,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sku: String,
    pub sort_order: i32,
}

impl ProductAttributeDisplay {
    /// The inbound sku, or one derived from the name when it is empty.
    pub fn effective_sku(&self) -> String {
        if self.sku.is_empty() {
            derive_sku(&self.name)
        } else {
            self.sku.clone()
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.effective_sku().is_empty() {
            return Err(DomainError::validation(format!(
                "choice '{}' has no sku and none can be derived from its name",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductOptionDisplay {
    pub key: Option<OptionKey>,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub required: bool,
    pub sort_order: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub choices: Vec<ProductAttributeDisplay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductVariantDisplay {
    pub key: Option<VariantKey>,
    pub product_key: Option<ProductKey>,
    pub master: bool,
    #[serde(flatten)]
    pub fields: SellableFields,
    #[serde(deserialize_with = "null_as_default")]
    pub attributes: Vec<ProductAttributeDisplay>,
    #[serde(deserialize_with = "null_as_default")]
    pub catalog_inventories: Vec<CatalogInventoryDisplay>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDisplay {
    pub key: Option<ProductKey>,
    /// Key of the product's master variant.
    pub product_variant_key: Option<VariantKey>,
    #[serde(flatten)]
    pub fields: SellableFields,
    #[serde(deserialize_with = "null_as_default")]
    pub catalog_inventories: Vec<CatalogInventoryDisplay>,
    #[serde(deserialize_with = "null_as_default")]
    pub product_options: Vec<ProductOptionDisplay>,
    #[serde(deserialize_with = "null_as_default")]
    pub product_variants: Vec<ProductVariantDisplay>,
}

// ---------------------------------------------------------------------------
// Merge rules
// ---------------------------------------------------------------------------

/// Catalog placements, identified by catalog key.
struct InventoryRules {
    owner_key: Option<VariantKey>,
    /// Refuse new placements while the owner has no persisted identity.
    require_owner_identity: bool,
}

impl MergeRules<CatalogInventory> for InventoryRules {
    type Desired = CatalogInventoryDisplay;

    fn desired_key(&self, desired: &CatalogInventoryDisplay) -> Option<CatalogKey> {
        desired.catalog_key
    }

    fn update(&self, desired: &CatalogInventoryDisplay, current: &mut CatalogInventory) -> MergeReport {
        current.count = desired.count;
        current.low_count = desired.low_count;
        current.location = desired.location.clone();
        MergeReport::default()
    }

    fn create(&self, desired: &CatalogInventoryDisplay) -> Option<(CatalogInventory, MergeReport)> {
        let catalog_key = desired.catalog_key?;
        if self.require_owner_identity && self.owner_key.is_none() {
            return None;
        }
        let mut inv = CatalogInventory::new(catalog_key, self.owner_key);
        self.update(desired, &mut inv);
        Some((inv, MergeReport::default()))
    }
}

/// Option choices and variant attributes, identified by choice key.
struct ChoiceRules {
    /// Key of the owning option, used when the inbound choice carries none.
    /// Without either, an existing choice keeps its own.
    option_key: Option<OptionKey>,
}

impl MergeRules<ProductAttribute> for ChoiceRules {
    type Desired = ProductAttributeDisplay;

    fn desired_key(&self, desired: &ProductAttributeDisplay) -> Option<ChoiceKey> {
        desired.key
    }

    fn update(&self, desired: &ProductAttributeDisplay, current: &mut ProductAttribute) -> MergeReport {
        if let Some(key) = desired.key {
            current.set_key(key);
        }
        current.name = desired.name.clone();
        current.sku = desired.effective_sku();
        current.option_key = desired.option_key.or(self.option_key).or(current.option_key);
        current.sort_order = desired.sort_order;
        MergeReport::default()
    }

    fn create(&self, desired: &ProductAttributeDisplay) -> Option<(ProductAttribute, MergeReport)> {
        let mut choice = ProductAttribute::new(desired.name.clone(), desired.effective_sku());
        self.update(desired, &mut choice);
        Some((choice, MergeReport::default()))
    }
}

/// Product options, identified by option key; recurses into choices.
struct OptionRules;

impl MergeRules<ProductOption> for OptionRules {
    type Desired = ProductOptionDisplay;

    fn desired_key(&self, desired: &ProductOptionDisplay) -> Option<OptionKey> {
        desired.key
    }

    fn update(&self, desired: &ProductOptionDisplay, current: &mut ProductOption) -> MergeReport {
        if let Some(key) = desired.key {
            current.set_key(key);
        }
        current.name = desired.name.clone();
        current.required = desired.required;
        current.sort_order = desired.sort_order;

        let rules = ChoiceRules {
            option_key: current.key(),
        };
        merge_collection(current.choices_mut(), &desired.choices, &rules)
    }

    fn create(&self, desired: &ProductOptionDisplay) -> Option<(ProductOption, MergeReport)> {
        let mut option = ProductOption::new(desired.name.clone(), desired.required);
        let nested = self.update(desired, &mut option);
        Some((option, nested))
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

impl ProductDisplay {
    /// Reject inbound data that cannot be merged, before anything is touched.
    pub fn validate(&self) -> DomainResult<()> {
        if self.fields.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.fields.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        for option in &self.product_options {
            if option.name.trim().is_empty() {
                return Err(DomainError::validation("option name cannot be empty"));
            }
            option.choices.iter().try_for_each(ProductAttributeDisplay::validate)?;
        }
        Ok(())
    }

    /// Merge this display onto `destination`.
    ///
    /// Scalars are copied; catalog placements, options and choices are merged
    /// by key (see [`crate::merge`]). Nothing is modified when validation fails.
    pub fn merge_into(&self, destination: &mut Product) -> DomainResult<MergeReport> {
        self.validate()?;

        if let Some(key) = self.key {
            destination.set_key(key);
        }
        *destination.fields_mut() = self.fields.clone();

        let inventory_rules = InventoryRules {
            owner_key: destination.master().key(),
            require_owner_identity: false,
        };
        let mut report = merge_collection(
            destination.master_mut().catalog_inventories_mut(),
            &self.catalog_inventories,
            &inventory_rules,
        );
        report += merge_collection(destination.options_mut(), &self.product_options, &OptionRules);

        tracing::debug!(
            product_key = ?destination.key(),
            removed = report.removed,
            updated = report.updated,
            created = report.created,
            skipped = report.skipped,
            "product display merged"
        );
        Ok(report)
    }

    /// Build a new, unsaved product from this display.
    pub fn to_new_product(&self) -> DomainResult<Product> {
        let mut product = Product::new(self.fields.name.clone(), self.fields.sku.clone(), self.fields.price);
        self.merge_into(&mut product)?;
        Ok(product)
    }

    /// The display variant whose attributes are exactly `choices`.
    pub fn variant_with_attributes(&self, choices: &[ChoiceKey]) -> Option<&ProductVariantDisplay> {
        self.product_variants.iter().find(|v| {
            v.attributes.len() == choices.len()
                && choices.iter().all(|k| v.attributes.iter().any(|a| a.key == Some(*k)))
        })
    }

    /// The product viewed as its master variant (e.g. for adding to a basket).
    pub fn as_master_variant_display(&self) -> ProductVariantDisplay {
        ProductVariantDisplay {
            key: self.product_variant_key,
            product_key: self.key,
            master: true,
            fields: self.fields.clone(),
            attributes: Vec::new(),
            catalog_inventories: self.catalog_inventories.clone(),
        }
    }
}

impl ProductVariantDisplay {
    pub fn validate(&self) -> DomainResult<()> {
        self.attributes.iter().try_for_each(ProductAttributeDisplay::validate)
    }

    /// Merge this display onto `destination`.
    ///
    /// Name and sku are only taken when non-empty. New catalog placements are
    /// skipped while the variant has no persisted identity.
    pub fn merge_into(&self, destination: &mut ProductVariant) -> DomainResult<MergeReport> {
        self.validate()?;

        if let Some(key) = self.key {
            destination.set_key(key);
        }

        let fields = destination.fields_mut();
        let name = std::mem::take(&mut fields.name);
        let sku = std::mem::take(&mut fields.sku);
        *fields = self.fields.clone();
        if fields.name.is_empty() {
            fields.name = name;
        }
        if fields.sku.is_empty() {
            fields.sku = sku;
        }

        if self.product_key.is_some() {
            destination.set_product_key(self.product_key);
        }

        let inventory_rules = InventoryRules {
            owner_key: destination.key(),
            require_owner_identity: true,
        };
        let mut report = merge_collection(
            destination.catalog_inventories_mut(),
            &self.catalog_inventories,
            &inventory_rules,
        );
        report += merge_collection(
            destination.attributes_mut(),
            &self.attributes,
            &ChoiceRules { option_key: None },
        );

        tracing::debug!(
            variant_key = ?destination.key(),
            removed = report.removed,
            created = report.created,
            skipped = report.skipped,
            "variant display merged"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

impl From<&CatalogInventory> for CatalogInventoryDisplay {
    fn from(inv: &CatalogInventory) -> Self {
        Self {
            catalog_key: Some(inv.catalog_key()),
            product_variant_key: inv.variant_key(),
            count: inv.count,
            low_count: inv.low_count,
            location: inv.location.clone(),
        }
    }
}

impl From<&ProductAttribute> for ProductAttributeDisplay {
    fn from(choice: &ProductAttribute) -> Self {
        Self {
            key: choice.key(),
            option_key: choice.option_key,
            name: choice.name.clone(),
            sku: choice.sku.clone(),
            sort_order: choice.sort_order,
        }
    }
}

impl From<&ProductOption> for ProductOptionDisplay {
    fn from(option: &ProductOption) -> Self {
        Self {
            key: option.key(),
            name: option.name.clone(),
            required: option.required,
            sort_order: option.sort_order,
            choices: option.choices().iter().map(Into::into).collect(),
        }
    }
}

impl From<&ProductVariant> for ProductVariantDisplay {
    fn from(variant: &ProductVariant) -> Self {
        Self {
            key: variant.key(),
            product_key: variant.product_key(),
            master: variant.is_master(),
            fields: variant.fields().clone(),
            attributes: variant.attributes().iter().map(Into::into).collect(),
            catalog_inventories: variant.catalog_inventories().iter().map(Into::into).collect(),
        }
    }
}

impl From<&Product> for ProductDisplay {
    fn from(product: &Product) -> Self {
        Self {
            key: product.key(),
            product_variant_key: product.master().key(),
            fields: product.fields().clone(),
            catalog_inventories: product.catalog_inventories().iter().map(Into::into).collect(),
            product_options: product.options().iter().map(Into::into).collect(),
            product_variants: product.variants().iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;

    fn keyed_choice(name: &str, sku: &str) -> ProductAttribute {
        ProductAttribute::new(name, sku).with_key(ChoiceKey::new())
    }

    /// A persisted-looking product: every entity carries a key.
    fn persisted_shirt() -> Product {
        let mut product = Product::new("Shirt", "SHIRT", 2500);
        product.set_key(ProductKey::new());
        product.master_mut().set_key(VariantKey::new());
        product.add_option(
            ProductOption::new("Size", true)
                .with_key(OptionKey::new())
                .with_choice(keyed_choice("Small", "S"))
                .with_choice(keyed_choice("Medium", "M"))
                .with_choice(keyed_choice("Large", "L")),
        );
        product
    }

    #[test]
    fn merge_removes_missing_choices_and_updates_the_rest_in_place() {
        let mut product = persisted_shirt();
        let keys: Vec<ChoiceKey> = product.options()[0]
            .choices()
            .iter()
            .map(|c| c.key().unwrap())
            .collect();

        let mut display = ProductDisplay::from(&product);
        display.product_options[0].choices.remove(1);
        display.product_options[0].choices[0].name = "Petite".to_string();

        let report = display.merge_into(&mut product).unwrap();

        let choices = product.options()[0].choices();
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].key(), Some(keys[0]));
        assert_eq!(choices[0].name, "Petite");
        assert_eq!(choices[1].key(), Some(keys[2]));
        assert_eq!(report.removed, 1);
        assert_eq!(report.created, 0);
    }

    #[test]
    fn merge_derives_missing_choice_sku_from_name() {
        let mut product = persisted_shirt();
        let mut display = ProductDisplay::from(&product);
        display.product_options[0].choices.push(ProductAttributeDisplay {
            name: "Extra Large!".to_string(),
            ..ProductAttributeDisplay::default()
        });

        display.merge_into(&mut product).unwrap();

        let option = &product.options()[0];
        let added = option.choices().last().unwrap();
        assert_eq!(added.sku, "ExtraLarge");
        assert_eq!(added.key(), None);
        assert_eq!(added.option_key, option.key());
    }

    #[test]
    fn merge_rejects_underivable_sku_without_touching_the_product() {
        let mut product = persisted_shirt();
        let before = product.clone();
        let mut display = ProductDisplay::from(&product);
        display.fields.price = 1;
        display.product_options[0].choices.push(ProductAttributeDisplay {
            name: "***".to_string(),
            ..ProductAttributeDisplay::default()
        });

        let err = display.merge_into(&mut product).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(product, before);
    }

    #[test]
    fn merge_removes_options_missing_from_display() {
        let mut product = persisted_shirt();
        product.add_option(
            ProductOption::new("Color", false)
                .with_key(OptionKey::new())
                .with_choice(keyed_choice("Red", "R")),
        );

        let mut display = ProductDisplay::from(&product);
        display.product_options.remove(0);
        display.merge_into(&mut product).unwrap();

        assert_eq!(product.options().len(), 1);
        assert_eq!(product.options()[0].name, "Color");
    }

    #[test]
    fn merge_adds_new_option_with_choices() {
        let mut product = persisted_shirt();
        let mut display = ProductDisplay::from(&product);
        display.product_options.push(ProductOptionDisplay {
            name: "Color".to_string(),
            required: true,
            sort_order: 2,
            choices: vec![
                ProductAttributeDisplay { name: "Red".into(), ..Default::default() },
                ProductAttributeDisplay { name: "Sky Blue".into(), ..Default::default() },
            ],
            ..ProductOptionDisplay::default()
        });

        let report = display.merge_into(&mut product).unwrap();

        assert_eq!(report.created, 3);
        let color = &product.options()[1];
        assert_eq!(color.key(), None);
        let skus: Vec<&str> = color.choices().iter().map(|c| c.sku.as_str()).collect();
        assert_eq!(skus, vec!["Red", "SkyBlue"]);
    }

    #[test]
    fn product_catalog_placements_follow_the_display() {
        let mut product = persisted_shirt();
        let (kept, dropped, added) = (CatalogKey::new(), CatalogKey::new(), CatalogKey::new());
        product.add_to_catalog_inventory(kept);
        product.add_to_catalog_inventory(dropped);

        let mut display = ProductDisplay::from(&product);
        display.catalog_inventories.retain(|c| c.catalog_key != Some(dropped));
        display.catalog_inventories[0].count = 7;
        display.catalog_inventories.push(CatalogInventoryDisplay {
            catalog_key: Some(added),
            count: 3,
            location: "Aisle 4".to_string(),
            ..CatalogInventoryDisplay::default()
        });
        display.catalog_inventories.push(CatalogInventoryDisplay::default());

        let report = display.merge_into(&mut product).unwrap();

        let catalogs: Vec<CatalogKey> =
            product.catalog_inventories().iter().map(|c| c.catalog_key()).collect();
        assert_eq!(catalogs, vec![kept, added]);
        assert_eq!(product.catalog_inventories()[0].count, 7);
        assert_eq!(product.catalog_inventories()[1].location, "Aisle 4");
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn variant_merge_keeps_name_and_sku_when_display_leaves_them_blank() {
        let mut product = persisted_shirt();
        reconcile(&product).apply(&mut product);
        let variant = &mut product.variants_mut()[0];
        let original_sku = variant.sku().to_string();

        let mut display = ProductVariantDisplay::from(&*variant);
        display.fields.name.clear();
        display.fields.sku.clear();
        display.fields.price = 4200;
        display.merge_into(variant).unwrap();

        assert_eq!(variant.sku(), original_sku);
        assert_eq!(variant.name(), "Shirt - Small");
        assert_eq!(variant.fields().price, 4200);
    }

    #[test]
    fn variant_merge_skips_placements_for_unsaved_variant() {
        let mut product = persisted_shirt();
        reconcile(&product).apply(&mut product);
        let variant = &mut product.variants_mut()[0];
        assert!(!variant.has_identity());

        let mut display = ProductVariantDisplay::from(&*variant);
        display.catalog_inventories.push(CatalogInventoryDisplay {
            catalog_key: Some(CatalogKey::new()),
            ..CatalogInventoryDisplay::default()
        });

        let report = display.merge_into(variant).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(variant.catalog_inventories().is_empty());

        variant.set_key(VariantKey::new());
        let report = display.merge_into(variant).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(variant.catalog_inventories()[0].variant_key(), variant.key());
    }

    #[test]
    fn variant_merge_keeps_attribute_option_keys_missing_from_display() {
        let mut product = persisted_shirt();
        reconcile(&product).apply(&mut product);
        let option_key = product.options()[0].key();
        let variant = &mut product.variants_mut()[0];
        assert_eq!(variant.attributes()[0].option_key, option_key);

        let mut display = ProductVariantDisplay::from(&*variant);
        display.attributes[0].option_key = None;
        display.attributes[0].name = "Tiny".to_string();
        display.merge_into(variant).unwrap();

        assert_eq!(variant.attributes()[0].name, "Tiny");
        assert_eq!(variant.attributes()[0].option_key, option_key);
        let small = product.options()[0].choices()[0].clone();
        assert!(product.variants()[0].attributes()[0].same_choice(&small));
    }

    #[test]
    fn loosely_typed_json_with_nulls_is_accepted() {
        let json = r#"{
            "name": "Poster",
            "sku": "POSTER",
            "price": 1500,
            "onSale": true,
            "catalogInventories": null,
            "productOptions": [
                { "name": "Finish", "required": true, "choices": [
                    { "name": "Matte", "sku": null },
                    { "name": "High Gloss" }
                ] }
            ],
            "productVariants": null
        }"#;

        let display: ProductDisplay = serde_json::from_str(json).unwrap();
        assert!(display.catalog_inventories.is_empty());
        assert!(display.fields.on_sale);

        let product = display.to_new_product().unwrap();
        assert_eq!(product.name(), "Poster");
        let skus: Vec<&str> = product.options()[0].choices().iter().map(|c| c.sku.as_str()).collect();
        assert_eq!(skus, vec!["Matte", "HighGloss"]);
    }

    #[test]
    fn variant_with_attributes_matches_exact_key_set() {
        let mut product = persisted_shirt();
        reconcile(&product).apply(&mut product);
        let display = ProductDisplay::from(&product);
        let medium = product.options()[0].choices()[1].key().unwrap();

        let found = display.variant_with_attributes(&[medium]).unwrap();
        assert_eq!(found.fields.sku, "SHIRT-M");
        assert!(display.variant_with_attributes(&[]).is_none());
        assert!(display.variant_with_attributes(&[ChoiceKey::new()]).is_none());
    }

    #[test]
    fn master_variant_display_mirrors_the_product() {
        let product = persisted_shirt();
        let display = ProductDisplay::from(&product);
        let master = display.as_master_variant_display();
        assert!(master.master);
        assert_eq!(master.key, product.master().key());
        assert_eq!(master.product_key, product.key());
        assert_eq!(master.fields.sku, "SHIRT");
    }
}
