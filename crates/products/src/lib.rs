//! Products domain module.
//!
//! Products, their options and choices, the variants derived from every
//! combination of choices, and the per-catalog inventory placements of each
//! variant. Everything here is deterministic domain logic (no IO, no storage):
//! persistence and locking live in `merchant-infra`.

pub mod combinations;
pub mod display;
pub mod inventory;
pub mod merge;
pub mod option;
pub mod product;
pub mod reconcile;
pub mod variant;

pub use combinations::{AttributeTuple, Combinations, combination_count, combinations};
pub use display::{
    CatalogInventoryDisplay, ProductAttributeDisplay, ProductDisplay, ProductOptionDisplay,
    ProductVariantDisplay,
};
pub use inventory::CatalogInventory;
pub use merge::{MergeReport, MergeRules, merge_collection};
pub use option::{ProductAttribute, ProductOption, derive_sku};
pub use product::Product;
pub use reconcile::{AppliedPlan, ReconcilePlan, reconcile, variant_for_tuple};
pub use variant::{ProductVariant, SellableFields};
