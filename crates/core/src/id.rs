//! Strongly-typed keys used across the catalog domain.
//!
//! Every persisted entity is identified by a UUID. Entities that have not been
//! persisted yet carry `None` in place of a key; the store assigns one on first
//! write.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Key of a product (the aggregate owning options and variants).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKey(Uuid);

/// Key of a product variant (including the master variant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantKey(Uuid);

/// Key of a product option ("Color", "Size").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionKey(Uuid);

/// Key of an option choice ("Red", "Large").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceKey(Uuid);

/// Key of a catalog (warehouse / stock location grouping).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogKey(Uuid);

macro_rules! impl_uuid_key {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Generate a fresh key.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing keys explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if uuid.is_nil() {
                    return Err(DomainError::invalid_id(format!("{}: nil key", $name)));
                }
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_key!(ProductKey, "ProductKey");
impl_uuid_key!(VariantKey, "VariantKey");
impl_uuid_key!(OptionKey, "OptionKey");
impl_uuid_key!(ChoiceKey, "ChoiceKey");
impl_uuid_key!(CatalogKey, "CatalogKey");
