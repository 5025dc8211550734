//! Configuration loading and representation.

use serde::Deserialize;

use crate::sort::SortField;

pub const ENV_DEFAULT_SORT: &str = "MERCHANT_DEFAULT_SORT";
pub const ENV_RAISE_EVENTS: &str = "MERCHANT_RAISE_EVENTS";

/// Catalog service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Sort field used when a listing does not name one.
    pub default_sort_field: SortField,
    /// Whether lifecycle hooks are raised by the `*_default` service calls.
    pub raise_events_by_default: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_sort_field: SortField::Name,
            raise_events_by_default: true,
        }
    }
}

impl CatalogConfig {
    /// Load from the process environment. Malformed values are logged and
    /// left at their defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = get(ENV_DEFAULT_SORT) {
            match raw.parse::<SortField>() {
                Ok(field) => config.default_sort_field = field,
                Err(err) => tracing::warn!(var = ENV_DEFAULT_SORT, value = %raw, error = %err, "ignoring malformed setting"),
            }
        }

        if let Some(raw) = get(ENV_RAISE_EVENTS) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.raise_events_by_default = true,
                "0" | "false" | "no" | "off" => config.raise_events_by_default = false,
                _ => tracing::warn!(var = ENV_RAISE_EVENTS, value = %raw, "ignoring malformed setting"),
            }
        }

        config
    }
}
