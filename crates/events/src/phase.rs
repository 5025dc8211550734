/// A mutation phase that raises a before/after hook pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// A new entity is being constructed (`Creating` / `Created`).
    Create,
    /// An entity is being persisted (`Saving` / `Saved`).
    Save,
    /// An entity is being removed (`Deleting` / `Deleted`).
    Delete,
}

impl LifecyclePhase {
    /// Stable name of the cancellable hook (e.g. "products.product.saving").
    pub fn before_name(self) -> &'static str {
        match self {
            LifecyclePhase::Create => "products.product.creating",
            LifecyclePhase::Save => "products.product.saving",
            LifecyclePhase::Delete => "products.product.deleting",
        }
    }

    /// Stable name of the notification hook (e.g. "products.product.saved").
    pub fn after_name(self) -> &'static str {
        match self {
            LifecyclePhase::Create => "products.product.created",
            LifecyclePhase::Save => "products.product.saved",
            LifecyclePhase::Delete => "products.product.deleted",
        }
    }
}
