//! Infrastructure and service error model.

use thiserror::Error;

use merchant_core::DomainError;

/// Storage collaborator failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The entity to delete does not exist in storage.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The unit of work could not be committed; nothing was applied.
    #[error("commit failed: {0}")]
    Commit(String),

    /// A variant was staged without a stored (or staged) owning product.
    #[error("variant {0} has no owning product")]
    MissingOwner(String),
}

/// Error returned by the catalog services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
