//! Infrastructure layer: storage, locking, configuration and the product
//! services that orchestrate them.

pub mod config;
pub mod error;
pub mod guard;
pub mod product_service;
pub mod sort;
pub mod store;
pub mod variant_service;


pub use config::CatalogConfig;
pub use error::{ServiceError, ServiceResult, StoreError};
pub use guard::ConcurrencyGuard;
pub use product_service::ProductService;
pub use sort::{SortDirection, SortField};
pub use store::{InMemoryProductStore, ProductStore, UnitOfWork};
pub use variant_service::ProductVariantService;
