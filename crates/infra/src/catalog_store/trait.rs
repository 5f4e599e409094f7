use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use catalog_core::{DomainError, ProductId};
use catalog_products::{NewProduct, Product, ProductFields, ProductPatch, Sku};

/// Result of an upsert keyed by SKU.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Catalog storage error.
///
/// These are **infrastructure errors** as opposed to the domain errors raised
/// while validating input.
///
/// ## Error Categories
///
/// - **NotFound**: the addressed product does not exist
/// - **Conflict**: a uniqueness constraint (the SKU) would be violated
/// - **Constraint**: a value was rejected by a column constraint
/// - **Unavailable**: the backend cannot be reached (connection lost, pool closed).
///   This is the only category that poisons an open transaction.
/// - **Backend**: any other storage failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("product not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the error leaves the surrounding transaction unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound => StoreError::NotFound,
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => StoreError::Constraint(msg),
        }
    }
}

/// One open storage transaction.
///
/// Writes made through a transaction are invisible to other readers until
/// [`CatalogTx::commit`] succeeds. A failed `upsert` leaves the transaction
/// usable unless the returned error [`is_fatal`](StoreError::is_fatal).
#[async_trait]
pub trait CatalogTx: Send {
    /// Whether a product with this SKU exists, as seen by this transaction.
    async fn exists(&mut self, sku: &Sku) -> Result<bool, StoreError>;

    /// Insert-or-update keyed by SKU; every mutable field is overwritten.
    async fn upsert(&mut self, sku: &Sku, fields: &ProductFields) -> Result<UpsertOutcome, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Product catalog persistence.
///
/// ## Implementation Requirements
///
/// - `sku` is unique across the catalog at all times
/// - ids are assigned by the store and never reused for a different SKU
/// - `begin()` returns an isolated transaction; concurrent transactions that
///   touch the same SKU resolve as last-commit-wins
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError>;

    /// All products, ordered by id.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: ProductId) -> Result<Product, StoreError>;

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, StoreError>;

    /// Insert a new product; fails with `Conflict` if the SKU is taken.
    async fn create(&self, product: &NewProduct) -> Result<Product, StoreError>;

    /// Overwrite every attribute (including the SKU) of an existing product.
    async fn replace(&self, id: ProductId, product: &NewProduct) -> Result<Product, StoreError>;

    async fn delete(&self, id: ProductId) -> Result<(), StoreError>;

    /// Partial update: merge `patch` over the stored product, then `replace`.
    async fn patch(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, StoreError> {
        let current = self.get(id).await?;
        let merged = patch.apply_to(&current)?;
        self.replace(id, &merged).await
    }
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        (**self).begin().await
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list().await
    }

    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).get(id).await
    }

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, StoreError> {
        (**self).find_by_sku(sku).await
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, StoreError> {
        (**self).create(product).await
    }

    async fn replace(&self, id: ProductId, product: &NewProduct) -> Result<Product, StoreError> {
        (**self).replace(id, product).await
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }

    async fn patch(&self, id: ProductId, patch: &ProductPatch) -> Result<Product, StoreError> {
        (**self).patch(id, patch).await
    }
}
