//! Infrastructure layer: catalog persistence backends.

pub mod catalog_store;

pub use catalog_store::{
    CatalogStore, CatalogTx, InMemoryCatalogStore, PostgresCatalogStore, StoreError, UpsertOutcome,
};
