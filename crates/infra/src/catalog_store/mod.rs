//! Product catalog storage boundary.
//!
//! This module defines the storage abstraction the ingestion pipeline and the
//! CRUD surface talk to, plus an in-memory backend for tests/dev and a
//! PostgreSQL backend for production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use r#trait::{CatalogStore, CatalogTx, StoreError, UpsertOutcome};
