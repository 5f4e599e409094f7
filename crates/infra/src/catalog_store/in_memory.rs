use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use catalog_core::ProductId;
use catalog_products::{NewProduct, Product, ProductFields, Sku};

use super::r#trait::{CatalogStore, CatalogTx, StoreError, UpsertOutcome};

#[derive(Debug, Default)]
struct Catalog {
    last_id: i64,
    by_id: BTreeMap<ProductId, Product>,
    by_sku: HashMap<Sku, ProductId>,
}

impl Catalog {
    fn next_id(&mut self) -> ProductId {
        self.last_id += 1;
        ProductId::new(self.last_id)
    }

    /// Apply one keyed upsert; SKU index and id map move together.
    fn upsert(&mut self, sku: &Sku, fields: &ProductFields) -> UpsertOutcome {
        if let Some(id) = self.by_sku.get(sku).copied() {
            self.by_id
                .insert(id, Product::new(id, sku.clone(), fields.clone()));
            UpsertOutcome::Updated
        } else {
            let id = self.next_id();
            self.by_id
                .insert(id, Product::new(id, sku.clone(), fields.clone()));
            self.by_sku.insert(sku.clone(), id);
            UpsertOutcome::Created
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Transactions stage their writes locally and apply
/// them atomically under the write lock on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    inner: Arc<RwLock<Catalog>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        Ok(Box::new(InMemoryTx {
            catalog: self.inner.clone(),
            staged: Vec::new(),
            staged_index: HashMap::new(),
        }))
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let catalog = self.inner.read().map_err(|_| poisoned())?;
        Ok(catalog.by_id.values().cloned().collect())
    }

    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let catalog = self.inner.read().map_err(|_| poisoned())?;
        catalog.by_id.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, StoreError> {
        let catalog = self.inner.read().map_err(|_| poisoned())?;
        Ok(catalog
            .by_sku
            .get(sku)
            .and_then(|id| catalog.by_id.get(id))
            .cloned())
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let mut catalog = self.inner.write().map_err(|_| poisoned())?;
        if catalog.by_sku.contains_key(&product.sku) {
            return Err(StoreError::Conflict(format!(
                "sku '{}' already exists",
                product.sku
            )));
        }
        let id = catalog.next_id();
        let created = Product::new(id, product.sku.clone(), product.fields.clone());
        catalog.by_id.insert(id, created.clone());
        catalog.by_sku.insert(product.sku.clone(), id);
        Ok(created)
    }

    async fn replace(&self, id: ProductId, product: &NewProduct) -> Result<Product, StoreError> {
        let mut catalog = self.inner.write().map_err(|_| poisoned())?;
        let old_sku = match catalog.by_id.get(&id) {
            Some(existing) => existing.sku().clone(),
            None => return Err(StoreError::NotFound),
        };

        if let Some(owner) = catalog.by_sku.get(&product.sku) {
            if *owner != id {
                return Err(StoreError::Conflict(format!(
                    "sku '{}' already exists",
                    product.sku
                )));
            }
        }

        catalog.by_sku.remove(&old_sku);
        catalog.by_sku.insert(product.sku.clone(), id);
        let updated = Product::new(id, product.sku.clone(), product.fields.clone());
        catalog.by_id.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let mut catalog = self.inner.write().map_err(|_| poisoned())?;
        let removed = catalog.by_id.remove(&id).ok_or(StoreError::NotFound)?;
        catalog.by_sku.remove(removed.sku());
        Ok(())
    }
}

/// Transaction over [`InMemoryCatalogStore`]: a private write-set in SKU order
/// of first touch.
#[derive(Debug)]
struct InMemoryTx {
    catalog: Arc<RwLock<Catalog>>,
    staged: Vec<(Sku, ProductFields)>,
    staged_index: HashMap<Sku, usize>,
}

#[async_trait]
impl CatalogTx for InMemoryTx {
    async fn exists(&mut self, sku: &Sku) -> Result<bool, StoreError> {
        if self.staged_index.contains_key(sku) {
            return Ok(true);
        }
        let catalog = self.catalog.read().map_err(|_| poisoned())?;
        Ok(catalog.by_sku.contains_key(sku))
    }

    async fn upsert(&mut self, sku: &Sku, fields: &ProductFields) -> Result<UpsertOutcome, StoreError> {
        let existed = self.exists(sku).await?;

        match self.staged_index.get(sku) {
            Some(&pos) => self.staged[pos].1 = fields.clone(),
            None => {
                self.staged_index.insert(sku.clone(), self.staged.len());
                self.staged.push((sku.clone(), fields.clone()));
            }
        }

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut catalog = self.catalog.write().map_err(|_| poisoned())?;
        for (sku, fields) in &self.staged {
            catalog.upsert(sku, fields);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
