//! Postgres-backed catalog store.
//!
//! Expects the following table (schema management happens outside this crate):
//!
//! ```sql
//! CREATE TABLE products (
//!     id        BIGSERIAL PRIMARY KEY,
//!     sku       VARCHAR(50)   NOT NULL UNIQUE,
//!     name      VARCHAR(200)  NOT NULL,
//!     category  VARCHAR(100)  NOT NULL,
//!     price     NUMERIC(10,2) NOT NULL CHECK (price >= 0),
//!     stock_qty BIGINT        NOT NULL,
//!     status    VARCHAR(10)   NOT NULL CHECK (status IN ('active', 'inactive'))
//! );
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (check / not-null / out of range / too long) | `23514`, `23502`, `22003`, `22001` | `Constraint` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed, PoolTimedOut, Io, Tls, Protocol | N/A | `Unavailable` |
//! | RowNotFound | N/A | `NotFound` |
//! | Other | N/A | `Backend` |
//!
//! ## Per-row failures inside a transaction
//!
//! A failed statement aborts a PostgreSQL transaction. `upsert` therefore runs
//! each row inside a savepoint and rolls back only that savepoint on failure,
//! so the enclosing transaction keeps accepting rows.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use catalog_core::ProductId;
use catalog_products::{NewProduct, Product, ProductFields, ProductStatus, Sku};

use super::r#trait::{CatalogStore, CatalogTx, StoreError, UpsertOutcome};

const PRODUCT_COLUMNS: &str = "id, sku, name, category, price, stock_qty, status";

/// Postgres-backed catalog store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and shared across
/// request handlers.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresCatalogTx { tx }))
    }

    #[instrument(skip(self), fields(product_count = tracing::field::Empty), err)]
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        Span::current().record("product_count", rows.len());
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self, sku), fields(sku = %sku), err)]
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product_by_sku", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(sku = %product.sku), err)]
    async fn create(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (sku, name, category, price, stock_qty, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.sku.as_str())
        .bind(product.fields.name())
        .bind(product.fields.category())
        .bind(product.fields.price())
        .bind(product.fields.stock_qty())
        .bind(product.fields.status().as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("sku '{}' already exists", product.sku))
            } else {
                map_sqlx_error("create_product", e)
            }
        })?;

        product_from_row(&row)
    }

    #[instrument(skip(self, product), fields(product_id = %id, sku = %product.sku), err)]
    async fn replace(&self, id: ProductId, product: &NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET sku = $2, name = $3, category = $4, price = $5, stock_qty = $6, status = $7
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.get())
        .bind(product.sku.as_str())
        .bind(product.fields.name())
        .bind(product.fields.category())
        .bind(product.fields.price())
        .bind(product.fields.stock_qty())
        .bind(product.fields.status().as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("sku '{}' already exists", product.sku))
            } else {
                map_sqlx_error("replace_product", e)
            }
        })?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// One open PostgreSQL transaction.
struct PostgresCatalogTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PostgresCatalogTx {
    #[instrument(skip(self, sku), fields(sku = %sku), err)]
    async fn exists(&mut self, sku: &Sku) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1) AS present")
            .bind(sku.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("exists", e))?;

        row.try_get::<bool, _>("present")
            .map_err(|e| map_sqlx_error("exists", e))
    }

    #[instrument(skip(self, sku, values), fields(sku = %sku), err)]
    async fn upsert(&mut self, sku: &Sku, values: &ProductFields) -> Result<UpsertOutcome, StoreError> {
        let mut savepoint = sqlx::Connection::begin(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("savepoint", e))?;

        // xmax is 0 only for a freshly inserted tuple.
        let result = sqlx::query(
            r#"
            INSERT INTO products (sku, name, category, price, stock_qty, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (sku)
            DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                price = EXCLUDED.price,
                stock_qty = EXCLUDED.stock_qty,
                status = EXCLUDED.status
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(sku.as_str())
        .bind(values.name())
        .bind(values.category())
        .bind(values.price())
        .bind(values.stock_qty())
        .bind(values.status().as_str())
        .fetch_one(&mut *savepoint)
        .await;

        match result {
            Ok(row) => {
                savepoint
                    .commit()
                    .await
                    .map_err(|e| map_sqlx_error("release_savepoint", e))?;
                let inserted = row
                    .try_get::<bool, _>("inserted")
                    .map_err(|e| map_sqlx_error("upsert_product", e))?;
                Ok(if inserted {
                    UpsertOutcome::Created
                } else {
                    UpsertOutcome::Updated
                })
            }
            Err(e) => {
                savepoint
                    .rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback_savepoint", e))?;
                Err(map_sqlx_error("upsert_product", e))
            }
        }
    }

    #[instrument(skip(self), err)]
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), err)]
    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Backend(format!("failed to decode product row: {e}"));

    let id: i64 = row.try_get("id").map_err(decode)?;
    let sku: String = row.try_get("sku").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let category: String = row.try_get("category").map_err(decode)?;
    let price: Decimal = row.try_get("price").map_err(decode)?;
    let stock_qty: i64 = row.try_get("stock_qty").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    let corrupt = |e: catalog_core::DomainError| {
        StoreError::Backend(format!("stored product {id} is invalid: {e}"))
    };
    let sku = Sku::parse(&sku).map_err(corrupt)?;
    let status = status.parse::<ProductStatus>().map_err(corrupt)?;
    let fields = ProductFields::new(&name, &category, price, stock_qty, status).map_err(corrupt)?;

    Ok(Product::new(ProductId::new(id), sku, fields))
}

/// Map SQLx errors to `StoreError`, keyed on SQLSTATE where available.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") | Some("23502") | Some("22003") | Some("22001") => {
                    StoreError::Constraint(msg)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {}: {}", operation, e)),
        sqlx::Error::Protocol(msg) => {
            StoreError::Unavailable(format!("protocol error in {}: {}", operation, msg))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
