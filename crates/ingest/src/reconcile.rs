//! Applies a file's clean rows to the catalog inside one transaction.

use catalog_infra::{CatalogStore, StoreError, UpsertOutcome};

use crate::row::CleanRow;

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created { sku: String },
    Updated { sku: String },
    Failed { sku: String, cause: String },
}

impl RowOutcome {
    pub fn sku(&self) -> &str {
        match self {
            RowOutcome::Created { sku } | RowOutcome::Updated { sku } | RowOutcome::Failed { sku, .. } => sku,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, RowOutcome::Failed { .. })
    }

    /// Per-row diagnostic, for failures only.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            RowOutcome::Failed { sku, cause } => Some(format!("Failed to save SKU {sku}: {cause}")),
            _ => None,
        }
    }
}

/// Result of reconciling one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcomes: Vec<RowOutcome>,
    /// Set when the transaction could not be completed; nothing was committed.
    pub aborted: Option<StoreError>,
    /// Set when rolling back an aborted transaction failed as well.
    pub rollback_failed: Option<StoreError>,
}

impl Reconciliation {
    /// Rows created or updated, counting only committed work.
    pub fn processed(&self) -> usize {
        if self.aborted.is_some() {
            return 0;
        }
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = String> + '_ {
        self.outcomes.iter().filter_map(RowOutcome::failure_message)
    }

    /// Whole-file diagnostic when the transaction was aborted.
    pub fn abort_message(&self) -> Option<String> {
        let aborted = self.aborted.as_ref()?;
        Some(match &self.rollback_failed {
            Some(rollback) => format!("Transaction aborted: {aborted} (rollback failed: {rollback})"),
            None => format!("Transaction aborted: {aborted}"),
        })
    }
}

/// Upsert every row by SKU, in order, within one transaction.
///
/// A row that violates a domain constraint or is rejected by the store is
/// recorded as failed and the remaining rows continue. A fatal store error
/// (see [`StoreError::is_fatal`]) or a failed commit rolls back the whole
/// file.
pub async fn reconcile<S>(store: &S, rows: &[CleanRow]) -> Reconciliation
where
    S: CatalogStore + ?Sized,
{
    let mut outcomes = Vec::with_capacity(rows.len());
    if rows.is_empty() {
        return Reconciliation {
            outcomes,
            aborted: None,
            rollback_failed: None,
        };
    }

    let mut tx = match store.begin().await {
        Ok(tx) => tx,
        Err(e) => {
            return Reconciliation {
                outcomes,
                aborted: Some(e),
                rollback_failed: None,
            };
        }
    };

    for row in rows {
        let (sku, fields) = match row.to_product() {
            Ok(parts) => parts,
            Err(e) => {
                outcomes.push(RowOutcome::Failed {
                    sku: row.sku.clone(),
                    cause: e.to_string(),
                });
                continue;
            }
        };

        let outcome = match tx.upsert(&sku, &fields).await {
            Ok(UpsertOutcome::Created) => RowOutcome::Created { sku: row.sku.clone() },
            Ok(UpsertOutcome::Updated) => RowOutcome::Updated { sku: row.sku.clone() },
            Err(e) if e.is_fatal() => {
                return Reconciliation {
                    outcomes,
                    aborted: Some(e),
                    rollback_failed: tx.rollback().await.err(),
                };
            }
            Err(e) => RowOutcome::Failed {
                sku: row.sku.clone(),
                cause: e.to_string(),
            },
        };
        outcomes.push(outcome);
    }

    let aborted = tx.commit().await.err();
    Reconciliation {
        outcomes,
        aborted,
        rollback_failed: None,
    }
}
