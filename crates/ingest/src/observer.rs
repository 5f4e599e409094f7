//! Pipeline events and their sinks.
//!
//! The pipeline itself never logs; it reports what happened to an
//! [`IngestObserver`]. [`TracingObserver`] turns events into structured
//! `tracing` records.

use catalog_infra::StoreError;

use crate::dedup::DuplicateNotice;
use crate::error::{ReadError, StructuralError};
use crate::reconcile::RowOutcome;
use crate::validate::RowIssue;

#[derive(Debug)]
pub enum IngestEvent<'a> {
    FileStarted { file: &'a str },
    ReadFailed { file: &'a str, error: &'a ReadError },
    FileRejected { file: &'a str, error: &'a StructuralError },
    RowsDropped { file: &'a str, issue: &'a RowIssue },
    DuplicatesRemoved { file: &'a str, notice: &'a DuplicateNotice },
    RowReconciled { file: &'a str, outcome: &'a RowOutcome },
    TransactionAborted {
        file: &'a str,
        error: &'a StoreError,
        /// Present when the rollback after the abort failed too.
        rollback: Option<&'a StoreError>,
    },
    FileCompleted { file: &'a str, processed: usize, errors: usize },
}

pub trait IngestObserver: Send + Sync {
    fn on_event(&self, event: &IngestEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IngestObserver for NoopObserver {
    fn on_event(&self, _event: &IngestEvent<'_>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IngestObserver for TracingObserver {
    fn on_event(&self, event: &IngestEvent<'_>) {
        match event {
            IngestEvent::FileStarted { file } => {
                tracing::info!(file = %file, "ingest.file.started");
            }
            IngestEvent::ReadFailed { file, error } => {
                tracing::error!(file = %file, error = %error, "ingest.file.read_failed");
            }
            IngestEvent::FileRejected { file, error } => {
                tracing::warn!(file = %file, error = %error, "ingest.file.rejected");
            }
            IngestEvent::RowsDropped { file, issue } => {
                tracing::warn!(file = %file, rows = ?issue.rows(), issue = %issue, "ingest.rows.dropped");
            }
            IngestEvent::DuplicatesRemoved { file, notice } => {
                tracing::info!(file = %file, skus = ?notice.skus, "ingest.rows.deduplicated");
            }
            IngestEvent::RowReconciled { file, outcome } => match outcome {
                RowOutcome::Created { sku } => {
                    tracing::info!(file = %file, sku = %sku, "ingest.row.created");
                }
                RowOutcome::Updated { sku } => {
                    tracing::info!(file = %file, sku = %sku, "ingest.row.updated");
                }
                RowOutcome::Failed { sku, cause } => {
                    tracing::error!(file = %file, sku = %sku, cause = %cause, "ingest.row.failed");
                }
            },
            IngestEvent::TransactionAborted {
                file,
                error,
                rollback,
            } => match rollback {
                Some(rollback) => {
                    tracing::error!(file = %file, error = %error, rollback_error = %rollback, "ingest.file.aborted");
                }
                None => {
                    tracing::error!(file = %file, error = %error, "ingest.file.aborted");
                }
            },
            IngestEvent::FileCompleted {
                file,
                processed,
                errors,
            } => {
                tracing::info!(file = %file, processed, errors, "ingest.file.completed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn logged(event: IngestEvent<'_>) -> String {
        let buf = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buf.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || TracingObserver.on_event(&event));
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn row_outcomes_use_event_names() {
        let created = RowOutcome::Created { sku: "A1".into() };
        let line = logged(IngestEvent::RowReconciled {
            file: "a.csv",
            outcome: &created,
        });
        assert!(line.contains("ingest.row.created"), "{line}");
        assert!(line.contains("sku=A1"), "{line}");

        let updated = RowOutcome::Updated { sku: "B2".into() };
        let line = logged(IngestEvent::RowReconciled {
            file: "a.csv",
            outcome: &updated,
        });
        assert!(line.contains("ingest.row.updated"), "{line}");
    }

    #[test]
    fn abort_carries_the_rollback_error() {
        let error = StoreError::Unavailable("connection reset".into());
        let rollback = StoreError::Unavailable("broken pipe".into());
        let line = logged(IngestEvent::TransactionAborted {
            file: "a.csv",
            error: &error,
            rollback: Some(&rollback),
        });
        assert!(line.contains("ingest.file.aborted"), "{line}");
        assert!(line.contains("rollback_error=storage unavailable: broken pipe"), "{line}");
    }

    #[test]
    fn noop_observer_logs_nothing() {
        let buf = Captured::default();
        let subscriber = tracing_subscriber::fmt().with_writer(buf.clone()).finish();
        let created = RowOutcome::Created { sku: "A1".into() };
        tracing::subscriber::with_default(subscriber, || {
            NoopObserver.on_event(&IngestEvent::RowReconciled {
                file: "a.csv",
                outcome: &created,
            })
        });
        assert!(buf.0.lock().unwrap().is_empty());
    }
}
