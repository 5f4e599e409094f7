//! Batch orchestration: runs every uploaded file through
//! read → validate → dedup → reconcile and folds the results into a report.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use catalog_infra::CatalogStore;

use crate::dedup::resolve_duplicates;
use crate::error::{IngestError, ReadError};
use crate::observer::{IngestEvent, IngestObserver, TracingObserver};
use crate::reader::{FileFormat, RowSet, TabularReader};
use crate::reconcile::reconcile;
use crate::validate::validate;

/// One uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Per-file summary returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    pub file: String,
    pub processed: usize,
    pub errors: Vec<String>,
}

impl FileResult {
    fn failed(file: &str, error: String) -> Self {
        Self {
            file: file.to_string(),
            processed: 0,
            errors: vec![error],
        }
    }
}

/// One [`FileResult`] per uploaded file, in upload order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileResult>,
}

/// Runs upload batches against a catalog store.
pub struct Ingestor<S> {
    store: S,
    reader: TabularReader,
    observer: Arc<dyn IngestObserver>,
}

impl<S> Ingestor<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            reader: TabularReader::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_reader(mut self, reader: TabularReader) -> Self {
        self.reader = reader;
        self
    }

    /// Process `files` sequentially. Each file is independent: its failure
    /// never affects another file's result or committed rows.
    #[instrument(skip(self, files), fields(files = files.len()), err)]
    pub async fn ingest_batch(&self, files: &[UploadedFile]) -> Result<BatchReport, IngestError> {
        if files.is_empty() {
            return Err(IngestError::NoFiles);
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            results.push(self.ingest_file(file).await);
        }
        Ok(BatchReport { files: results })
    }

    /// Process a single file. Never fails; problems become diagnostics.
    pub async fn ingest_file(&self, file: &UploadedFile) -> FileResult {
        let name = file.name.as_str();
        self.emit(IngestEvent::FileStarted { file: name });

        let set = match self.read(file).await {
            Ok(set) => set,
            Err(error) => {
                self.emit(IngestEvent::ReadFailed { file: name, error: &error });
                return self.finish(FileResult::failed(name, format!("Failed to read file: {error}")));
            }
        };

        let validated = match validate(&set) {
            Ok(v) => v,
            Err(error) => {
                self.emit(IngestEvent::FileRejected { file: name, error: &error });
                return self.finish(FileResult::failed(name, error.to_string()));
            }
        };

        let mut errors = Vec::new();
        for issue in &validated.issues {
            self.emit(IngestEvent::RowsDropped { file: name, issue });
            errors.push(issue.to_string());
        }

        let (rows, notice) = resolve_duplicates(validated.rows);
        if let Some(notice) = &notice {
            self.emit(IngestEvent::DuplicatesRemoved { file: name, notice });
            errors.push(notice.to_string());
        }

        let outcome = reconcile(&self.store, &rows).await;
        for row in &outcome.outcomes {
            self.emit(IngestEvent::RowReconciled { file: name, outcome: row });
        }
        errors.extend(outcome.failures());
        if let Some(error) = &outcome.aborted {
            self.emit(IngestEvent::TransactionAborted {
                file: name,
                error,
                rollback: outcome.rollback_failed.as_ref(),
            });
        }
        errors.extend(outcome.abort_message());

        self.finish(FileResult {
            file: name.to_string(),
            processed: outcome.processed(),
            errors,
        })
    }

    /// CSV decodes in place. Workbooks are spilled to disk and decoded on the
    /// blocking pool so large uploads do not stall the runtime.
    async fn read(&self, file: &UploadedFile) -> Result<RowSet, ReadError> {
        match FileFormat::from_filename(&file.name)? {
            FileFormat::Csv => self.reader.read(&file.name, file.bytes.as_slice()),
            FileFormat::Xls | FileFormat::Xlsx => {
                let reader = self.reader.clone();
                let (name, bytes) = (file.name.clone(), file.bytes.clone());
                tokio::task::spawn_blocking(move || reader.read(&name, bytes.as_slice()))
                    .await
                    .map_err(|e| ReadError::Interrupted(e.to_string()))?
            }
        }
    }

    fn finish(&self, result: FileResult) -> FileResult {
        self.emit(IngestEvent::FileCompleted {
            file: &result.file,
            processed: result.processed,
            errors: result.errors.len(),
        });
        result
    }

    fn emit(&self, event: IngestEvent<'_>) {
        self.observer.on_event(&event);
    }
}
