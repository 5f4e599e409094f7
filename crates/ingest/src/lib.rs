//! Bulk product ingestion from CSV and Excel uploads.
//!
//! Each file flows through the stages below; every stage reports into the
//! file's diagnostics and only the request-level [`IngestError`] escapes.
//!
//! - [`reader`]: bytes → header-keyed row-set
//! - [`validate`]: structural checks, coercion, row filtering
//! - [`dedup`]: last-occurrence-wins per SKU
//! - [`reconcile`]: transactional upsert into the catalog store
//! - [`orchestrator`]: batch loop and per-file report

pub mod dedup;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod reader;
pub mod reconcile;
pub mod row;
pub mod validate;

pub use dedup::{DuplicateNotice, resolve_duplicates};
pub use error::{IngestError, ReadError, StructuralError};
pub use observer::{IngestEvent, IngestObserver, NoopObserver, TracingObserver};
pub use orchestrator::{BatchReport, FileResult, Ingestor, UploadedFile};
pub use reader::{FileFormat, RawRow, RawValue, RowSet, TabularReader};
pub use reconcile::{Reconciliation, RowOutcome, reconcile};
pub use row::{CleanRow, Coerced, IngestRow};
pub use validate::{REQUIRED_COLUMNS, RowIssue, Validated, validate};
