//! Error taxonomy of the ingestion pipeline.
//!
//! Only [`IngestError`] ever reaches the caller as an error value; the other
//! kinds are folded into per-file diagnostics by the orchestrator.

use thiserror::Error;

/// The upload could not be decoded into a row-set (whole file fails).
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Invalid file type. Only CSV or Excel files allowed.")]
    UnsupportedType,

    #[error("could not read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed CSV at line {line}: expected {expected} fields, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("corrupt spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("spreadsheet contains no worksheets")]
    NoSheets,

    #[error("spreadsheet decoding did not finish: {0}")]
    Interrupted(String),
}

/// The row-set is structurally unusable (whole file fails, nothing is written).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("File is empty")]
    Empty,

    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Request-level rejection of a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("No files uploaded")]
    NoFiles,
}
