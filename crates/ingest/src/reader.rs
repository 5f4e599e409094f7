//! Tabular reader: turns an uploaded byte stream into a header-keyed row-set.
//!
//! CSV is decoded straight from memory. Excel workbooks are spilled to a named
//! temporary file (calamine opens workbooks by path) which is removed when
//! the guard drops, on success and failure alike.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::ReadError;

/// Container format, detected from the uploaded file name.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xls,
    Xlsx,
}

impl FileFormat {
    /// Detect by extension (case-insensitive). Anything else is unsupported.
    pub fn from_filename(filename: &str) -> Result<Self, ReadError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("xls") => Ok(FileFormat::Xls),
            Some("xlsx") => Ok(FileFormat::Xlsx),
            _ => Err(ReadError::UnsupportedType),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            FileFormat::Csv => ".csv",
            FileFormat::Xls => ".xls",
            FileFormat::Xlsx => ".xlsx",
        }
    }
}

/// One cell as decoded from the container, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// One data row. `number` is 1-based and counts data rows only (the header
/// row is not numbered).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub number: usize,
    cells: HashMap<String, RawValue>,
}

static EMPTY: RawValue = RawValue::Empty;

impl RawRow {
    pub fn new(number: usize, cells: HashMap<String, RawValue>) -> Self {
        Self { number, cells }
    }

    /// Cell under `column`; absent columns read as [`RawValue::Empty`].
    pub fn get(&self, column: &str) -> &RawValue {
        self.cells.get(column).unwrap_or(&EMPTY)
    }
}

/// Ordered rows keyed by trimmed header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Assemble rows from positional cells, skipping rows with no content.
    fn push_row(&mut self, number: usize, values: Vec<RawValue>) {
        if values.iter().all(|v| *v == RawValue::Empty) {
            return;
        }
        let cells = self
            .columns
            .iter()
            .cloned()
            .zip(values.into_iter().chain(std::iter::repeat(RawValue::Empty)))
            .collect();
        self.rows.push(RawRow::new(number, cells));
    }
}

/// Reads uploads into [`RowSet`]s.
#[derive(Debug, Clone, Default)]
pub struct TabularReader {
    spill_dir: Option<PathBuf>,
}

impl TabularReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spill Excel uploads under `dir` instead of the system temp dir.
    pub fn with_spill_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            spill_dir: Some(dir.into()),
        }
    }

    /// Decode `source` according to the extension of `filename`.
    ///
    /// The stream is consumed fully before the format is inspected.
    pub fn read<R: Read>(&self, filename: &str, mut source: R) -> Result<RowSet, ReadError> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;

        match FileFormat::from_filename(filename)? {
            FileFormat::Csv => read_csv(&bytes),
            format => self.read_workbook(format, &bytes),
        }
    }

    fn read_workbook(&self, format: FileFormat, bytes: &[u8]) -> Result<RowSet, ReadError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("catalog-upload-").suffix(format.suffix());
        let mut spill = match &self.spill_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        spill.write_all(bytes)?;
        spill.flush()?;

        // `spill` outlives the workbook handle and deletes the file on drop.
        read_first_sheet(spill.path())
    }
}

fn read_csv(bytes: &[u8]) -> Result<RowSet, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let mut set = RowSet {
        columns: reader.headers()?.iter().map(str::to_string).collect(),
        rows: Vec::new(),
    };
    let expected = set.columns.len();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > expected {
            return Err(ReadError::RaggedRow {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected,
                found: record.len(),
            });
        }
        let values = record.iter().map(text_cell).collect();
        set.push_row(idx + 1, values);
    }

    Ok(set)
}

fn text_cell(field: &str) -> RawValue {
    if field.trim().is_empty() {
        RawValue::Empty
    } else {
        RawValue::Text(field.to_string())
    }
}

fn read_first_sheet(path: &Path) -> Result<RowSet, ReadError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReadError::Spreadsheet(e.to_string()))?;

    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ReadError::NoSheets)?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ReadError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RowSet::default());
    };

    let mut set = RowSet {
        columns: header.iter().map(header_name).collect(),
        rows: Vec::new(),
    };
    for (idx, row) in rows.enumerate() {
        let values = row.iter().map(cell_to_raw).collect();
        set.push_row(idx + 1, values);
    }

    Ok(set)
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Map a spreadsheet cell onto the reader's value model.
pub(crate) fn cell_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Empty,
        Data::String(s) if s.trim().is_empty() => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::Bool(b) => RawValue::Bool(*b),
        other => RawValue::Text(other.to_string()),
    }
}
