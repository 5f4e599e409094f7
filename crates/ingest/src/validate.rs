//! Whole-file and per-row validation of a decoded row-set.

use core::fmt;

use crate::error::StructuralError;
use crate::reader::RowSet;
use crate::row::{CleanRow, IngestRow};

/// Headers every upload must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = ["sku", "name", "category", "price", "stock_qty", "status"];

/// A group of rows dropped by one validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssue {
    EmptySku { rows: Vec<usize> },
    InvalidPrice { rows: Vec<usize> },
    InvalidStockQty { rows: Vec<usize> },
}

impl RowIssue {
    pub fn rows(&self) -> &[usize] {
        match self {
            RowIssue::EmptySku { rows }
            | RowIssue::InvalidPrice { rows }
            | RowIssue::InvalidStockQty { rows } => rows,
        }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::EmptySku { rows } => write!(f, "Empty SKUs found at rows: {rows:?}"),
            RowIssue::InvalidPrice { rows } => write!(f, "Invalid price at rows: {rows:?}"),
            RowIssue::InvalidStockQty { rows } => write!(f, "Invalid stock_qty at rows: {rows:?}"),
        }
    }
}

/// Rows that survived validation plus the issues raised along the way,
/// in step order.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub rows: Vec<CleanRow>,
    pub issues: Vec<RowIssue>,
}

/// Run the validation steps in order:
///
/// 1. reject an empty row-set
/// 2. reject a row-set missing any of [`REQUIRED_COLUMNS`]
/// 3. normalize text cells and coerce numeric ones
/// 4. drop rows with an empty SKU
/// 5. drop rows whose price or stock quantity did not coerce
///
/// Steps 1 and 2 fail the whole file; the rest only drop rows.
pub fn validate(set: &RowSet) -> Result<Validated, StructuralError> {
    if set.is_empty() {
        return Err(StructuralError::Empty);
    }

    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !set.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(StructuralError::MissingColumns(missing));
    }

    let coerced = set.rows.iter().map(IngestRow::from_raw);

    let mut issues = Vec::new();
    let mut empty_sku = Vec::new();
    let mut with_sku = Vec::new();
    for row in coerced {
        if row.sku.is_none() {
            empty_sku.push(row.number);
        } else {
            with_sku.push(row);
        }
    }
    if !empty_sku.is_empty() {
        issues.push(RowIssue::EmptySku { rows: empty_sku });
    }

    let bad_price: Vec<usize> = with_sku
        .iter()
        .filter(|r| !r.price.is_valid())
        .map(|r| r.number)
        .collect();
    let bad_qty: Vec<usize> = with_sku
        .iter()
        .filter(|r| !r.stock_qty.is_valid())
        .map(|r| r.number)
        .collect();
    if !bad_price.is_empty() {
        issues.push(RowIssue::InvalidPrice { rows: bad_price });
    }
    if !bad_qty.is_empty() {
        issues.push(RowIssue::InvalidStockQty { rows: bad_qty });
    }

    let rows = with_sku
        .into_iter()
        .filter_map(|r| r.into_clean().ok())
        .collect();

    Ok(Validated { rows, issues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TabularReader;

    const HEADER: &str = "sku,name,category,price,stock_qty,status";

    fn csv(body: &str) -> RowSet {
        let text = format!("{HEADER}\n{body}");
        TabularReader::new().read("t.csv", text.as_bytes()).unwrap()
    }

    #[test]
    fn empty_row_set_is_rejected() {
        let err = validate(&csv("")).unwrap_err();
        assert_eq!(err, StructuralError::Empty);
        assert_eq!(err.to_string(), "File is empty");
    }

    #[test]
    fn missing_columns_are_listed_sorted() {
        let set = TabularReader::new()
            .read("t.csv", "sku,price,name\nA1,1,Widget\n".as_bytes())
            .unwrap();
        let err = validate(&set).unwrap_err();
        assert_eq!(err.to_string(), "Missing columns: category, status, stock_qty");
    }

    #[test]
    fn extra_columns_are_ignored() {
        let set = TabularReader::new()
            .read(
                "t.csv",
                format!("{HEADER},notes\nA1,Widget,Tools,9.99,5,active,hello\n").as_bytes(),
            )
            .unwrap();
        let out = validate(&set).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn empty_sku_rows_are_dropped_and_reported() {
        let out = validate(&csv("A1,Widget,Tools,9.99,5,active\nB2,Gadget,Tools,1,1,active\n  ,Ghost,Tools,1,1,active\n")).unwrap();

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.issues, vec![RowIssue::EmptySku { rows: vec![3] }]);
        assert_eq!(out.issues[0].to_string(), "Empty SKUs found at rows: [3]");
    }

    #[test]
    fn unparseable_numbers_are_dropped_after_sku_check() {
        let out = validate(&csv(
            "A1,Widget,Tools,abc,5,active\n\
             B2,Gadget,Tools,2.50,many,active\n\
             ,Ghost,Tools,oops,1,active\n\
             C3,Thing,Tools,3,,active\n\
             D4,Fine,Tools,4,4,inactive\n",
        ))
        .unwrap();

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].sku, "D4");
        assert_eq!(
            out.issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "Empty SKUs found at rows: [3]",
                "Invalid price at rows: [1]",
                "Invalid stock_qty at rows: [2, 4]",
            ]
        );
    }

    #[test]
    fn domain_values_pass_through_unchecked() {
        // Status vocabulary and lengths are enforced per row at save time.
        let out = validate(&csv("A1,Widget,Tools,-1,5,retired\n")).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert!(out.issues.is_empty());
    }
}
