use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;

use catalog_core::DomainResult;
use catalog_products::{ProductFields, ProductStatus, Sku};

use crate::reader::{RawRow, RawValue};

/// Outcome of coercing one raw cell to a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    /// Blank or absent cell.
    Missing,
    /// Present but not interpretable; carries the raw text.
    Unparseable(String),
}

impl<T> Coerced<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Coerced::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Coerced::Value(_))
    }
}

/// A data row after text normalization and numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRow {
    pub number: usize,
    /// Trimmed SKU text; `None` when the cell is blank.
    pub sku: Option<String>,
    pub name: String,
    pub category: String,
    pub status: String,
    pub price: Coerced<Decimal>,
    pub stock_qty: Coerced<i64>,
}

impl IngestRow {
    pub fn from_raw(raw: &RawRow) -> Self {
        Self {
            number: raw.number,
            sku: coerce_text(raw.get("sku")).filter(|s| !s.is_empty()),
            name: coerce_text(raw.get("name")).unwrap_or_default(),
            category: coerce_text(raw.get("category")).unwrap_or_default(),
            status: coerce_text(raw.get("status")).unwrap_or_default(),
            price: coerce_price(raw.get("price")),
            stock_qty: coerce_stock_qty(raw.get("stock_qty")),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.sku.is_some() && self.price.is_valid() && self.stock_qty.is_valid()
    }

    /// Consume a valid row; returns the row unchanged if it is not valid.
    pub fn into_clean(self) -> Result<CleanRow, IngestRow> {
        match (&self.sku, &self.price, &self.stock_qty) {
            (Some(sku), Coerced::Value(price), Coerced::Value(stock_qty)) => Ok(CleanRow {
                number: self.number,
                sku: sku.clone(),
                name: self.name,
                category: self.category,
                status: self.status,
                price: *price,
                stock_qty: *stock_qty,
            }),
            _ => Err(self),
        }
    }
}

/// A row that passed row-level validation and is ready for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub number: usize,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub price: Decimal,
    pub stock_qty: i64,
}

impl CleanRow {
    /// Apply domain constraints (status vocabulary, lengths, price precision).
    pub fn to_product(&self) -> DomainResult<(Sku, ProductFields)> {
        let sku = Sku::parse(&self.sku)?;
        let status = ProductStatus::from_str(&self.status)?;
        let fields = ProductFields::new(
            &self.name,
            &self.category,
            self.price,
            self.stock_qty,
            status,
        )?;
        Ok((sku, fields))
    }
}

/// Render a cell as trimmed text. Integral floats lose their `.0` so that
/// numeric spreadsheet SKUs read as written.
pub fn coerce_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Empty => None,
        RawValue::Text(s) => Some(s.trim().to_string()),
        RawValue::Int(i) => Some(i.to_string()),
        RawValue::Float(f) => Some(match integral(*f) {
            Some(i) => i.to_string(),
            None => f.to_string(),
        }),
        RawValue::Bool(b) => Some(b.to_string()),
    }
}

pub fn coerce_price(value: &RawValue) -> Coerced<Decimal> {
    match value {
        RawValue::Empty => Coerced::Missing,
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Coerced::Missing;
            }
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map(Coerced::Value)
                .unwrap_or_else(|_| Coerced::Unparseable(s.to_string()))
        }
        RawValue::Int(i) => Coerced::Value(Decimal::from(*i)),
        RawValue::Float(f) => match Decimal::from_f64(*f) {
            Some(d) => Coerced::Value(d),
            None => Coerced::Unparseable(f.to_string()),
        },
        RawValue::Bool(b) => Coerced::Unparseable(b.to_string()),
    }
}

/// Stock quantities must be whole numbers; `5.0` is accepted, `5.5` is not.
pub fn coerce_stock_qty(value: &RawValue) -> Coerced<i64> {
    match value {
        RawValue::Empty => Coerced::Missing,
        RawValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Coerced::Missing;
            }
            if let Ok(n) = s.parse::<i64>() {
                return Coerced::Value(n);
            }
            Decimal::from_str(s)
                .ok()
                .filter(|d| d.fract().is_zero())
                .and_then(|d| d.to_i64())
                .map(Coerced::Value)
                .unwrap_or_else(|| Coerced::Unparseable(s.to_string()))
        }
        RawValue::Int(i) => Coerced::Value(*i),
        RawValue::Float(f) => match integral(*f) {
            Some(n) => Coerced::Value(n),
            None => Coerced::Unparseable(f.to_string()),
        },
        RawValue::Bool(b) => Coerced::Unparseable(b.to_string()),
    }
}

fn integral(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= LIMIT {
        Some(f as i64)
    } else {
        None
    }
}
