use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, ProductId};

pub const SKU_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 200;
pub const CATEGORY_MAX_LEN: usize = 100;

/// Fractional digits kept for prices.
pub const PRICE_SCALE: u32 = 2;
/// Total significant digits a price may carry (integer part + `PRICE_SCALE`).
pub const PRICE_MAX_DIGITS: u32 = 10;

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            _ => Err(DomainError::validation(format!(
                "invalid status '{}' (expected active or inactive)",
                s.trim()
            ))),
        }
    }
}

/// Stock keeping unit: the catalog's business key.
///
/// Non-empty after trimming and at most `SKU_MAX_LEN` characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        ensure_max_len("sku", trimmed, SKU_MAX_LEN)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The mutable attributes of a product (everything except id and SKU).
///
/// Constructed only through [`ProductFields::new`], so a value of this type
/// always satisfies the column constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductFields {
    name: String,
    category: String,
    price: Decimal,
    stock_qty: i64,
    status: ProductStatus,
}

impl ProductFields {
    pub fn new(
        name: &str,
        category: &str,
        price: Decimal,
        stock_qty: i64,
        status: ProductStatus,
    ) -> DomainResult<Self> {
        let name = name.trim();
        let category = category.trim();

        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        ensure_max_len("name", name, NAME_MAX_LEN)?;

        if category.is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        ensure_max_len("category", category, CATEGORY_MAX_LEN)?;

        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            price: normalize_price(price)?,
            stock_qty,
            status,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn stock_qty(&self) -> i64 {
        self.stock_qty
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }
}

/// Round a price to `PRICE_SCALE` digits and check it fits the column.
pub fn normalize_price(price: Decimal) -> DomainResult<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation(format!(
            "price must not be negative (got {price})"
        )));
    }

    let mut rounded = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(PRICE_SCALE);

    let limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_SCALE));
    if rounded >= limit {
        return Err(DomainError::validation(format!(
            "price {rounded} exceeds {PRICE_MAX_DIGITS} digits"
        )));
    }

    // -0.00 normalizes to 0.00
    Ok(rounded.abs())
}

fn ensure_max_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(DomainError::validation(format!(
            "{field} is {len} characters long (max {max})"
        )));
    }
    Ok(())
}

/// A validated product that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub sku: Sku,
    pub fields: ProductFields,
}

/// Persisted product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: Sku,
    fields: ProductFields,
}

impl Product {
    pub fn new(id: ProductId, sku: Sku, fields: ProductFields) -> Self {
        Self { id, sku, fields }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn fields(&self) -> &ProductFields {
        &self.fields
    }

    pub fn name(&self) -> &str {
        self.fields.name()
    }

    pub fn category(&self) -> &str {
        self.fields.category()
    }

    pub fn price(&self) -> Decimal {
        self.fields.price()
    }

    pub fn stock_qty(&self) -> i64 {
        self.fields.stock_qty()
    }

    pub fn status(&self) -> ProductStatus {
        self.fields.status()
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.fields.name, self.sku)
    }
}

/// Unvalidated full product payload (create and full update).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductDraft {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub stock_qty: i64,
    pub status: String,
}

impl ProductDraft {
    pub fn validate(&self) -> DomainResult<NewProduct> {
        let sku = Sku::parse(&self.sku)?;
        let status = self.status.parse::<ProductStatus>()?;
        let fields = ProductFields::new(&self.name, &self.category, self.price, self.stock_qty, status)?;
        Ok(NewProduct { sku, fields })
    }
}

/// Partial update payload; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock_qty: Option<i64>,
    pub status: Option<String>,
}

impl ProductPatch {
    /// Merge the patch over `current` and re-validate the result.
    pub fn apply_to(&self, current: &Product) -> DomainResult<NewProduct> {
        let draft = ProductDraft {
            sku: self.sku.clone().unwrap_or_else(|| current.sku.0.clone()),
            name: self.name.clone().unwrap_or_else(|| current.fields.name.clone()),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| current.fields.category.clone()),
            price: self.price.unwrap_or(current.fields.price),
            stock_qty: self.stock_qty.unwrap_or(current.fields.stock_qty),
            status: self
                .status
                .clone()
                .unwrap_or_else(|| current.fields.status.as_str().to_string()),
        };
        draft.validate()
    }
}
