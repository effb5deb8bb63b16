//! Catalog response shapes and numeric normalization.
//!
//! The backend serializes stock and price inconsistently (integers, floats,
//! numeric strings). All coercion lives in the deserializers below so the
//! rest of the workspace never re-validates.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use vendora_core::ProductId;

/// A product as returned by the catalog's single-item fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(deserialize_with = "de_price")]
    pub price: Decimal,
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "de_stock")]
    pub stock: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// One record of the batched availability lookup.
///
/// Response order is not guaranteed to match request order; consumers index
/// by `id`. Absence of a requested id means "not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub id: ProductId,
    #[serde(deserialize_with = "de_stock")]
    pub stock: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Accept a price as a JSON number or a numeric string; reject negatives.
fn de_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Decimal::from_f64(n)
            .ok_or_else(|| serde::de::Error::custom(format!("price is not a finite number: {n}")))?,
        Raw::Str(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| serde::de::Error::custom(format!("price is not numeric: {e}")))?,
    };

    if value.is_sign_negative() {
        return Err(serde::de::Error::custom(format!("price must be non-negative: {value}")));
    }

    // Two decimal places: prices are currency-agnostic minor-unit amounts.
    Ok(value.round_dp(2))
}

/// Accept a stock count as a JSON integer, float, or numeric string.
///
/// Negative counts clamp to zero: the backend occasionally reports oversold
/// stock as a negative number, which for the cart means "none available".
fn de_stock<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Str(String),
    }

    let raw = match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n,
        Raw::Float(f) => {
            if !f.is_finite() {
                return Err(serde::de::Error::custom(format!("stock is not finite: {f}")));
            }
            f.round() as i64
        }
        Raw::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("stock is not numeric: {e}")))?,
    };

    Ok(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
}
