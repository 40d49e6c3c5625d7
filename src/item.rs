//! Lookup keys and the normalized item record.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Company + barcode pair identifying one lookup.
///
/// Keys compare field by field. The `company_barcode` form produced by
/// [`Display`](fmt::Display) is for logs only and is never used for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    company: String,
    barcode: String,
}

impl LookupKey {
    /// Returns `None` when either part is empty.
    pub fn new(company: impl Into<String>, barcode: impl Into<String>) -> Option<Self> {
        let company = company.into();
        let barcode = barcode.into();
        if company.is_empty() || barcode.is_empty() {
            return None;
        }
        Some(Self { company, barcode })
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.company, self.barcode)
    }
}

/// An item as returned to callers.
///
/// Every field is always present; [`ItemRecord::default`] is the zero value
/// sent with `NOT_FOUND` and `ERROR` responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemRecord {
    pub item_code: String,
    pub item_name: String,
    #[serde(serialize_with = "serialize_quantity")]
    pub qty_on_stock: f64,
}

impl ItemRecord {
    /// Maps one upstream item object onto the canonical shape.
    ///
    /// `ItemCode` and `ItemName` accept strings or numbers; `QuantityOnStock`
    /// accepts numbers or numeric strings. Anything else falls back to the
    /// field's zero value.
    pub fn from_upstream(item: &Value) -> Self {
        Self {
            item_code: text_field(item.get("ItemCode")),
            item_name: text_field(item.get("ItemName")),
            qty_on_stock: quantity_field(item.get("QuantityOnStock")),
        }
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn quantity_field(value: Option<&Value>) -> f64 {
    let qty = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if qty.is_finite() { qty } else { 0.0 }
}

// Whole quantities go out as JSON integers so `5` never becomes `5.0`.
fn serialize_quantity<S: Serializer>(qty: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if qty.fract() == 0.0 && qty.abs() <= MAX_EXACT {
        serializer.serialize_i64(*qty as i64)
    } else {
        serializer.serialize_f64(*qty)
    }
}
