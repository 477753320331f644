use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single tax calculation.
///
/// Compared and stored by value; it has no identity of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    /// Tax owed, unrounded.
    pub tax_amount: Decimal,

    /// `tax_amount / income`, or zero when income is zero.
    pub effective_rate: Decimal,

    /// Free-form breakdown (tax type, nominal rate, income, ...).
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl TaxCalculationResult {
    /// Reads a string entry from `details`, e.g. `"tax_type"`.
    pub fn detail_str(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }
}
