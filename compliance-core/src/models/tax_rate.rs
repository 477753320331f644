use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A flat rate keyed by tax-type identifier (e.g. `cit`, `vat`).
///
/// `rate` is a fraction, so 30% is stored as `0.30`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: String,
    pub name: String,
    pub rate: Decimal,
}

impl TaxRate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rate: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rate,
        }
    }
}
