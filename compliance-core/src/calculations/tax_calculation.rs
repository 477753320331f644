//! Flat-rate tax calculation.
//!
//! The tax owed is `income × rate`, where `rate` is looked up in a
//! [`TaxRateTable`] by tax-type identifier. No rounding happens here;
//! see [`crate::calculations::common`] for display rounding.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use compliance_core::{TaxCalculator, TaxRate, TaxRateTable};
//!
//! let table = TaxRateTable::new(vec![TaxRate::new("cit", "Corporate Income Tax", dec!(0.30))])
//!     .unwrap();
//! let calculator = TaxCalculator::new(&table);
//!
//! assert_eq!(calculator.calculate_tax(dec!(1000), "cit").unwrap(), dec!(300));
//!
//! let result = calculator.calculate(dec!(1000), "cit").unwrap();
//! assert_eq!(result.tax_amount, dec!(300));
//! assert_eq!(result.effective_rate, dec!(0.30));
//! assert_eq!(result.detail_str("tax_type"), Some("cit"));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::TaxRateTable;
use crate::{TaxCalculationResult, TaxRate};

/// Errors that can occur during a tax calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxCalculationError {
    /// The tax-type identifier has no entry in the rate table.
    #[error("unknown tax type '{0}'")]
    UnknownTaxType(String),
}

/// Applies rates from a borrowed [`TaxRateTable`].
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator<'a> {
    table: &'a TaxRateTable,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(table: &'a TaxRateTable) -> Self {
        Self { table }
    }

    /// Calculator backed by [`TaxRateTable::standard`].
    pub fn standard() -> TaxCalculator<'static> {
        TaxCalculator::new(TaxRateTable::standard())
    }

    pub fn table(&self) -> &'a TaxRateTable {
        self.table
    }

    /// Returns `income × rate` for the given tax type.
    ///
    /// Negative income is accepted and produces a negative amount; a warning
    /// is logged so that odd input shows up in the logs.
    ///
    /// # Errors
    ///
    /// [`TaxCalculationError::UnknownTaxType`] if `tax_type_id` is not in the
    /// table.
    pub fn calculate_tax(
        &self,
        income: Decimal,
        tax_type_id: &str,
    ) -> Result<Decimal, TaxCalculationError> {
        let entry = self.lookup(tax_type_id)?;
        Ok(self.apply_rate(income, entry))
    }

    /// Runs [`Self::calculate_tax`] and packages the amount together with the
    /// effective rate and a breakdown of what was applied.
    ///
    /// # Errors
    ///
    /// Same as [`Self::calculate_tax`].
    pub fn calculate(
        &self,
        income: Decimal,
        tax_type_id: &str,
    ) -> Result<TaxCalculationResult, TaxCalculationError> {
        let entry = self.lookup(tax_type_id)?;
        let tax_amount = self.apply_rate(income, entry);
        let effective_rate = self.effective_rate(tax_amount, income);

        let mut details = BTreeMap::new();
        details.insert("tax_type".to_string(), Value::String(entry.id.clone()));
        details.insert("tax_type_name".to_string(), Value::String(entry.name.clone()));
        details.insert("rate".to_string(), Value::String(entry.rate.to_string()));
        details.insert("income".to_string(), Value::String(income.to_string()));

        Ok(TaxCalculationResult {
            tax_amount,
            effective_rate,
            details,
        })
    }

    fn lookup(
        &self,
        tax_type_id: &str,
    ) -> Result<&'a TaxRate, TaxCalculationError> {
        self.table.get(tax_type_id).ok_or_else(|| {
            debug!(tax_type = tax_type_id, "tax type not found in rate table");
            TaxCalculationError::UnknownTaxType(tax_type_id.to_string())
        })
    }

    fn apply_rate(
        &self,
        income: Decimal,
        entry: &TaxRate,
    ) -> Decimal {
        if income.is_sign_negative() && !income.is_zero() {
            warn!(
                income = %income,
                tax_type = %entry.id,
                "negative income; tax amount will be negative"
            );
        }
        income * entry.rate
    }

    /// Realised rate: `tax_amount / income`, or zero for zero income.
    fn effective_rate(
        &self,
        tax_amount: Decimal,
        income: Decimal,
    ) -> Decimal {
        if income.is_zero() {
            Decimal::ZERO
        } else {
            tax_amount / income
        }
    }
}

/// [`TaxCalculator::calculate_tax`] against the standard rate table.
pub fn calculate_tax(
    income: Decimal,
    tax_type_id: &str,
) -> Result<Decimal, TaxCalculationError> {
    TaxCalculator::standard().calculate_tax(income, tax_type_id)
}
