//! Tax rate lookup and flat-rate tax calculation.
//!
//! [`TaxRateTable`] maps tax-type identifiers to nominal rates and
//! [`TaxCalculator`] applies them to an income figure.

pub mod common;
pub mod rate_table;
pub mod tax_calculation;

pub use rate_table::{TaxRateTable, TaxRateTableError};
pub use tax_calculation::{TaxCalculationError, TaxCalculator, calculate_tax};
