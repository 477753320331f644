//! Read-only lookup of flat tax rates by tax-type identifier.
//!
//! A table is validated once when it is built and never mutated afterwards.
//! [`TaxRateTable::standard`] returns the built-in table; tables loaded from
//! CSV or from a repository go through [`TaxRateTable::new`].
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use compliance_core::{TaxRate, TaxRateTable};
//!
//! let table = TaxRateTable::new(vec![
//!     TaxRate::new("cit", "Corporate Income Tax", dec!(0.30)),
//!     TaxRate::new("vat", "Value Added Tax", dec!(0.20)),
//! ])
//! .unwrap();
//!
//! assert_eq!(table.get("cit").map(|r| r.rate), Some(dec!(0.30)));
//! assert!(table.get("gst").is_none());
//! ```

use std::collections::HashSet;
use std::sync::OnceLock;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::TaxRate;

/// Errors raised while building a [`TaxRateTable`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxRateTableError {
    /// A tax-type identifier was blank.
    #[error("tax type identifier must not be empty")]
    EmptyId,

    /// The same identifier appeared more than once.
    #[error("duplicate tax type identifier '{0}'")]
    DuplicateId(String),

    /// A rate fell outside [0, 1].
    #[error("rate for '{id}' must be between 0 and 1, got {rate}")]
    InvalidRate { id: String, rate: Decimal },
}

/// Immutable, validated mapping from tax-type identifier to [`TaxRate`].
///
/// Iteration yields entries in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRateTable {
    entries: Vec<TaxRate>,
}

impl TaxRateTable {
    /// Builds a table, rejecting blank ids, duplicate ids and rates outside
    /// [0, 1].
    pub fn new(entries: Vec<TaxRate>) -> Result<Self, TaxRateTableError> {
        let mut seen = HashSet::with_capacity(entries.len());

        for entry in &entries {
            if entry.id.trim().is_empty() {
                return Err(TaxRateTableError::EmptyId);
            }
            if entry.rate < Decimal::ZERO || entry.rate > Decimal::ONE {
                return Err(TaxRateTableError::InvalidRate {
                    id: entry.id.clone(),
                    rate: entry.rate,
                });
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(TaxRateTableError::DuplicateId(entry.id.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// The built-in rate table, created on first use.
    ///
    /// | id    | name                 | rate |
    /// |-------|----------------------|------|
    /// | `cit` | Corporate Income Tax | 30%  |
    /// | `vat` | Value Added Tax      | 20%  |
    /// | `wht` | Withholding Tax      | 15%  |
    /// | `pit` | Personal Income Tax  | 35%  |
    pub fn standard() -> &'static TaxRateTable {
        static STANDARD: OnceLock<TaxRateTable> = OnceLock::new();
        STANDARD.get_or_init(|| Self {
            entries: vec![
                TaxRate::new("cit", "Corporate Income Tax", Decimal::new(30, 2)),
                TaxRate::new("vat", "Value Added Tax", Decimal::new(20, 2)),
                TaxRate::new("wht", "Withholding Tax", Decimal::new(15, 2)),
                TaxRate::new("pit", "Personal Income Tax", Decimal::new(35, 2)),
            ],
        })
    }

    /// Looks up an entry by identifier.
    pub fn get(
        &self,
        id: &str,
    ) -> Option<&TaxRate> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxRate> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TaxRateTable {
    fn default() -> Self {
        Self::standard().clone()
    }
}
