use std::io::Read;

use compliance_core::{
    ComplianceRepository, RepositoryError, TaxRate, TaxRateTable, TaxRateTableError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a tax rate table.
#[derive(Debug, Error, PartialEq)]
pub enum TaxRateLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid rate table: {0}")]
    InvalidTable(#[from] TaxRateTableError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxRateLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxRateLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the tax rates CSV file.
///
/// - `id`: tax-type identifier (e.g. `cit`)
/// - `name`: display name
/// - `rate`: fraction (`0.30`) or percentage (`30%`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxRateRecord {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "deserialize_rate")]
    pub rate: Decimal,
}

impl From<&TaxRateRecord> for TaxRate {
    fn from(record: &TaxRateRecord) -> Self {
        TaxRate::new(record.id.clone(), record.name.clone(), record.rate)
    }
}

fn deserialize_rate<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.trim();
    match s.strip_suffix('%') {
        Some(percent) => percent
            .trim()
            .parse::<Decimal>()
            .map(|p| p / Decimal::ONE_HUNDRED)
            .map_err(serde::de::Error::custom),
        None => s.parse::<Decimal>().map_err(serde::de::Error::custom),
    }
}

/// Loader for tax rate tables kept in CSV files.
///
/// Records can be turned into an in-memory [`TaxRateTable`] or written to
/// any [`ComplianceRepository`] backend.
pub struct TaxRateLoader;

impl TaxRateLoader {
    /// Parse rate records from a CSV reader with an `id,name,rate` header.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxRateRecord>, TaxRateLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxRateRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Build a validated table, in record order.
    pub fn to_table(records: &[TaxRateRecord]) -> Result<TaxRateTable, TaxRateLoaderError> {
        let rates = records.iter().map(TaxRate::from).collect();
        Ok(TaxRateTable::new(rates)?)
    }

    /// Upsert every record into the repository and return how many were
    /// written.
    ///
    /// The records are validated as a whole first, so an invalid file writes
    /// nothing, and the write is a single transaction. Running the same load
    /// twice gives the same result.
    pub async fn load<R: ComplianceRepository + ?Sized>(
        repo: &R,
        records: &[TaxRateRecord],
    ) -> Result<usize, TaxRateLoaderError> {
        let rates = Self::validated_rates(records)?;
        repo.upsert_tax_rates(&rates).await?;
        Ok(rates.len())
    }

    /// Like [`Self::load`], but the repository ends up holding exactly these
    /// records. A failed write leaves the previous table in place.
    pub async fn replace<R: ComplianceRepository + ?Sized>(
        repo: &R,
        records: &[TaxRateRecord],
    ) -> Result<usize, TaxRateLoaderError> {
        let rates = Self::validated_rates(records)?;
        repo.replace_tax_rates(&rates).await?;
        Ok(rates.len())
    }

    fn validated_rates(records: &[TaxRateRecord]) -> Result<Vec<TaxRate>, TaxRateLoaderError> {
        Ok(Self::to_table(records)?.iter().cloned().collect())
    }
}
