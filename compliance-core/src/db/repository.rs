use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ComplianceDeadline, DeadlineStatus, ScenarioId, TaxRate, TaxScenario};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Persistence for rate tables, saved scenarios and compliance deadlines.
///
/// The in-memory types in this crate never call a repository themselves;
/// callers load from and write through it explicitly.
#[async_trait]
pub trait ComplianceRepository: Send + Sync {
    // Tax rates
    async fn list_tax_rates(&self) -> Result<Vec<TaxRate>, RepositoryError>;

    /// Inserts the rate, or replaces name and rate if the id already exists.
    async fn upsert_tax_rate(
        &self,
        rate: &TaxRate,
    ) -> Result<(), RepositoryError>;

    async fn delete_tax_rates(&self) -> Result<(), RepositoryError>;

    /// Upserts every rate in one transaction. On error nothing is written.
    async fn upsert_tax_rates(
        &self,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError>;

    /// Replaces the whole stored table with `rates` in one transaction. On
    /// error the previous table is kept.
    async fn replace_tax_rates(
        &self,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError>;

    // Scenarios
    async fn insert_scenario(
        &self,
        scenario: &TaxScenario,
    ) -> Result<(), RepositoryError>;

    async fn get_scenario(
        &self,
        id: ScenarioId,
    ) -> Result<TaxScenario, RepositoryError>;

    /// All scenarios ordered by id, which is also creation order.
    async fn list_scenarios(&self) -> Result<Vec<TaxScenario>, RepositoryError>;

    async fn delete_scenario(
        &self,
        id: ScenarioId,
    ) -> Result<(), RepositoryError>;

    // Compliance deadlines
    async fn insert_deadline(
        &self,
        deadline: &ComplianceDeadline,
    ) -> Result<(), RepositoryError>;

    async fn list_deadlines(&self) -> Result<Vec<ComplianceDeadline>, RepositoryError>;

    async fn update_deadline_status(
        &self,
        id: &str,
        status: DeadlineStatus,
    ) -> Result<(), RepositoryError>;
}
