pub mod calculations;
pub mod calendar;
pub mod db;
pub mod models;
pub mod scenarios;

pub use calculations::{TaxCalculationError, TaxCalculator, TaxRateTable, TaxRateTableError};
pub use calendar::ComplianceCalendar;
pub use db::repository::{ComplianceRepository, RepositoryError};
pub use models::*;
pub use scenarios::ScenarioStore;
