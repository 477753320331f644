mod calculation_result;
mod compliance_deadline;
mod tax_rate;
mod tax_scenario;

pub use calculation_result::TaxCalculationResult;
pub use compliance_deadline::{ComplianceDeadline, DeadlineStatus};
pub use tax_rate::TaxRate;
pub use tax_scenario::{ScenarioId, ScenarioInputs, TaxScenario};
