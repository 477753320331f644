mod export;
mod loader;

pub use export::{ExportError, ScenarioExporter};
pub use loader::{TaxRateLoader, TaxRateLoaderError, TaxRateRecord};
