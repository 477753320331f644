//! Session-scoped storage of saved calculation scenarios.

mod store;

pub use store::ScenarioStore;
