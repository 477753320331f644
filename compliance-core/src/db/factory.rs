use async_trait::async_trait;

use super::repository::{ComplianceRepository, RepositoryError};

/// Which backend to open and how to reach it.
///
/// `connection_string` is handed to the backend untouched, e.g. a file path
/// or `:memory:` for SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`ComplianceRepository`] for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Opens the store, bringing its schema up to date first.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ComplianceRepository>, RepositoryError>;
}

/// The backends a binary was built with, looked up by [`DbConfig::backend`].
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: Vec<Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend. A later factory with the same name wins.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories
            .retain(|known| known.backend_name() != factory.backend_name());
        self.factories.push(factory);
    }

    /// Opens the repository for `config.backend`.
    ///
    /// An unregistered backend is a [`RepositoryError::Configuration`] that
    /// lists the backends that are available.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ComplianceRepository>, RepositoryError> {
        match self
            .factories
            .iter()
            .find(|factory| factory.backend_name() == config.backend)
        {
            Some(factory) => factory.create(config).await,
            None => {
                let known: Vec<_> = self.factories.iter().map(|f| f.backend_name()).collect();
                Err(RepositoryError::Configuration(format!(
                    "unknown backend '{}' (available: {})",
                    config.backend,
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )))
            }
        }
    }
}
