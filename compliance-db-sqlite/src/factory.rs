use std::path::PathBuf;

use async_trait::async_trait;
use compliance_core::db::{DbConfig, RepositoryFactory};
use compliance_core::{ComplianceRepository, RepositoryError};
use tracing::info;

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works both from the build
/// tree and from an installed binary.
///
/// Resolution order:
/// 1. **`COMPLIANCE_DB_SQLITE_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if the directory exists in the current working directory.
/// 3. **`$CARGO_MANIFEST_DIR/seeds`** as last resort.
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COMPLIANCE_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Map a connection string to a sqlx URL.
///
/// * `:memory:` becomes `sqlite::memory:`.
/// * Anything already starting with `sqlite:` is used as given.
/// * Any other value is a file path, opened read-write and created on demand.
pub fn connection_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", trimmed)
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// ```rust,no_run
/// use compliance_core::db::RepositoryRegistry;
/// use compliance_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database, apply migrations and load the seed files.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ComplianceRepository>, RepositoryError> {
        let url = connection_url(&config.connection_string);
        info!(url = %url, "opening sqlite repository");

        let repo = SqliteRepository::new(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}
