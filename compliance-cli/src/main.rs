use anyhow::Context;
use clap::Parser;
use tracing::debug;

use compliance_cli::cli::Cli;
use compliance_cli::config::AppConfig;
use compliance_cli::{app, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(&cli.overrides());

    logging::init_logging(&config.logging)?;

    let db_config = config.db_config();
    debug!(backend = %db_config.backend, "connecting");
    let registry = app::build_registry();
    let repo = registry
        .create(&db_config)
        .await
        .with_context(|| format!("Failed to open {} database", db_config.backend))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app::run(cli.command, &config, repo.as_ref(), &mut out).await
}
