use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use compliance_data::TaxRateLoader;
use compliance_db_sqlite::SqliteRepository;

/// Load a tax rate table from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - id: The tax-type identifier (e.g., cit)
/// - name: The display name (e.g., Corporate Income Tax)
/// - rate: The rate as a fraction (0.30) or a percentage (30%)
#[derive(Parser, Debug)]
#[command(name = "compliance-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing tax rates
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g., sqlite:compliance.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:compliance.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,

    /// Remove all stored rates before loading
    #[arg(short, long, default_value_t = false)]
    replace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading tax rates from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = TaxRateLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let loaded = if args.replace {
        TaxRateLoader::replace(&repo, &records).await
    } else {
        TaxRateLoader::load(&repo, &records).await
    }
    .context("Failed to load tax rates into database")?;

    println!("Successfully loaded {} tax rates into the database.", loaded);

    Ok(())
}
