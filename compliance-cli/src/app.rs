//! Command handlers.
//!
//! Every handler takes the repository and an output sink explicitly so the
//! binary and the integration tests drive exactly the same code.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use compliance_core::calculations::common::format_percent;
use compliance_core::db::RepositoryRegistry;
use compliance_core::{
    ComplianceCalendar, ComplianceDeadline, ComplianceRepository, DeadlineStatus, ScenarioId,
    ScenarioStore, TaxCalculator, TaxRateTable, TaxScenario,
};
use compliance_data::ScenarioExporter;
use compliance_db_sqlite::SqliteRepositoryFactory;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::{Commands, DeadlineCmd, ScenarioCmd};
use crate::config::AppConfig;
use crate::utils::format_amount;

/// Registry with every backend this binary ships with.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// The stored rate table, or the standard table when none is stored.
pub async fn active_rate_table(repo: &dyn ComplianceRepository) -> Result<TaxRateTable> {
    let rates = repo
        .list_tax_rates()
        .await
        .context("Failed to load tax rates")?;

    if rates.is_empty() {
        debug!("no stored rates; using the standard table");
        return Ok(TaxRateTable::standard().clone());
    }

    TaxRateTable::new(rates).context("Stored tax rates are invalid")
}

async fn load_store(repo: &dyn ComplianceRepository) -> Result<ScenarioStore> {
    let scenarios = repo
        .list_scenarios()
        .await
        .context("Failed to load saved scenarios")?;
    Ok(ScenarioStore::from_scenarios(scenarios))
}

/// Dispatches a parsed command.
pub async fn run<W: Write>(
    command: Commands,
    config: &AppConfig,
    repo: &dyn ComplianceRepository,
    out: &mut W,
) -> Result<()> {
    let today = Local::now().date_naive();

    match command {
        Commands::Rates => print_rates(repo, out).await,
        Commands::Calculate {
            income,
            tax_type,
            save,
        } => calculate(repo, out, income, &tax_type, save.as_deref())
            .await
            .map(|_| ()),
        Commands::Scenarios { cmd } => match cmd {
            ScenarioCmd::List => list_scenarios(repo, out).await,
            ScenarioCmd::Compare { ids } => compare_scenarios(repo, out, &ids).await,
            ScenarioCmd::Delete { id } => delete_scenario(repo, out, id).await.map(|_| ()),
            ScenarioCmd::Export { out: Some(path) } => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create: {}", path.display()))?;
                let written = export_scenarios(repo, file).await?;
                writeln!(out, "Exported {written} scenarios to {}", path.display())?;
                Ok(())
            }
            ScenarioCmd::Export { out: None } => export_scenarios(repo, out).await.map(|_| ()),
        },
        Commands::Deadlines { cmd } => match cmd {
            DeadlineCmd::Upcoming { days } => {
                let days = days.unwrap_or(config.calendar.upcoming_days);
                upcoming_deadlines(repo, out, today, days).await
            }
            DeadlineCmd::Overdue => overdue_deadlines(repo, out, today).await,
            DeadlineCmd::Add {
                id,
                title,
                tax_type,
                due,
            } => {
                let deadline = ComplianceDeadline {
                    id,
                    title,
                    tax_type_id: tax_type,
                    due_date: due,
                    status: DeadlineStatus::Pending,
                };
                add_deadline(repo, out, deadline).await
            }
            DeadlineCmd::File { id } => file_deadline(repo, out, &id).await.map(|_| ()),
        },
    }
}

// ---------------------------------------------------------------------------
// rates / calculate
// ---------------------------------------------------------------------------

pub async fn print_rates<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
) -> Result<()> {
    let table = active_rate_table(repo).await?;

    writeln!(out, "{:<8} {:<28} {:>8}", "ID", "NAME", "RATE")?;
    for rate in table.iter() {
        writeln!(
            out,
            "{:<8} {:<28} {:>8}",
            rate.id,
            rate.name,
            format_percent(rate.rate)
        )?;
    }
    Ok(())
}

/// Calculates, prints, and with `save` persists the result as a scenario.
pub async fn calculate<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    income: Decimal,
    tax_type: &str,
    save: Option<&str>,
) -> Result<Option<TaxScenario>> {
    let table = active_rate_table(repo).await?;
    let result = TaxCalculator::new(&table).calculate(income, tax_type)?;

    let entry_name = result.detail_str("tax_type_name").unwrap_or(tax_type);
    writeln!(out, "Tax type:       {} ({})", entry_name, tax_type)?;
    writeln!(out, "Income:         {}", format_amount(income))?;
    if let Some(rate) = table.get(tax_type) {
        writeln!(out, "Rate:           {}", format_percent(rate.rate))?;
    }
    writeln!(out, "Tax amount:     {}", format_amount(result.tax_amount))?;
    writeln!(out, "Effective rate: {}", format_percent(result.effective_rate))?;

    let Some(name) = save else {
        return Ok(None);
    };

    let mut inputs = BTreeMap::new();
    inputs.insert("income".to_string(), json!(income.to_string()));
    inputs.insert("tax_type".to_string(), json!(tax_type));

    let mut store = load_store(repo).await?;
    let scenario = store.save_scenario(name, inputs, result).clone();
    repo.insert_scenario(&scenario)
        .await
        .context("Failed to save scenario")?;

    info!(id = %scenario.id, name = %scenario.name, "scenario saved");
    writeln!(out, "Saved scenario {} \"{}\"", scenario.id, scenario.name)?;
    Ok(Some(scenario))
}

// ---------------------------------------------------------------------------
// scenarios
// ---------------------------------------------------------------------------

fn write_scenario_table<'a, W: Write>(
    out: &mut W,
    scenarios: impl IntoIterator<Item = &'a TaxScenario>,
) -> Result<()> {
    writeln!(
        out,
        "{:<14} {:<10} {:<24} {:<6} {:>16} {:>16} {:>8}",
        "ID", "DATE", "NAME", "TYPE", "INCOME", "TAX", "EFF"
    )?;
    for scenario in scenarios {
        let income = scenario
            .result
            .detail_str("income")
            .and_then(|raw| raw.parse::<Decimal>().ok())
            .map(format_amount)
            .unwrap_or_default();
        writeln!(
            out,
            "{:<14} {:<10} {:<24} {:<6} {:>16} {:>16} {:>8}",
            scenario.id,
            scenario.date.format("%Y-%m-%d"),
            scenario.name,
            scenario.result.detail_str("tax_type").unwrap_or_default(),
            income,
            format_amount(scenario.result.tax_amount),
            format_percent(scenario.result.effective_rate)
        )?;
    }
    Ok(())
}

pub async fn list_scenarios<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
) -> Result<()> {
    let store = load_store(repo).await?;
    if store.is_empty() {
        writeln!(out, "No saved scenarios.")?;
        return Ok(());
    }
    write_scenario_table(out, store.scenarios())
}

pub async fn compare_scenarios<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    ids: &[ScenarioId],
) -> Result<()> {
    let store = load_store(repo).await?;
    let selected = store.compare_scenarios(ids.iter().copied());
    if selected.is_empty() {
        writeln!(out, "No matching scenarios.")?;
        return Ok(());
    }
    write_scenario_table(out, selected)
}

/// Deletes a scenario. An unknown id is reported, not treated as an error.
pub async fn delete_scenario<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    id: ScenarioId,
) -> Result<bool> {
    let mut store = load_store(repo).await?;
    if !store.delete_scenario(id) {
        writeln!(out, "No scenario with id {id}.")?;
        return Ok(false);
    }

    repo.delete_scenario(id)
        .await
        .with_context(|| format!("Failed to delete scenario {id}"))?;
    info!(%id, "scenario deleted");
    writeln!(out, "Deleted scenario {id}.")?;
    Ok(true)
}

pub async fn export_scenarios<W: Write>(
    repo: &dyn ComplianceRepository,
    writer: W,
) -> Result<usize> {
    let store = load_store(repo).await?;
    ScenarioExporter::write(writer, store.scenarios()).context("Failed to export scenarios")
}

// ---------------------------------------------------------------------------
// deadlines
// ---------------------------------------------------------------------------

async fn load_calendar(repo: &dyn ComplianceRepository) -> Result<ComplianceCalendar> {
    let deadlines = repo
        .list_deadlines()
        .await
        .context("Failed to load deadlines")?;
    Ok(ComplianceCalendar::new(deadlines))
}

fn write_deadlines<W: Write>(
    out: &mut W,
    deadlines: &[&ComplianceDeadline],
    empty_message: &str,
) -> Result<()> {
    if deadlines.is_empty() {
        writeln!(out, "{empty_message}")?;
        return Ok(());
    }
    for deadline in deadlines {
        writeln!(
            out,
            "{}  {:<16} {:<6} {}",
            deadline.due_date, deadline.id, deadline.tax_type_id, deadline.title
        )?;
    }
    Ok(())
}

pub async fn upcoming_deadlines<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    today: NaiveDate,
    days: u64,
) -> Result<()> {
    let calendar = load_calendar(repo).await?;
    let upcoming = calendar.upcoming(today, days);
    write_deadlines(out, &upcoming, &format!("Nothing due in the next {days} days."))
}

pub async fn overdue_deadlines<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    today: NaiveDate,
) -> Result<()> {
    let calendar = load_calendar(repo).await?;
    let overdue = calendar.overdue(today);
    write_deadlines(out, &overdue, "No overdue deadlines.")
}

pub async fn add_deadline<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    deadline: ComplianceDeadline,
) -> Result<()> {
    repo.insert_deadline(&deadline)
        .await
        .with_context(|| format!("Failed to add deadline '{}'", deadline.id))?;
    info!(id = %deadline.id, due = %deadline.due_date, "deadline added");
    writeln!(out, "Added deadline {} due {}.", deadline.id, deadline.due_date)?;
    Ok(())
}

/// Marks a deadline as filed. An unknown id is reported, not treated as an
/// error.
pub async fn file_deadline<W: Write>(
    repo: &dyn ComplianceRepository,
    out: &mut W,
    id: &str,
) -> Result<bool> {
    let mut calendar = load_calendar(repo).await?;
    if !calendar.set_status(id, DeadlineStatus::Filed) {
        writeln!(out, "No deadline with id {id}.")?;
        return Ok(false);
    }

    repo.update_deadline_status(id, DeadlineStatus::Filed)
        .await
        .with_context(|| format!("Failed to update deadline '{id}'"))?;
    info!(id, "deadline filed");
    writeln!(out, "Marked {id} as filed.")?;
    Ok(true)
}
