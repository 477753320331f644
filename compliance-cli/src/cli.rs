use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use compliance_core::ScenarioId;
use rust_decimal::Decimal;

use crate::config::ConfigOverrides;
use crate::utils::parse_decimal;

/// Tax rates, saved calculation scenarios and filing deadlines.
#[derive(Debug, Parser)]
#[command(name = "compliance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./compliance.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `compliance.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log level or filter directive (overridden by RUST_LOG).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend.clone(),
            db: self.db.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the active tax rate table.
    Rates,
    /// Calculate the tax owed on an income.
    Calculate {
        /// Taxable income (commas allowed, e.g. 1,250,000).
        #[arg(long, value_parser = parse_decimal, allow_hyphen_values = true)]
        income: Decimal,
        /// Tax-type identifier from the rate table (e.g. cit).
        #[arg(long)]
        tax_type: String,
        /// Save the result as a named scenario.
        #[arg(long)]
        save: Option<String>,
    },
    /// Saved scenarios.
    Scenarios {
        #[command(subcommand)]
        cmd: ScenarioCmd,
    },
    /// Compliance calendar.
    Deadlines {
        #[command(subcommand)]
        cmd: DeadlineCmd,
    },
}

#[derive(Debug, Subcommand)]
pub enum ScenarioCmd {
    /// List saved scenarios, oldest first.
    List,
    /// Show the given scenarios side by side.
    Compare {
        #[arg(required = true)]
        ids: Vec<ScenarioId>,
    },
    /// Delete a saved scenario.
    Delete { id: ScenarioId },
    /// Write all scenarios as CSV.
    Export {
        /// Output file (default: stdout).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum DeadlineCmd {
    /// Pending deadlines due within the next N days.
    Upcoming {
        /// Window in days (default from [calendar] upcoming_days).
        #[arg(long)]
        days: Option<u64>,
    },
    /// Pending deadlines already past due.
    Overdue,
    /// Add a deadline.
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        tax_type: String,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: NaiveDate,
    },
    /// Mark a deadline as filed.
    File { id: String },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_calculate_with_save() {
        let cli = Cli::try_parse_from([
            "compliance",
            "calculate",
            "--income",
            "1,000",
            "--tax-type",
            "cit",
            "--save",
            "Q1",
        ])
        .expect("valid args");

        match cli.command {
            Commands::Calculate {
                income,
                tax_type,
                save,
            } => {
                assert_eq!(income, dec!(1000));
                assert_eq!(tax_type, "cit");
                assert_eq!(save.as_deref(), Some("Q1"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_negative_income() {
        let cli = Cli::try_parse_from(["compliance", "calculate", "--income", "-50", "--tax-type", "vat"])
            .expect("valid args");

        assert!(matches!(cli.command, Commands::Calculate { income, .. } if income == dec!(-50)));
    }

    #[test]
    fn rejects_invalid_income() {
        let result =
            Cli::try_parse_from(["compliance", "calculate", "--income", "lots", "--tax-type", "cit"]);

        assert!(result.is_err());
    }

    #[test]
    fn rejects_blank_income() {
        let result =
            Cli::try_parse_from(["compliance", "calculate", "--income", " ", "--tax-type", "cit"]);

        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["compliance", "rates", "--db", ":memory:", "--log-level", "debug"])
            .expect("valid args");

        assert_eq!(
            cli.overrides(),
            ConfigOverrides {
                backend: None,
                db: Some(":memory:".to_string()),
                log_level: Some("debug".to_string()),
            }
        );
    }

    #[test]
    fn parses_compare_ids() {
        let cli = Cli::try_parse_from(["compliance", "scenarios", "compare", "3", "1"])
            .expect("valid args");

        match cli.command {
            Commands::Scenarios {
                cmd: ScenarioCmd::Compare { ids },
            } => assert_eq!(ids, vec![ScenarioId(3), ScenarioId(1)]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn compare_requires_ids() {
        assert!(Cli::try_parse_from(["compliance", "scenarios", "compare"]).is_err());
    }

    #[test]
    fn parses_deadline_add() {
        let cli = Cli::try_parse_from([
            "compliance",
            "deadlines",
            "add",
            "--id",
            "vat-q1",
            "--title",
            "VAT return Q1",
            "--tax-type",
            "vat",
            "--due",
            "2025-04-30",
        ])
        .expect("valid args");

        match cli.command {
            Commands::Deadlines {
                cmd: DeadlineCmd::Add { id, due, .. },
            } => {
                assert_eq!(id, "vat-q1");
                assert_eq!(due, NaiveDate::from_ymd_opt(2025, 4, 30).expect("valid date"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_due_date() {
        let result = Cli::try_parse_from([
            "compliance", "deadlines", "add", "--id", "x", "--title", "X", "--tax-type", "vat",
            "--due", "30/04/2025",
        ]);

        assert!(result.is_err());
    }
}
