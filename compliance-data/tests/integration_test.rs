//! Integration tests for rate loading and scenario export against the SQLite
//! backend.

use std::collections::BTreeMap;
use std::path::PathBuf;

use compliance_core::{ComplianceRepository, ScenarioStore, TaxCalculator};
use compliance_data::{ScenarioExporter, TaxRateLoader, TaxRateLoaderError};
use compliance_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_RATES_CSV: &str = include_str!("../test-data/tax_rates.csv");

/// Test database with migrations run but no seed data.
async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    repo
}

fn sqlite_seeds_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("compliance-db-sqlite")
        .join("seeds")
}

#[tokio::test]
async fn test_load_all_rates() {
    let repo = setup_test_db().await;
    let records = TaxRateLoader::parse(TEST_RATES_CSV.as_bytes()).expect("Failed to parse CSV");

    let loaded = TaxRateLoader::load(&repo, &records)
        .await
        .expect("Failed to load rates");

    assert_eq!(loaded, 5);
    let rates = repo.list_tax_rates().await.expect("Should list rates");
    let ids: Vec<_> = rates.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["cit", "vat", "wht", "pit", "gst"]);
    assert_eq!(rates[1].rate, dec!(0.20));
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let repo = setup_test_db().await;
    let records = TaxRateLoader::parse(TEST_RATES_CSV.as_bytes()).expect("Failed to parse CSV");

    TaxRateLoader::load(&repo, &records).await.expect("first load");
    TaxRateLoader::load(&repo, &records).await.expect("second load");

    let rates = repo.list_tax_rates().await.expect("Should list rates");
    assert_eq!(rates.len(), 5);
}

#[tokio::test]
async fn test_load_updates_existing_rate() {
    let repo = setup_test_db().await;
    repo.run_seeds(&sqlite_seeds_dir())
        .await
        .expect("Failed to run seeds");
    let records = TaxRateLoader::parse("id,name,rate\ncit,Corporate Income Tax,25%\n".as_bytes())
        .expect("Failed to parse CSV");

    TaxRateLoader::load(&repo, &records).await.expect("load");

    let rates = repo.list_tax_rates().await.expect("Should list rates");
    assert_eq!(rates.len(), 4);
    assert_eq!(rates[0].rate, dec!(0.25));
}

#[tokio::test]
async fn test_replace_drops_rates_not_in_file() {
    let repo = setup_test_db().await;
    repo.run_seeds(&sqlite_seeds_dir())
        .await
        .expect("Failed to run seeds");
    let records = TaxRateLoader::parse("id,name,rate\ngst,Goods and Services Tax,0.10\n".as_bytes())
        .expect("Failed to parse CSV");

    let loaded = TaxRateLoader::replace(&repo, &records)
        .await
        .expect("replace");

    assert_eq!(loaded, 1);
    let rates = repo.list_tax_rates().await.expect("Should list rates");
    let ids: Vec<_> = rates.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["gst"]);
}

#[tokio::test]
async fn test_failed_replace_keeps_previous_rates() {
    let repo = setup_test_db().await;
    repo.run_seeds(&sqlite_seeds_dir())
        .await
        .expect("Failed to run seeds");
    sqlx::raw_sql(
        "CREATE TRIGGER reject_gst BEFORE INSERT ON tax_rate WHEN NEW.id = 'gst'
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    )
    .execute(repo.pool())
    .await
    .expect("Failed to create trigger");
    let records = TaxRateLoader::parse(
        "id,name,rate\nnew1,New Tax,0.05\ngst,Goods and Services Tax,0.10\n".as_bytes(),
    )
    .expect("Failed to parse CSV");

    let result = TaxRateLoader::replace(&repo, &records).await;

    assert!(matches!(result, Err(TaxRateLoaderError::Repository(_))));
    let rates = repo.list_tax_rates().await.expect("Should list rates");
    let ids: Vec<_> = rates.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["cit", "vat", "wht", "pit"]);
}

#[tokio::test]
async fn test_invalid_file_writes_nothing() {
    let repo = setup_test_db().await;
    let records = TaxRateLoader::parse("id,name,rate\ncit,A,0.30\nvat,B,1.5\n".as_bytes())
        .expect("Failed to parse CSV");

    let result = TaxRateLoader::replace(&repo, &records).await;

    assert!(matches!(result, Err(TaxRateLoaderError::InvalidTable(_))));
    assert!(repo.list_tax_rates().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_loaded_table_drives_calculation() {
    let repo = setup_test_db().await;
    let records = TaxRateLoader::parse(TEST_RATES_CSV.as_bytes()).expect("Failed to parse CSV");
    TaxRateLoader::load(&repo, &records).await.expect("load");

    let rates = repo.list_tax_rates().await.expect("Should list rates");
    let table = compliance_core::TaxRateTable::new(rates).expect("valid table");
    let calculator = TaxCalculator::new(&table);

    assert_eq!(calculator.calculate_tax(dec!(1000), "gst"), Ok(dec!(100.0)));
}

#[tokio::test]
async fn test_export_persisted_scenarios() {
    let repo = setup_test_db().await;
    let calculator = TaxCalculator::standard();
    let mut store = ScenarioStore::new();

    for (name, income) in [("Low", dec!(50000)), ("High", dec!(150000.555))] {
        let result = calculator.calculate(income, "cit").expect("known tax type");
        let mut inputs = BTreeMap::new();
        inputs.insert("income".to_string(), json!(income.to_string()));
        inputs.insert("tax_type".to_string(), json!("cit"));
        let scenario = store.save_scenario(name, inputs, result).clone();
        repo.insert_scenario(&scenario).await.expect("insert");
    }

    let scenarios = repo.list_scenarios().await.expect("list");
    let mut buf = Vec::new();
    let written = ScenarioExporter::write(&mut buf, &scenarios).expect("export");
    let output = String::from_utf8(buf).expect("utf-8");

    assert_eq!(written, 2);
    let rows: Vec<Vec<String>> = csv::Reader::from_reader(output.as_bytes())
        .records()
        .map(|r| r.expect("valid row").iter().map(str::to_string).collect())
        .collect();
    assert_eq!(rows[0][1], "Low");
    assert_eq!(rows[0][3], "cit");
    assert_eq!(rows[0][5], "15000.00");
    assert_eq!(rows[1][1], "High");
    assert_eq!(rows[1][4], "150000.56");
    assert_eq!(rows[1][5], "45000.17");
    assert_eq!(rows[1][6], "0.3000");
}
