use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use compliance_core::{
    ComplianceDeadline, ComplianceRepository, DeadlineStatus, RepositoryError, ScenarioId,
    TaxCalculationResult, TaxRate, TaxScenario,
};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use sqlx::Row;
use tracing::debug;

use crate::decimal::get_decimal;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Execute every `.sql` file in `seeds_dir`, in filename order.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            debug!(file = %path.display(), "running seed file");
            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Writes `rates` in a single transaction, optionally clearing the table
    /// first. Dropping the transaction on error rolls it back.
    async fn write_tax_rates(
        &self,
        rates: &[TaxRate],
        clear: bool,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if clear {
            sqlx::query("DELETE FROM tax_rate")
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        }
        for rate in rates {
            upsert_rate_query(rate)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        debug!(count = rates.len(), clear, "tax rates written");
        Ok(())
    }
}

fn upsert_rate_query(rate: &TaxRate) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        "INSERT INTO tax_rate (id, name, rate) VALUES (?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, rate = excluded.rate",
    )
    .bind(&rate.id)
    .bind(&rate.name)
    .bind(rate.rate.to_string())
}

fn get_string(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn get_json_map(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<BTreeMap<String, Value>, RepositoryError> {
    let raw = get_string(row, column)?;
    serde_json::from_str(&raw)
        .map_err(|e| RepositoryError::Database(format!("Invalid JSON in {}: {}", column, e)))
}

fn to_json(map: &BTreeMap<String, Value>) -> Result<String, RepositoryError> {
    serde_json::to_string(map).map_err(|e| RepositoryError::Database(e.to_string()))
}

fn row_to_tax_rate(row: &sqlx::sqlite::SqliteRow) -> Result<TaxRate, RepositoryError> {
    Ok(TaxRate {
        id: get_string(row, "id")?,
        name: get_string(row, "name")?,
        rate: get_decimal(row, "rate")?,
    })
}

fn row_to_scenario(row: &sqlx::sqlite::SqliteRow) -> Result<TaxScenario, RepositoryError> {
    Ok(TaxScenario {
        id: ScenarioId(
            row.try_get("id")
                .map_err(|e| RepositoryError::Database(e.to_string()))?,
        ),
        name: get_string(row, "name")?,
        inputs: get_json_map(row, "inputs")?,
        result: TaxCalculationResult {
            tax_amount: get_decimal(row, "tax_amount")?,
            effective_rate: get_decimal(row, "effective_rate")?,
            details: get_json_map(row, "details")?,
        },
        date: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_deadline(row: &sqlx::sqlite::SqliteRow) -> Result<ComplianceDeadline, RepositoryError> {
    let status = get_string(row, "status")?;
    Ok(ComplianceDeadline {
        id: get_string(row, "id")?,
        title: get_string(row, "title")?,
        tax_type_id: get_string(row, "tax_type_id")?,
        due_date: row
            .try_get::<NaiveDate, _>("due_date")
            .map_err(|e| RepositoryError::Database(format!("Failed to get due_date: {}", e)))?,
        status: DeadlineStatus::parse(&status).ok_or_else(|| {
            RepositoryError::Database(format!("Unknown deadline status '{}'", status))
        })?,
    })
}

#[async_trait]
impl ComplianceRepository for SqliteRepository {
    async fn list_tax_rates(&self) -> Result<Vec<TaxRate>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, rate FROM tax_rate ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_tax_rate).collect()
    }

    async fn upsert_tax_rate(
        &self,
        rate: &TaxRate,
    ) -> Result<(), RepositoryError> {
        upsert_rate_query(rate)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_tax_rates(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM tax_rate")
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn upsert_tax_rates(
        &self,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError> {
        self.write_tax_rates(rates, false).await
    }

    async fn replace_tax_rates(
        &self,
        rates: &[TaxRate],
    ) -> Result<(), RepositoryError> {
        self.write_tax_rates(rates, true).await
    }

    async fn insert_scenario(
        &self,
        scenario: &TaxScenario,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_scenario (
                id, name, inputs, tax_amount, effective_rate, details, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(scenario.id.as_i64())
        .bind(&scenario.name)
        .bind(to_json(&scenario.inputs)?)
        .bind(scenario.result.tax_amount.to_string())
        .bind(scenario.result.effective_rate.to_string())
        .bind(to_json(&scenario.result.details)?)
        .bind(scenario.date)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_scenario(
        &self,
        id: ScenarioId,
    ) -> Result<TaxScenario, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, inputs, tax_amount, effective_rate, details, created_at
             FROM tax_scenario WHERE id = ?",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_scenario(&row)
    }

    async fn list_scenarios(&self) -> Result<Vec<TaxScenario>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, inputs, tax_amount, effective_rate, details, created_at
             FROM tax_scenario ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_scenario).collect()
    }

    async fn delete_scenario(
        &self,
        id: ScenarioId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_scenario WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn insert_deadline(
        &self,
        deadline: &ComplianceDeadline,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO compliance_deadline (id, title, tax_type_id, due_date, status)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&deadline.id)
        .bind(&deadline.title)
        .bind(&deadline.tax_type_id)
        .bind(deadline.due_date)
        .bind(deadline.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_deadlines(&self) -> Result<Vec<ComplianceDeadline>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, tax_type_id, due_date, status
             FROM compliance_deadline ORDER BY due_date, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_deadline).collect()
    }

    async fn update_deadline_status(
        &self,
        id: &str,
        status: DeadlineStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE compliance_deadline SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
