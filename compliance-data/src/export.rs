//! CSV export of saved scenarios.

use std::io::Write;

use chrono::SecondsFormat;
use compliance_core::TaxScenario;
use compliance_core::calculations::common::{RATE_DECIMAL_PLACES, round_half_up, round_rate};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pads to exactly `dp` places so every row has the same shape.
fn with_scale(
    mut value: Decimal,
    dp: u32,
) -> Decimal {
    value.rescale(dp);
    value
}

#[derive(Debug, Serialize)]
struct ScenarioRow<'a> {
    id: i64,
    name: &'a str,
    date: String,
    tax_type: &'a str,
    income: String,
    tax_amount: Decimal,
    effective_rate: Decimal,
    inputs: String,
}

impl<'a> ScenarioRow<'a> {
    fn from_scenario(scenario: &'a TaxScenario) -> Result<Self, ExportError> {
        let result = &scenario.result;
        let income = match result.detail_str("income") {
            Some(raw) => raw
                .parse::<Decimal>()
                .map(|d| with_scale(round_half_up(d), 2).to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => String::new(),
        };

        Ok(Self {
            id: scenario.id.as_i64(),
            name: &scenario.name,
            date: scenario.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            tax_type: result.detail_str("tax_type").unwrap_or_default(),
            income,
            tax_amount: with_scale(round_half_up(result.tax_amount), 2),
            effective_rate: with_scale(round_rate(result.effective_rate), RATE_DECIMAL_PLACES),
            inputs: serde_json::to_string(&scenario.inputs)?,
        })
    }
}

/// Writes scenarios as CSV with the header
/// `id,name,date,tax_type,income,tax_amount,effective_rate,inputs`.
pub struct ScenarioExporter;

impl ScenarioExporter {
    /// Write one row per scenario, in the order given. Returns the row count.
    pub fn write<W: Write>(
        writer: W,
        scenarios: &[TaxScenario],
    ) -> Result<usize, ExportError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(writer);

        if scenarios.is_empty() {
            csv_writer.write_record([
                "id",
                "name",
                "date",
                "tax_type",
                "income",
                "tax_amount",
                "effective_rate",
                "inputs",
            ])?;
        }

        for scenario in scenarios {
            csv_writer.serialize(ScenarioRow::from_scenario(scenario)?)?;
        }

        csv_writer.flush()?;
        Ok(scenarios.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use compliance_core::{ScenarioId, TaxCalculationResult};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn scenario(
        id: i64,
        name: &str,
        income: Decimal,
        tax_amount: Decimal,
        effective_rate: Decimal,
    ) -> TaxScenario {
        let mut inputs = BTreeMap::new();
        inputs.insert("income".to_string(), json!(income.to_string()));
        inputs.insert("tax_type".to_string(), json!("cit"));

        let mut details = BTreeMap::new();
        details.insert("tax_type".to_string(), json!("cit"));
        details.insert("income".to_string(), json!(income.to_string()));

        TaxScenario {
            id: ScenarioId(id),
            name: name.to_string(),
            inputs,
            result: TaxCalculationResult {
                tax_amount,
                effective_rate,
                details,
            },
            date: Utc
                .with_ymd_and_hms(2025, 3, 31, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn export(scenarios: &[TaxScenario]) -> String {
        let mut buf = Vec::new();
        ScenarioExporter::write(&mut buf, scenarios).expect("export should succeed");
        String::from_utf8(buf).expect("utf-8 output")
    }

    #[test]
    fn test_write_rounds_amounts_and_rates() {
        let output = export(&[scenario(
            1,
            "Q1 Projection",
            dec!(333.335),
            dec!(100.0005),
            dec!(0.300001),
        )]);

        assert_eq!(
            output,
            "id,name,date,tax_type,income,tax_amount,effective_rate,inputs\n\
             1,Q1 Projection,2025-03-31T09:30:00Z,cit,333.34,100.00,0.3000,\"{\"\"income\"\":\"\"333.335\"\",\"\"tax_type\"\":\"\"cit\"\"}\"\n"
        );
    }

    #[test]
    fn test_write_keeps_given_order() {
        let output = export(&[
            scenario(2, "second", dec!(10), dec!(3), dec!(0.3)),
            scenario(1, "first", dec!(10), dec!(3), dec!(0.3)),
        ]);

        let names: Vec<_> = output
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_write_empty_still_has_header() {
        let output = export(&[]);

        assert_eq!(
            output,
            "id,name,date,tax_type,income,tax_amount,effective_rate,inputs\n"
        );
    }

    #[test]
    fn test_write_quotes_names_with_commas() {
        let output = export(&[scenario(3, "Plan A, revised", dec!(1), dec!(0.3), dec!(0.3))]);

        assert!(output.contains("\"Plan A, revised\""));
    }

    #[test]
    fn test_write_pads_to_fixed_places() {
        let output = export(&[scenario(4, "round", dec!(100), dec!(30), dec!(0.3))]);

        let row = output.lines().nth(1).unwrap_or_default();
        assert!(row.starts_with("4,round,2025-03-31T09:30:00Z,cit,100.00,30.00,0.3000,"));
    }

    #[test]
    fn test_write_returns_row_count() {
        let mut buf = Vec::new();

        let written = ScenarioExporter::write(
            &mut buf,
            &[
                scenario(1, "a", dec!(1), dec!(0.3), dec!(0.3)),
                scenario(2, "b", dec!(1), dec!(0.3), dec!(0.3)),
            ],
        )
        .expect("export should succeed");

        assert_eq!(written, 2);
    }
}
