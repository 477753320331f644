use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TaxCalculationResult;

/// Caller-supplied calculation inputs, keyed by field name.
pub type ScenarioInputs = BTreeMap<String, Value>;

/// Identifier of a saved scenario.
///
/// Milliseconds since the Unix epoch at creation time, bumped when needed so
/// that ids handed out by one store are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub i64);

impl ScenarioId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScenarioId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ScenarioId)
    }
}

/// A named, timestamped pairing of calculation inputs and their result.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxScenario {
    pub id: ScenarioId,
    pub name: String,
    pub inputs: ScenarioInputs,
    pub result: TaxCalculationResult,
    pub date: DateTime<Utc>,
}
