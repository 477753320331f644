use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{ScenarioId, ScenarioInputs, TaxCalculationResult, TaxScenario};

/// Ordered, in-memory collection of [`TaxScenario`]s plus a "current"
/// selection.
///
/// Scenarios are kept in save order. The current selection is held as a
/// [`ScenarioId`] and resolved on access, so deleting a scenario can never
/// leave a dangling selection behind.
///
/// Every operation is total: unknown ids produce empty results or no-ops.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use compliance_core::{ScenarioInputs, ScenarioStore, TaxCalculator};
///
/// let result = TaxCalculator::standard().calculate(dec!(1000), "cit").unwrap();
///
/// let mut store = ScenarioStore::new();
/// let id = store.save_scenario("Q1", ScenarioInputs::new(), result).id;
///
/// assert_eq!(store.current_scenario().map(|s| s.name.as_str()), Some("Q1"));
///
/// store.delete_scenario(id);
/// assert!(store.is_empty());
/// assert!(store.current_scenario().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioStore {
    scenarios: Vec<TaxScenario>,
    current: Option<ScenarioId>,
    last_issued: Option<i64>,
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from previously persisted scenarios.
    ///
    /// Order is preserved and nothing is selected. If two records share an
    /// id only the first is kept. New ids continue after the largest loaded
    /// id.
    pub fn from_scenarios(scenarios: Vec<TaxScenario>) -> Self {
        let mut seen = HashSet::with_capacity(scenarios.len());
        let mut kept = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            if seen.insert(scenario.id) {
                kept.push(scenario);
            } else {
                warn!(id = %scenario.id, "dropping scenario with duplicate id");
            }
        }

        let last_issued = kept.iter().map(|s| s.id.as_i64()).max();

        Self {
            scenarios: kept,
            current: None,
            last_issued,
        }
    }

    /// Saves a new scenario stamped with the current time.
    ///
    /// See [`Self::save_scenario_at`].
    pub fn save_scenario(
        &mut self,
        name: impl Into<String>,
        inputs: ScenarioInputs,
        result: TaxCalculationResult,
    ) -> &TaxScenario {
        self.save_scenario_at(name, inputs, result, Utc::now())
    }

    /// Saves a new scenario with an explicit creation time.
    ///
    /// The scenario gets a fresh id derived from `at`, is appended to the
    /// end of the sequence and becomes the current scenario. Never fails.
    pub fn save_scenario_at(
        &mut self,
        name: impl Into<String>,
        inputs: ScenarioInputs,
        result: TaxCalculationResult,
        at: DateTime<Utc>,
    ) -> &TaxScenario {
        let id = self.next_id(at);
        let scenario = TaxScenario {
            id,
            name: name.into(),
            inputs,
            result,
            date: at,
        };

        debug!(id = %id, name = %scenario.name, "saving scenario");
        self.scenarios.push(scenario);
        self.current = Some(id);

        let index = self.scenarios.len() - 1;
        &self.scenarios[index]
    }

    /// Returns every scenario whose id is in `ids`, in store order.
    ///
    /// Ids with no matching scenario are skipped.
    pub fn compare_scenarios<I>(
        &self,
        ids: I,
    ) -> Vec<&TaxScenario>
    where
        I: IntoIterator<Item = ScenarioId>,
    {
        let wanted: HashSet<ScenarioId> = ids.into_iter().collect();
        self.scenarios
            .iter()
            .filter(|scenario| wanted.contains(&scenario.id))
            .collect()
    }

    /// Removes the scenario with the given id.
    ///
    /// Clears the current selection if it pointed at the removed scenario.
    /// Returns whether anything was removed; deleting an unknown id leaves
    /// the store untouched.
    pub fn delete_scenario(
        &mut self,
        id: ScenarioId,
    ) -> bool {
        let Some(index) = self.position(id) else {
            debug!(id = %id, "delete requested for unknown scenario");
            return false;
        };

        self.scenarios.remove(index);
        if self.current == Some(id) {
            self.current = None;
        }
        debug!(id = %id, "deleted scenario");
        true
    }

    /// Selects the current scenario, or clears the selection with `None`.
    ///
    /// An id that is not in the store clears the selection.
    pub fn set_current_scenario(
        &mut self,
        id: Option<ScenarioId>,
    ) {
        self.current = match id {
            Some(id) if self.position(id).is_some() => Some(id),
            Some(id) => {
                warn!(id = %id, "scenario is not in this store; clearing current selection");
                None
            }
            None => None,
        };
    }

    pub fn current_scenario(&self) -> Option<&TaxScenario> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn current_id(&self) -> Option<ScenarioId> {
        self.current
    }

    pub fn get(
        &self,
        id: ScenarioId,
    ) -> Option<&TaxScenario> {
        self.scenarios.iter().find(|scenario| scenario.id == id)
    }

    /// All scenarios in save order.
    pub fn scenarios(&self) -> &[TaxScenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    fn position(
        &self,
        id: ScenarioId,
    ) -> Option<usize> {
        self.scenarios.iter().position(|scenario| scenario.id == id)
    }

    /// Creation-time millis, bumped past the last issued id when the clock
    /// has not moved on (or went backwards).
    ///
    /// Once `i64::MAX` has been issued the sequence is exhausted and the
    /// largest id not held by any scenario in the store is reused instead.
    fn next_id(
        &mut self,
        at: DateTime<Utc>,
    ) -> ScenarioId {
        let millis = at.timestamp_millis();
        let id = match self.last_issued {
            Some(last) if millis <= last => match last.checked_add(1) {
                Some(next) => next,
                None => self.largest_free_id(),
            },
            _ => millis,
        };
        self.last_issued = Some(self.last_issued.map_or(id, |last| last.max(id)));
        ScenarioId(id)
    }

    fn largest_free_id(&self) -> i64 {
        let taken: HashSet<i64> = self.scenarios.iter().map(|s| s.id.as_i64()).collect();
        let id = (i64::MIN..=i64::MAX)
            .rev()
            .find(|id| !taken.contains(id))
            .unwrap_or(i64::MIN);
        warn!(id, "scenario ids exhausted; reusing a free id");
        id
    }
}
