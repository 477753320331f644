//! Compliance calendar: filing deadlines and the date filters the dashboard
//! views are built from.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use compliance_core::{ComplianceCalendar, ComplianceDeadline, DeadlineStatus};
//!
//! let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
//!
//! let calendar = ComplianceCalendar::new(vec![
//!     ComplianceDeadline {
//!         id: "vat-q1".to_string(),
//!         title: "VAT return Q1".to_string(),
//!         tax_type_id: "vat".to_string(),
//!         due_date: date(4, 30),
//!         status: DeadlineStatus::Pending,
//!     },
//! ]);
//!
//! assert_eq!(calendar.upcoming(date(4, 15), 30).len(), 1);
//! assert_eq!(calendar.overdue(date(5, 1)).len(), 1);
//! ```

use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;

use crate::{ComplianceDeadline, DeadlineStatus};

/// Deadlines ordered by due date (ties broken by id).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceCalendar {
    deadlines: Vec<ComplianceDeadline>,
}

impl ComplianceCalendar {
    pub fn new(mut deadlines: Vec<ComplianceDeadline>) -> Self {
        deadlines.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Self { deadlines }
    }

    /// Inserts a deadline at its sorted position.
    pub fn add(
        &mut self,
        deadline: ComplianceDeadline,
    ) {
        let index = self
            .deadlines
            .partition_point(|d| (d.due_date, d.id.as_str()) <= (deadline.due_date, deadline.id.as_str()));
        self.deadlines.insert(index, deadline);
    }

    pub fn deadlines(&self) -> &[ComplianceDeadline] {
        &self.deadlines
    }

    /// Pending deadlines due between `today` and `today + within_days`,
    /// both inclusive.
    pub fn upcoming(
        &self,
        today: NaiveDate,
        within_days: u64,
    ) -> Vec<&ComplianceDeadline> {
        let horizon = today
            .checked_add_days(Days::new(within_days))
            .unwrap_or(NaiveDate::MAX);

        self.pending()
            .filter(|d| d.due_date >= today && d.due_date <= horizon)
            .collect()
    }

    /// Pending deadlines whose due date is before `today`.
    pub fn overdue(
        &self,
        today: NaiveDate,
    ) -> Vec<&ComplianceDeadline> {
        self.pending().filter(|d| d.due_date < today).collect()
    }

    /// Every deadline falling in the given month, regardless of status.
    pub fn for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Vec<&ComplianceDeadline> {
        self.deadlines
            .iter()
            .filter(|d| d.due_date.year() == year && d.due_date.month() == month)
            .collect()
    }

    /// Updates the status of the deadline with the given id.
    ///
    /// Returns `false` (and changes nothing) if the id is unknown.
    pub fn set_status(
        &mut self,
        id: &str,
        status: DeadlineStatus,
    ) -> bool {
        match self.deadlines.iter_mut().find(|d| d.id == id) {
            Some(deadline) => {
                debug!(id, status = status.as_str(), "updating deadline status");
                deadline.status = status;
                true
            }
            None => false,
        }
    }

    fn pending(&self) -> impl Iterator<Item = &ComplianceDeadline> {
        self.deadlines
            .iter()
            .filter(|d| d.status == DeadlineStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(
        month: u32,
        day: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
    }

    fn deadline(
        id: &str,
        due_date: NaiveDate,
        status: DeadlineStatus,
    ) -> ComplianceDeadline {
        ComplianceDeadline {
            id: id.to_string(),
            title: format!("{id} filing"),
            tax_type_id: "vat".to_string(),
            due_date,
            status,
        }
    }

    fn ids(deadlines: &[&ComplianceDeadline]) -> Vec<String> {
        deadlines.iter().map(|d| d.id.clone()).collect()
    }

    fn sample_calendar() -> ComplianceCalendar {
        ComplianceCalendar::new(vec![
            deadline("cit-annual", date(6, 30), DeadlineStatus::Pending),
            deadline("vat-q1", date(4, 30), DeadlineStatus::Pending),
            deadline("wht-mar", date(3, 15), DeadlineStatus::Pending),
            deadline("wht-apr", date(4, 15), DeadlineStatus::Filed),
        ])
    }

    #[test]
    fn new_sorts_by_due_date() {
        let calendar = sample_calendar();

        let order: Vec<_> = calendar.deadlines().iter().map(|d| d.id.as_str()).collect();

        assert_eq!(order, vec!["wht-mar", "wht-apr", "vat-q1", "cit-annual"]);
    }

    #[test]
    fn add_keeps_order() {
        let mut calendar = sample_calendar();

        calendar.add(deadline("pit-may", date(5, 1), DeadlineStatus::Pending));
        calendar.add(deadline("aaa-same-day", date(4, 30), DeadlineStatus::Pending));

        let order: Vec<_> = calendar.deadlines().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            order,
            vec!["wht-mar", "wht-apr", "aaa-same-day", "vat-q1", "pit-may", "cit-annual"]
        );
    }

    #[test]
    fn upcoming_includes_window_bounds() {
        let calendar = sample_calendar();

        // 2025-04-01 + 29 days = 2025-04-30
        let upcoming = calendar.upcoming(date(4, 1), 29);

        assert_eq!(ids(&upcoming), vec!["vat-q1"]);
    }

    #[test]
    fn upcoming_includes_due_today() {
        let calendar = sample_calendar();

        let upcoming = calendar.upcoming(date(3, 15), 0);

        assert_eq!(ids(&upcoming), vec!["wht-mar"]);
    }

    #[test]
    fn upcoming_skips_non_pending() {
        let calendar = sample_calendar();

        let upcoming = calendar.upcoming(date(4, 10), 10);

        assert!(upcoming.is_empty(), "filed deadline should not be listed");
    }

    #[test]
    fn upcoming_with_huge_window_does_not_overflow() {
        let calendar = sample_calendar();

        let upcoming = calendar.upcoming(date(1, 1), u64::MAX);

        assert_eq!(upcoming.len(), 3);
    }

    #[test]
    fn overdue_lists_pending_before_today() {
        let calendar = sample_calendar();

        let overdue = calendar.overdue(date(5, 1));

        assert_eq!(ids(&overdue), vec!["wht-mar", "vat-q1"]);
    }

    #[test]
    fn overdue_excludes_due_today() {
        let calendar = sample_calendar();

        assert!(calendar.overdue(date(3, 15)).is_empty());
    }

    #[test]
    fn for_month_ignores_status() {
        let calendar = sample_calendar();

        let april = calendar.for_month(2025, 4);

        assert_eq!(ids(&april), vec!["wht-apr", "vat-q1"]);
        assert!(calendar.for_month(2024, 4).is_empty());
    }

    #[test]
    fn set_status_updates_known_deadline() {
        let mut calendar = sample_calendar();

        assert!(calendar.set_status("vat-q1", DeadlineStatus::Filed));

        assert!(calendar.overdue(date(5, 1)).iter().all(|d| d.id != "vat-q1"));
    }

    #[test]
    fn set_status_unknown_id_is_a_no_op() {
        let mut calendar = sample_calendar();
        let before = calendar.clone();

        assert!(!calendar.set_status("missing", DeadlineStatus::Waived));
        assert_eq!(calendar, before);
    }

    #[test]
    fn status_codes_round_trip_through_parse() {
        for status in [DeadlineStatus::Pending, DeadlineStatus::Filed, DeadlineStatus::Waived] {
            assert_eq!(DeadlineStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeadlineStatus::parse("late"), None);
    }
}
