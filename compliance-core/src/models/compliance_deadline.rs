use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineStatus {
    Pending,
    Filed,
    Waived,
}

impl DeadlineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Filed => "filed",
            Self::Waived => "waived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "filed" => Some(Self::Filed),
            "waived" => Some(Self::Waived),
            _ => None,
        }
    }
}

/// A dated filing obligation for one tax type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceDeadline {
    pub id: String,
    pub title: String,
    pub tax_type_id: String,
    pub due_date: NaiveDate,
    pub status: DeadlineStatus,
}
