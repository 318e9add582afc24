//! Complaint data model: the record, its status machine, and filters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifiers::geo::GeoLocation;
use crate::enrichment::{Category, Sentiment};

/// Lifecycle status of a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Open,
    Closed,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Only open → closed is a legal transition.
    pub fn can_transition_to(&self, target: ComplaintStatus) -> bool {
        matches!((self, target), (Self::Open, Self::Closed))
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid status '{s}' (expected open or closed)")),
        }
    }
}

/// A persisted customer complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    /// Store-assigned, strictly increasing.
    pub id: i64,
    pub text: String,
    pub status: ComplaintStatus,
    /// Creation instant.
    pub timestamp: DateTime<Utc>,
    pub sentiment: Sentiment,
    pub category: Category,
    /// Present only when spam checking ran and succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spam_flag: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spam_score: Option<f64>,
    /// Present only when geolocation ran and succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoLocation>,
}

/// Read filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    /// Inclusive lower bound on `timestamp`.
    pub since: Option<DateTime<Utc>>,
}

impl ComplaintFilter {
    pub fn with_status(mut self, status: ComplaintStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}
