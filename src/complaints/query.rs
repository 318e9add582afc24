//! Query service for reads and status changes over stored complaints.
//!
//! Raw filter strings are validated here so malformed input never
//! reaches the store.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use super::model::{Complaint, ComplaintFilter, ComplaintStatus};
use crate::error::ComplaintError;
use crate::store::ComplaintStore;

pub struct QueryService {
    store: Arc<dyn ComplaintStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn ComplaintStore>) -> Self {
        Self { store }
    }

    /// Complaints matching the optional filters, ordered by id ascending.
    pub async fn list(
        &self,
        status: Option<&str>,
        since: Option<&str>,
    ) -> Result<Vec<Complaint>, ComplaintError> {
        let mut filter = ComplaintFilter::default();
        if let Some(raw) = status {
            filter = filter.with_status(parse_status(raw)?);
        }
        if let Some(raw) = since {
            filter = filter.with_since(parse_since(raw)?);
        }

        let complaints = self.store.get_by_filter(&filter).await?;
        debug!(
            status = ?filter.status,
            since = ?filter.since,
            count = complaints.len(),
            "Listed complaints"
        );
        Ok(complaints)
    }

    pub async fn get(&self, id: i64) -> Result<Complaint, ComplaintError> {
        self.store
            .get(id)
            .await?
            .ok_or(ComplaintError::NotFound { id })
    }

    /// Validate `new_status` and apply it.
    pub async fn update_status(
        &self,
        id: i64,
        new_status: &str,
    ) -> Result<Complaint, ComplaintError> {
        let status = parse_status(new_status)?;
        self.store.update_status(id, status).await
    }
}

fn parse_status(raw: &str) -> Result<ComplaintStatus, ComplaintError> {
    raw.parse().map_err(ComplaintError::InvalidInput)
}

/// Parse a `since` bound: RFC 3339, or a naive date-time / date taken as UTC.
///
/// An unencoded `+` offset arrives from a query string as a space, so
/// `2025-01-01T10:00:00 02:00` is read as `+02:00`. The UTC year must lie
/// in 0000..=9999.
pub fn parse_since(raw: &str) -> Result<DateTime<Utc>, ComplaintError> {
    let s = raw.trim();

    let parsed = parse_instant(s).or_else(|| {
        s.contains(' ')
            .then(|| parse_instant(&s.replace(' ', "+")))
            .flatten()
    });

    match parsed {
        Some(dt) if (0..=9999).contains(&dt.year()) => Ok(dt),
        Some(dt) => Err(ComplaintError::InvalidInput(format!(
            "since '{raw}' is out of range (year {} outside 0000..=9999)",
            dt.year()
        ))),
        None => Err(ComplaintError::InvalidInput(format!(
            "invalid since '{raw}' (expected ISO-8601, e.g. 2025-01-31T12:00:00Z or 2025-01-31)"
        ))),
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
