//! libSQL backend — async `ComplaintStore` implementation.
//!
//! One shared connection serves every operation. Writes additionally go
//! through an async mutex so id assignment, timestamping and status
//! transitions happen one at a time.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, SubsecRound, TimeDelta, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::classifiers::geo::GeoLocation;
use crate::complaints::model::{Complaint, ComplaintFilter, ComplaintStatus};
use crate::enrichment::{Category, EnrichmentResult, Sentiment};
use crate::error::{ComplaintError, DatabaseError};
use crate::store::migrations;
use crate::store::traits::ComplaintStore;

const COLUMNS: &str = "id, text, status, timestamp, sentiment, category, spam_flag, spam_score, geo";

/// Last year whose timestamp key keeps the fixed four-digit width.
const MAX_KEY_YEAR: i32 = 9999;

/// libSQL complaint store.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    /// Held for every write. Remembers the last timestamp handed out so a
    /// clock step backwards cannot reorder timestamps against ids.
    write_lock: Mutex<Option<DateTime<Utc>>>,
}

impl LibSqlBackend {
    /// Open `path`, or an in-memory database when it is `:memory:`.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        if path.as_os_str() == ":memory:" {
            Self::new_memory().await
        } else {
            Self::new_local(path).await
        }
    }

    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (tests, throwaway runs).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!("In-memory database opened");
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(None),
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn fetch(&self, id: i64) -> Result<Option<Complaint>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {COLUMNS} FROM complaints WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get: {e}")))?
        {
            Some(row) => Ok(Some(row_to_complaint(&row)?)),
            None => Ok(None),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Fixed-width RFC 3339 with microseconds, so lexical order is time order.
fn timestamp_key(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Stored timestamps carry microseconds; round a finer bound up so that
/// `>=` on the stored text agrees with `>=` on the instant.
///
/// `None` means the bound lies past every representable key and no row
/// can match.
fn since_key(since: &DateTime<Utc>) -> Option<String> {
    let floor = since.trunc_subsecs(6);
    let bound = if floor < *since {
        floor.checked_add_signed(TimeDelta::microseconds(1))?
    } else {
        floor
    };
    (bound.year() <= MAX_KEY_YEAR).then(|| timestamp_key(&bound))
}

/// Parse a stored timestamp. Accepts naive SQLite datetimes as UTC.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn opt_integer(v: Option<i64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Integer(v),
        None => libsql::Value::Null,
    }
}

fn opt_real(v: Option<f64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Real(v),
        None => libsql::Value::Null,
    }
}

fn row_to_complaint(row: &libsql::Row) -> Result<Complaint, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("complaint.id: {e}")))?;
    let text: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("complaint.text: {e}")))?;

    let status_str: String = row.get(2).unwrap_or_else(|_| "open".to_string());
    let status = status_str.parse().unwrap_or(ComplaintStatus::Open);

    let timestamp_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("complaint.timestamp: {e}")))?;

    let sentiment_str: String = row.get(4).unwrap_or_default();
    let sentiment = sentiment_str.parse().unwrap_or(Sentiment::Unknown);

    let category_str: String = row.get(5).unwrap_or_default();
    let category = category_str.parse().unwrap_or(Category::Other);

    let spam_flag: Option<i64> = row.get(6).ok();
    let spam_score: Option<f64> = row.get(7).ok();

    let geo_str: Option<String> = row.get(8).ok();
    let geo = geo_str
        .filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str::<GeoLocation>(&s).ok());

    Ok(Complaint {
        id,
        text,
        status,
        timestamp: parse_datetime(&timestamp_str),
        sentiment,
        category,
        spam_flag: spam_flag.map(|v| v != 0),
        spam_score,
        geo,
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ComplaintStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn create(
        &self,
        text: &str,
        enrichment: &EnrichmentResult,
    ) -> Result<Complaint, ComplaintError> {
        let geo_json = enrichment
            .geo
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DatabaseError::Serialization(format!("complaint.geo: {e}")))?;

        let mut last_timestamp = self.write_lock.lock().await;
        let now = Utc::now().trunc_subsecs(6);
        let timestamp = match *last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        self.conn()
            .execute(
                "INSERT INTO complaints (text, status, timestamp, sentiment, category, spam_flag, spam_score, geo)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    text,
                    ComplaintStatus::Open.as_str(),
                    timestamp_key(&timestamp),
                    enrichment.sentiment.as_str(),
                    enrichment.category.as_str(),
                    opt_integer(enrichment.spam.map(|s| s.is_spam as i64)),
                    opt_real(enrichment.spam.map(|s| s.score)),
                    opt_text(geo_json),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create: {e}")))?;

        let id = self.conn().last_insert_rowid();
        *last_timestamp = Some(timestamp);
        drop(last_timestamp);

        debug!(id, sentiment = %enrichment.sentiment, category = %enrichment.category, "Complaint stored");

        Ok(Complaint {
            id,
            text: text.to_string(),
            status: ComplaintStatus::Open,
            timestamp,
            sentiment: enrichment.sentiment,
            category: enrichment.category,
            spam_flag: enrichment.spam.map(|s| s.is_spam),
            spam_score: enrichment.spam.map(|s| s.score),
            geo: enrichment.geo.clone(),
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Complaint>, ComplaintError> {
        Ok(self.fetch(id).await?)
    }

    async fn get_by_filter(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>, ComplaintError> {
        let since = match filter.since.as_ref().map(since_key) {
            Some(None) => return Ok(Vec::new()),
            Some(key) => key,
            None => None,
        };

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {COLUMNS} FROM complaints
                     WHERE (?1 IS NULL OR status = ?1)
                       AND (?2 IS NULL OR timestamp >= ?2)
                     ORDER BY id ASC"
                ),
                params![
                    opt_text(filter.status.map(|s| s.as_str().to_string())),
                    opt_text(since),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_by_filter: {e}")))?;

        let mut complaints = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_by_filter: {e}")))?
        {
            complaints.push(row_to_complaint(&row)?);
        }
        Ok(complaints)
    }

    async fn update_status(
        &self,
        id: i64,
        new_status: ComplaintStatus,
    ) -> Result<Complaint, ComplaintError> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .fetch(id)
            .await?
            .ok_or(ComplaintError::NotFound { id })?;

        if !current.status.can_transition_to(new_status) {
            return Err(ComplaintError::InvalidTransition {
                id,
                from: current.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let changed = self
            .conn()
            .execute(
                "UPDATE complaints SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![new_status.as_str(), id, current.status.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_status: {e}")))?;

        if changed == 0 {
            return Err(ComplaintError::InvalidTransition {
                id,
                from: current.status.to_string(),
                to: new_status.to_string(),
            });
        }

        info!(id, from = %current.status, to = %new_status, "Complaint status updated");
        Ok(Complaint {
            status: new_status,
            ..current
        })
    }
}
