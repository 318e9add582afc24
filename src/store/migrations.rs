//! Version-tracked schema migrations for the complaint store.
//!
//! `run_migrations()` reads the highest applied version from `_migrations`
//! and applies newer entries in order. A database written by the earlier
//! intake service (a bare `complaints` table, naive timestamps, localized
//! category labels, no `_migrations`) is normalized in place and seeded at V1.

use libsql::Connection;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Append new versions at the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: r#"
        CREATE TABLE IF NOT EXISTS complaints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            timestamp TEXT NOT NULL,
            sentiment TEXT NOT NULL DEFAULT 'unknown',
            category TEXT NOT NULL DEFAULT 'other',
            spam_flag INTEGER,
            spam_score REAL,
            geo TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status);
        CREATE INDEX IF NOT EXISTS idx_complaints_timestamp ON complaints(timestamp);
    "#,
}];

/// Rewrites legacy rows into the current value vocabulary. Legacy timestamps
/// are `YYYY-MM-DD HH:MM:SS.ffffff` (naive UTC), which becomes the stored
/// RFC 3339 form by swapping the separator and appending `Z`.
const LEGACY_NORMALIZE: &str = r#"
    UPDATE complaints
        SET timestamp = replace(timestamp, ' ', 'T') || 'Z'
        WHERE timestamp NOT LIKE '%Z';
    UPDATE complaints
        SET status = lower(trim(coalesce(status, 'open')));
    UPDATE complaints
        SET status = 'open'
        WHERE status NOT IN ('open', 'closed');
    UPDATE complaints
        SET sentiment = lower(trim(coalesce(sentiment, 'unknown')));
    UPDATE complaints
        SET sentiment = 'unknown'
        WHERE sentiment NOT IN ('positive', 'negative', 'neutral', 'unknown');
    UPDATE complaints
        SET category = CASE lower(trim(coalesce(category, '')))
            WHEN 'техническая' THEN 'technical'
            WHEN 'technical' THEN 'technical'
            WHEN 'оплата' THEN 'payment'
            WHEN 'payment' THEN 'payment'
            ELSE 'other'
        END;
    CREATE INDEX IF NOT EXISTS idx_complaints_status ON complaints(status);
    CREATE INDEX IF NOT EXISTS idx_complaints_timestamp ON complaints(timestamp);
"#;

/// Run all pending migrations against the given connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let mut current_version = get_current_version(conn).await?;

    if current_version == 0 && legacy_table_exists(conn).await? {
        // Columns the legacy table never had. Errors mean the column exists.
        for column in ["spam_flag INTEGER", "spam_score REAL", "geo TEXT"] {
            let _ = conn
                .execute(&format!("ALTER TABLE complaints ADD COLUMN {column}"), ())
                .await;
        }
        conn.execute_batch(LEGACY_NORMALIZE)
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to normalize legacy rows: {e}")))?;

        seed_version(conn, 1, "initial_schema").await?;
        current_version = 1;
        tracing::info!("Legacy complaints table detected, seeded migration V1");
    }

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    let version = get_current_version(conn).await?;
    tracing::info!(version, "Database migrations complete");
    Ok(())
}

/// Highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn legacy_table_exists(conn: &Connection) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='complaints'",
            (),
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to check legacy table: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to read legacy check: {e}")))?;

    match row {
        Some(row) => {
            let count: i64 = row.get(0).unwrap_or(0);
            Ok(count > 0)
        }
        None => Ok(false),
    }
}

async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
