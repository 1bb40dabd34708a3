//! Schema creation and identity validation
//!
//! The on-disk structure is identified by a BLAKE3 hash of the canonical DDL
//! stored in `schema_identity`. Opening a database whose marker or live
//! column layout disagrees with this build fails with
//! [`StorageError::SchemaMismatch`].

use chrono::Utc;
use dagplanner_domain::constants::CALENDAR_EVENTS_TABLE;
use dagplanner_domain::{DagPlannerError, Result, StorageError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::errors::InfraError;

/// Canonical DDL of the event table and its indexes.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

const IDENTITY_TABLE_SQL: &str = "CREATE TABLE schema_identity (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    identity_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

/// Column layout `(name, declared type, not null)` the queries rely on.
pub const EXPECTED_COLUMNS: &[(&str, &str, bool)] = &[
    ("id", "TEXT", true),
    ("calendar_id", "TEXT", true),
    ("title", "TEXT", true),
    ("description", "TEXT", false),
    ("location", "TEXT", false),
    ("start_date", "TEXT", true),
    ("start_time", "TEXT", false),
    ("end_date", "TEXT", true),
    ("end_time", "TEXT", false),
    ("is_all_day", "INTEGER", true),
    ("color_hex", "TEXT", false),
    ("calendar_name", "TEXT", true),
    ("is_recurring", "INTEGER", true),
    ("html_link", "TEXT", false),
];

/// Identity hash of [`SCHEMA_SQL`], insensitive to whitespace layout.
pub fn expected_identity() -> String {
    let canonical = SCHEMA_SQL.split_whitespace().collect::<Vec<_>>().join(" ");
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Create the schema on a fresh database, or validate an existing one.
///
/// # Errors
/// [`StorageError::SchemaMismatch`] when an existing database was created
/// with a different schema, or has none of ours.
pub fn ensure_schema(conn: &mut Connection) -> Result<()> {
    let expected = expected_identity();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(InfraError::from)?;

    let has_marker = table_exists(&tx, "schema_identity")?;
    let has_events = table_exists(&tx, CALENDAR_EVENTS_TABLE)?;

    match (has_marker, has_events) {
        (false, false) => {
            tx.execute_batch(SCHEMA_SQL).map_err(InfraError::from)?;
            tx.execute_batch(IDENTITY_TABLE_SQL).map_err(InfraError::from)?;
            tx.execute(
                "INSERT INTO schema_identity (id, identity_hash, created_at) VALUES (1, ?1, ?2)",
                params![expected, Utc::now().to_rfc3339()],
            )
            .map_err(InfraError::from)?;
            info!(identity = %expected, "created calendar schema");
        }
        (false, true) => {
            return Err(mismatch(&expected, "calendar_events without schema identity"));
        }
        (true, _) => {
            let found: Option<String> = tx
                .query_row("SELECT identity_hash FROM schema_identity WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(InfraError::from)?;
            match found {
                Some(found) if found == expected => {
                    debug!(identity = %found, "schema identity verified");
                }
                Some(found) => return Err(mismatch(&expected, &found)),
                None => return Err(mismatch(&expected, "empty schema identity")),
            }
        }
    }

    verify_columns(&tx)?;
    tx.commit().map_err(InfraError::from)?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(InfraError::from)?;
    Ok(count > 0)
}

fn verify_columns(conn: &Connection) -> Result<()> {
    let mut stmt = conn
        .prepare("SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(InfraError::from)?;
    let found = stmt
        .query_map(params![CALENDAR_EVENTS_TABLE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
        })
        .map_err(InfraError::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(InfraError::from)?;

    let matches = found.len() == EXPECTED_COLUMNS.len()
        && found.iter().zip(EXPECTED_COLUMNS).all(|((name, ty, not_null), expected)| {
            name == expected.0 && ty.eq_ignore_ascii_case(expected.1) && *not_null == expected.2
        });

    if matches {
        return Ok(());
    }

    let describe = |cols: Vec<String>| cols.join(",");
    Err(mismatch(
        &describe(EXPECTED_COLUMNS.iter().map(|(n, t, _)| format!("{n}:{t}")).collect()),
        &describe(found.iter().map(|(n, t, _)| format!("{n}:{t}")).collect()),
    ))
}

fn mismatch(expected: &str, found: &str) -> DagPlannerError {
    StorageError::SchemaMismatch { expected: expected.to_string(), found: found.to_string() }
        .into()
}
