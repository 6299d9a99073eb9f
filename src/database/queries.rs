//! SQL query operations for database access
//!
//! This module provides low-level query functions over raw (encrypted)
//! rows. For typed operations, use [`StoreHelper`](crate::StoreHelper).

use rusqlite::{Connection, OptionalExtension, params};
use chrono::{DateTime, Utc};
use crate::error::EngineResult;

/// Timestamp format used in database
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a DateTime for database storage
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp from database
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
}

/// Get current timestamp formatted for database
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

// ============================================================================
// Properties queries
// ============================================================================

/// Get the properties row, if the store has been initialized
pub fn get_properties(conn: &Connection) -> EngineResult<Option<RawProperties>> {
    let result = conn.query_row(
        "SELECT store_id, schema_version, key_check, update_timestamp
         FROM objkeep_properties LIMIT 1",
        [],
        |row| {
            Ok(RawProperties {
                store_id: row.get(0)?,
                schema_version: row.get::<_, i64>(1)? as u64,
                key_check: row.get(2)?,
                update_timestamp: row.get(3)?,
            })
        },
    ).optional()?;
    Ok(result)
}

/// Insert the properties row of a new store
pub fn set_properties(
    conn: &Connection,
    store_id: &str,
    schema_version: u64,
    key_check: &[u8],
) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO objkeep_properties (store_id, schema_version, key_check, update_timestamp)
         VALUES (?, ?, ?, ?)",
        params![store_id, schema_version as i64, key_check, now_timestamp()],
    )?;
    Ok(())
}

/// Update the stored schema version
pub fn set_schema_version(conn: &Connection, schema_version: u64) -> EngineResult<()> {
    conn.execute(
        "UPDATE objkeep_properties SET schema_version = ?, update_timestamp = ?",
        params![schema_version as i64, now_timestamp()],
    )?;
    Ok(())
}

// ============================================================================
// Records queries
// ============================================================================

/// Get all rows of a type in insertion order (encrypted)
pub fn get_records_raw(conn: &Connection, record_type: &str) -> EngineResult<Vec<RawRecord>> {
    let mut stmt = conn.prepare(
        "SELECT row_id, primary_key, payload FROM objkeep_records
         WHERE record_type = ? ORDER BY row_id"
    )?;

    let rows = stmt.query_map([record_type], |row| {
        Ok(RawRecord {
            row_id: row.get(0)?,
            primary_key: row.get(1)?,
            payload: row.get(2)?,
        })
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
}

/// Get the row of a type with the given primary key (encrypted)
pub fn get_record_by_primary_key(
    conn: &Connection,
    record_type: &str,
    primary_key: &str,
) -> EngineResult<Option<RawRecord>> {
    let result = conn.query_row(
        "SELECT row_id, primary_key, payload FROM objkeep_records
         WHERE record_type = ? AND primary_key = ?",
        params![record_type, primary_key],
        |row| {
            Ok(RawRecord {
                row_id: row.get(0)?,
                primary_key: row.get(1)?,
                payload: row.get(2)?,
            })
        },
    ).optional()?;
    Ok(result)
}

/// Count rows of a type
pub fn count_records(conn: &Connection, record_type: &str) -> EngineResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM objkeep_records WHERE record_type = ?",
        [record_type],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Insert a new row
///
/// Fails with a constraint violation when the primary key is taken.
pub fn insert_record(
    conn: &Connection,
    record_type: &str,
    primary_key: Option<&str>,
    digest: &str,
    payload: &[u8],
) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO objkeep_records (record_type, primary_key, digest, payload, change_timestamp)
         VALUES (?, ?, ?, ?, ?)",
        params![record_type, primary_key, digest, payload, now_timestamp()],
    )?;
    Ok(())
}

/// Insert a row or replace the payload of the row with the same primary key
pub fn upsert_record(
    conn: &Connection,
    record_type: &str,
    primary_key: &str,
    digest: &str,
    payload: &[u8],
) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO objkeep_records (record_type, primary_key, digest, payload, change_timestamp)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (record_type, primary_key) DO UPDATE SET
             digest = excluded.digest,
             payload = excluded.payload,
             change_timestamp = excluded.change_timestamp",
        params![record_type, primary_key, digest, payload, now_timestamp()],
    )?;
    Ok(())
}

/// Rewrite an existing row in place, keeping its position (used by migrations)
pub fn update_record(
    conn: &Connection,
    row_id: i64,
    primary_key: Option<&str>,
    digest: &str,
    payload: &[u8],
) -> EngineResult<()> {
    conn.execute(
        "UPDATE objkeep_records
         SET primary_key = ?, digest = ?, payload = ?, change_timestamp = ?
         WHERE row_id = ?",
        params![primary_key, digest, payload, now_timestamp(), row_id],
    )?;
    Ok(())
}

/// Delete the row with the given primary key, returns rows deleted
pub fn delete_by_primary_key(conn: &Connection, record_type: &str, primary_key: &str) -> EngineResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM objkeep_records WHERE record_type = ? AND primary_key = ?",
        params![record_type, primary_key],
    )?;
    Ok(deleted)
}

/// Delete the oldest row with the given content digest, returns rows deleted
pub fn delete_by_digest(conn: &Connection, record_type: &str, digest: &str) -> EngineResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM objkeep_records WHERE row_id = (
             SELECT MIN(row_id) FROM objkeep_records
             WHERE record_type = ? AND digest = ? AND primary_key IS NULL
         )",
        params![record_type, digest],
    )?;
    Ok(deleted)
}

/// Delete every row of a type, returns rows deleted
pub fn delete_records_of_type(conn: &Connection, record_type: &str) -> EngineResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM objkeep_records WHERE record_type = ?",
        [record_type],
    )?;
    Ok(deleted)
}

/// Delete every row of every type, returns rows deleted
pub fn delete_all_records(conn: &Connection) -> EngineResult<usize> {
    let deleted = conn.execute("DELETE FROM objkeep_records", [])?;
    Ok(deleted)
}

// ============================================================================
// Raw data structures (before decryption)
// ============================================================================

/// Raw properties row
#[derive(Debug, Clone)]
pub struct RawProperties {
    /// Random store identifier
    pub store_id: String,
    /// Schema version the store was last opened with
    pub schema_version: u64,
    /// Encrypted sentinel used to verify the store key
    pub key_check: Vec<u8>,
    /// Last properties update
    pub update_timestamp: Option<String>,
}

/// Raw record row
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Insertion order
    pub row_id: i64,
    /// Primary key as text, if the type declares one
    pub primary_key: Option<String>,
    /// Encrypted JSON payload
    pub payload: Vec<u8>,
}
