//! Schema migration hooks
//!
//! The store records the schema version it was last opened with. Opening
//! it with a newer configured version hands a [`Migration`] to the
//! configured [`Migrator`] inside the opening transaction; the new version
//! is persisted only if the migrator succeeds.

use rusqlite::Connection;
use serde_json::Value;

use super::models::{decode_payload, EncodedRow};
use super::queries;
use crate::error::{EngineError, EngineResult};
use crate::factory::Instance;
use crate::record::RecordType;

/// Pluggable migration callback
pub trait Migrator: Send + Sync {
    /// Bring stored data from `old_version` to `current_version`
    fn execute(
        &self,
        migration: &mut Migration<'_>,
        instance: &Instance,
        old_version: u64,
        current_version: u64,
    ) -> EngineResult<()>;
}

impl<F> Migrator for F
where
    F: Fn(&mut Migration<'_>, &Instance, u64, u64) -> EngineResult<()> + Send + Sync,
{
    fn execute(
        &self,
        migration: &mut Migration<'_>,
        instance: &Instance,
        old_version: u64,
        current_version: u64,
    ) -> EngineResult<()> {
        self(migration, instance, old_version, current_version)
    }
}

/// What opening a store must do about its schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// Stored and configured versions match
    Current,
    /// Stored data is older and must be migrated
    Migrate { from: u64, to: u64 },
}

/// Compare stored and configured schema versions
pub fn check_version(stored: u64, configured: u64) -> EngineResult<VersionCheck> {
    if stored > configured {
        return Err(EngineError::SchemaTooNew { stored, configured });
    }
    if stored < configured {
        return Ok(VersionCheck::Migrate { from: stored, to: configured });
    }
    Ok(VersionCheck::Current)
}

/// Access to stored records while a migration runs
///
/// Records are seen in their JSON form since their Rust types may no
/// longer match the stored shape.
pub struct Migration<'a> {
    conn: &'a Connection,
    key: &'a [u8],
}

impl<'a> Migration<'a> {
    pub(crate) fn new(conn: &'a Connection, key: &'a [u8]) -> Self {
        Self { conn, key }
    }

    /// Number of stored records of a type
    pub fn count(&self, record_type: &str) -> EngineResult<usize> {
        queries::count_records(self.conn, record_type)
    }

    /// Visit every record of a type with its old form and a mutable new form
    ///
    /// Records whose new form differs from the old one are rewritten in
    /// place, keeping their insertion order. The primary key is taken from
    /// the new form, so a migration may change or rename it; a new key
    /// that collides with another stored record fails the migration.
    pub fn enumerate_objects<F>(&mut self, record_type: &RecordType, mut visit: F) -> EngineResult<()>
    where
        F: FnMut(&Value, &mut Value) -> EngineResult<()>,
    {
        for raw in queries::get_records_raw(self.conn, record_type.name())? {
            let old = decode_payload(&raw.payload, self.key)?;
            let mut new = old.clone();
            visit(&old, &mut new)?;

            if new != old {
                let row = EncodedRow::encode(record_type, &new, self.key)?;
                queries::update_record(
                    self.conn,
                    raw.row_id,
                    row.primary_key.as_deref(),
                    &row.digest,
                    &row.payload,
                )?;
            }
        }
        Ok(())
    }

    /// Rename a property on every record of a type
    pub fn rename_property(&mut self, record_type: &RecordType, old_name: &str, new_name: &str) -> EngineResult<()> {
        self.enumerate_objects(record_type, |_, new| {
            if let Some(object) = new.as_object_mut() {
                if let Some(value) = object.remove(old_name) {
                    object.insert(new_name.to_string(), value);
                }
            }
            Ok(())
        })
    }

    /// Add a new record while migrating
    pub fn create(&mut self, record_type: &RecordType, value: &Value) -> EngineResult<()> {
        let row = EncodedRow::encode(record_type, value, self.key)?;
        queries::insert_record(
            self.conn,
            record_type.name(),
            row.primary_key.as_deref(),
            &row.digest,
            &row.payload,
        )
    }

    /// Delete every stored record of a type, returns records deleted
    pub fn delete_data(&mut self, record_type: &str) -> EngineResult<usize> {
        queries::delete_records_of_type(self.conn, record_type)
    }
}
