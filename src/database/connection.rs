//! Database connection management

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};

use super::migrations::{check_version, Migration, VersionCheck};
use super::models::{decode_payload, primary_key_text, StoreProperties};
use super::queries::{self, parse_timestamp};
use super::schema;
use super::transaction::Writer;
use crate::crypto;
use crate::error::{EngineError, EngineResult};
use crate::record::Record;

/// Plaintext of the key check sentinel
const KEY_CHECK: &[u8] = b"objkeep-key-check";

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File on disk
    File(PathBuf),
    /// In-memory database with this identifier, shared by every
    /// connection of the process through the `memdb` VFS
    Memory(String),
}

impl Location {
    fn open(&self) -> EngineResult<Connection> {
        let conn = match self {
            Location::File(path) => Connection::open(path)?,
            Location::Memory(id) => Connection::open_with_flags(
                format!("file:/{}?vfs=memdb", id),
                OpenFlags::default(),
            )?,
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

/// Start a transaction holding the write lock from its first statement
///
/// Read-then-write transactions never need a lock upgrade, so competing
/// writers wait in the busy handler instead of failing.
fn begin_immediate(conn: &Connection) -> EngineResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

/// Migration callback used while opening: `(migration, old, new)`
pub type MigrateFn<'f> = dyn Fn(&mut Migration<'_>, u64, u64) -> EngineResult<()> + 'f;

/// Database connection wrapper
pub struct Database {
    /// SQLite connection
    conn: Connection,
    /// Store encryption key
    key: Vec<u8>,
}

impl Database {
    /// Open (or create) a store
    ///
    /// Creates the schema on first use, verifies that `key` is the key
    /// the store was created with and runs `migrate` when the stored
    /// schema version is older than `schema_version`. All of this happens
    /// in one transaction.
    pub fn open(
        location: Location,
        key: Vec<u8>,
        schema_version: u64,
        migrate: Option<&MigrateFn<'_>>,
    ) -> EngineResult<Self> {
        let conn = location.open()?;
        prepare(&conn, &key, schema_version, migrate)?;

        Ok(Self { conn, key })
    }

    /// Store metadata
    pub fn properties(&self) -> EngineResult<Option<StoreProperties>> {
        Ok(queries::get_properties(&self.conn)?.map(|raw| StoreProperties {
            store_id: raw.store_id,
            schema_version: raw.schema_version,
            update_timestamp: raw.update_timestamp.as_deref().and_then(parse_timestamp),
        }))
    }

    /// All stored records of `T` in insertion order
    pub fn objects<T: Record>(&self) -> EngineResult<Vec<T>> {
        queries::get_records_raw(&self.conn, T::NAME)?
            .iter()
            .map(|raw| Ok(serde_json::from_value(decode_payload(&raw.payload, &self.key)?)?))
            .collect()
    }

    /// Stored record of `T` with the given primary key
    pub fn object_by_primary_key<T: Record>(&self, key: &serde_json::Value) -> EngineResult<Option<T>> {
        if T::PRIMARY_KEY.is_none() {
            return Ok(None);
        }

        let raw = queries::get_record_by_primary_key(&self.conn, T::NAME, &primary_key_text(key))?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_value(decode_payload(&raw.payload, &self.key)?)?)),
            None => Ok(None),
        }
    }

    /// Number of stored records of `T`
    pub fn count<T: Record>(&self) -> EngineResult<usize> {
        queries::count_records(&self.conn, T::NAME)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> EngineResult<Writer<'_>> {
        Ok(Writer::new(begin_immediate(&self.conn)?, &self.key))
    }
}

/// Create the schema, verify the key and migrate, in one transaction
fn prepare(
    conn: &Connection,
    key: &[u8],
    schema_version: u64,
    migrate: Option<&MigrateFn<'_>>,
) -> EngineResult<()> {
    let tx = begin_immediate(conn)?;

    for sql in schema::CREATE_ALL_TABLES {
        tx.execute(sql, [])?;
    }

    match queries::get_properties(&tx)? {
        None => {
            let key_check = crypto::encrypt(KEY_CHECK, key).map_err(EngineError::Encryption)?;
            let store_id = uuid::Uuid::new_v4().simple().to_string();
            queries::set_properties(&tx, &store_id, schema_version, &key_check)?;
            log::debug!("Created store {} at schema version {}", store_id, schema_version);
        }
        Some(props) => {
            match crypto::decrypt(&props.key_check, key) {
                Ok(plaintext) if plaintext == KEY_CHECK => {}
                _ => return Err(EngineError::KeyMismatch),
            }

            if let VersionCheck::Migrate { from, to } = check_version(props.schema_version, schema_version)? {
                log::debug!("Migrating store {} from schema version {} to {}", props.store_id, from, to);
                if let Some(migrate) = migrate {
                    let mut migration = Migration::new(&tx, key);
                    migrate(&mut migration, from, to)?;
                }
                queries::set_schema_version(&tx, to)?;
            }
        }
    }

    tx.commit()?;
    Ok(())
}
