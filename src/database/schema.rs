//! Database schema definitions

/// SQL to create the properties table (one row per store)
pub const CREATE_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS objkeep_properties (
    store_id         CHAR(32) NOT NULL PRIMARY KEY,
    schema_version   INTEGER NOT NULL,
    key_check        BLOB NOT NULL,
    update_timestamp TEXT
)
"#;

/// SQL to create the records table
///
/// `payload` holds the encrypted JSON form of the record. `primary_key`
/// is NULL for types that declare none; those rows are matched by
/// `digest`.
pub const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS objkeep_records (
    row_id           INTEGER PRIMARY KEY AUTOINCREMENT,
    record_type      VARCHAR NOT NULL,
    primary_key      VARCHAR,
    digest           CHAR(32) NOT NULL,
    payload          BLOB NOT NULL,
    change_timestamp TEXT
)
"#;

/// Primary keys are unique per type (NULLs are never equal in SQLite)
pub const CREATE_PRIMARY_KEY_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS objkeep_records_primary_key
    ON objkeep_records (record_type, primary_key)
"#;

/// Lookup index for records without a primary key
pub const CREATE_DIGEST_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS objkeep_records_digest
    ON objkeep_records (record_type, digest)
"#;

/// All creation statements in order
pub const CREATE_ALL_TABLES: &[&str] = &[
    CREATE_PROPERTIES_TABLE,
    CREATE_RECORDS_TABLE,
    CREATE_PRIMARY_KEY_INDEX,
    CREATE_DIGEST_INDEX,
];
