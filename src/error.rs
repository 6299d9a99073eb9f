//! Error types for objkeep

use thiserror::Error;

/// Error kinds surfaced by the store helper API
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store file (or in-memory store) could not be opened
    #[error("Cannot access store file: {0}")]
    CannotAccessFile(String),

    /// A write transaction failed or could not be committed
    #[error("Cannot write on disk: {0}")]
    CannotWriteOnDisk(String),

    /// A delete transaction failed or could not be committed
    #[error("Cannot delete: {0}")]
    CannotDelete(String),

    /// The object to delete is not stored
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Auto-increment property missing or not an integer
    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    /// Anything else
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Raw failures reported by the storage engine adapter
///
/// These never leave the crate's public helper API: the transactional
/// write boundary maps them onto [`StoreError`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload encryption or decryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// The store was created with a different encryption key
    #[error("Encryption key does not match the store")]
    KeyMismatch,

    /// The store on disk was written by a newer schema
    #[error("Stored schema version {stored} is newer than configured version {configured}")]
    SchemaTooNew { stored: u64, configured: u64 },

    /// Upsert requested for a type that declares no primary key
    #[error("Type {0} has no primary key")]
    MissingPrimaryKey(String),

    /// No stored row matches the record
    #[error("No stored {0} matches")]
    NotFound(String),

    /// A migrator reported a failure
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Custom store name that would clash with another store or leave
    /// the store directory
    #[error("Invalid store name: {0:?}")]
    InvalidInstance(String),

    /// Named property missing or of the wrong type
    #[error("Invalid property: {0}")]
    InvalidProperty(String),
}

/// Engine failures surfacing from a write transaction
///
/// Anything the engine reports is a write failure, except a missing
/// object and a bad property which keep their own kinds.
impl From<EngineError> for StoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(record_type) => StoreError::ObjectNotFound(record_type),
            EngineError::InvalidProperty(msg) => StoreError::InvalidProperty(msg),
            other => StoreError::CannotWriteOnDisk(other.to_string()),
        }
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::CannotAccessFile("/path/to/store".to_string());
        assert!(err.to_string().contains("/path/to/store"));

        let err = StoreError::ObjectNotFound("Employee".to_string());
        assert_eq!(err.to_string(), "Object not found: Employee");

        let err = EngineError::KeyMismatch;
        assert_eq!(err.to_string(), "Encryption key does not match the store");

        let err = EngineError::SchemaTooNew { stored: 3, configured: 2 };
        assert!(err.to_string().contains('3'));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let sqlite_err = rusqlite::Error::QueryReturnedNoRows;
        let engine_err: EngineError = sqlite_err.into();
        match engine_err {
            EngineError::Sqlite(e) => assert!(!e.to_string().is_empty()),
            _ => panic!("Expected Sqlite"),
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::Serialization(_)));
    }

    #[test]
    fn test_engine_error_mapping() {
        assert!(matches!(
            StoreError::from(EngineError::NotFound("Entry".into())),
            StoreError::ObjectNotFound(_)
        ));
        assert!(matches!(
            StoreError::from(EngineError::InvalidProperty("id".into())),
            StoreError::InvalidProperty(_)
        ));
        assert!(matches!(
            StoreError::from(EngineError::KeyMismatch),
            StoreError::CannotWriteOnDisk(_)
        ));
    }
}
