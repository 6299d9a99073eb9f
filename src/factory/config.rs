//! Store configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::keystore::{KeyStore, MemoryKeyStore};
use crate::database::Migrator;
use crate::{DEFAULT_SCHEMA_VERSION, DEFAULT_SERVICE, SCHEMA_VERSION_ENV};

/// Settings shared by every store opened through one factory
#[derive(Clone)]
pub struct StoreConfig {
    /// Folder holding on-disk stores
    pub directory: PathBuf,
    /// Schema version of on-disk stores
    pub schema_version: u64,
    /// Prefix of key names in the key store
    pub service: String,
    /// Where encryption keys live
    pub key_store: Arc<dyn KeyStore>,
    /// Called when an on-disk store has an older schema version
    pub migrator: Option<Arc<dyn Migrator>>,
    /// Log written and deleted record contents at debug level
    pub log_records: bool,
}

impl StoreConfig {
    /// Configuration with on-disk stores under `directory`
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            service: DEFAULT_SERVICE.to_string(),
            key_store: Arc::new(MemoryKeyStore::new()),
            migrator: None,
            log_records: false,
        }
    }

    /// Like [`StoreConfig::new`], with the schema version taken from the
    /// `OBJKEEP_SCHEMA_VERSION` environment variable
    ///
    /// A missing or unparsable value falls back to version 1.
    pub fn from_env(directory: &Path) -> Self {
        let raw = std::env::var(SCHEMA_VERSION_ENV).ok();
        Self::new(directory).with_schema_version(parse_schema_version(raw.as_deref()))
    }

    /// Set the schema version
    pub fn with_schema_version(mut self, schema_version: u64) -> Self {
        self.schema_version = schema_version;
        self
    }

    /// Set the key name prefix
    pub fn with_service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }

    /// Set the key store
    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = key_store;
        self
    }

    /// Set the migrator
    pub fn with_migrator(mut self, migrator: Arc<dyn Migrator>) -> Self {
        self.migrator = Some(migrator);
        self
    }

    /// Log record contents on writes and deletes
    pub fn with_record_logging(mut self, enabled: bool) -> Self {
        self.log_records = enabled;
        self
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("directory", &self.directory)
            .field("schema_version", &self.schema_version)
            .field("service", &self.service)
            .field("migrator", &self.migrator.is_some())
            .field("log_records", &self.log_records)
            .finish_non_exhaustive()
    }
}

fn parse_schema_version(raw: Option<&str>) -> u64 {
    match raw.map(|s| s.trim().parse::<u64>()) {
        Some(Ok(version)) => version,
        Some(Err(_)) => {
            log::warn!(
                "{} is not a valid schema version, using {}",
                SCHEMA_VERSION_ENV,
                DEFAULT_SCHEMA_VERSION
            );
            DEFAULT_SCHEMA_VERSION
        }
        None => {
            log::debug!("{} not set, using {}", SCHEMA_VERSION_ENV, DEFAULT_SCHEMA_VERSION);
            DEFAULT_SCHEMA_VERSION
        }
    }
}
