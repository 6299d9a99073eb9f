//! Store identities and connection factory
//!
//! A [`StoreFactory`] turns an [`Instance`] into an open [`Database`]:
//! it resolves the file (or in-memory identity), fetches or generates the
//! store's encryption key and wires the configured migrator in.

mod config;
mod keystore;

pub use config::StoreConfig;
pub use keystore::{KeyStore, MemoryKeyStore};
#[cfg(feature = "keyring")]
pub use keystore::KeyringKeyStore;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::crypto;
use crate::database::{Database, Location, Migration};
use crate::error::{EngineError, EngineResult};
use crate::{IN_MEMORY_SCHEMA_VERSION, STORE_FILE_EXTENSION};

/// Logical store identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instance {
    /// Ephemeral store that never touches disk
    InMemory,
    /// The default on-disk store
    Default,
    /// A named on-disk store with its own file and key
    Custom(String),
}

impl Instance {
    /// Name used for the store file and its key
    pub fn name(&self) -> &str {
        match self {
            Instance::InMemory => "",
            Instance::Default => "default",
            Instance::Custom(name) => name,
        }
    }

    /// Check that a custom name maps to its own file and key
    ///
    /// Custom names must be non-empty, must not be `default`, must not
    /// start with a dot and may only contain ASCII letters, digits, `.`,
    /// `-` and `_`.
    pub fn validate(&self) -> EngineResult<()> {
        let Instance::Custom(name) = self else {
            return Ok(());
        };

        let valid = !name.is_empty()
            && name != Instance::Default.name()
            && !name.starts_with('.')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(EngineError::InvalidInstance(name.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::InMemory => write!(f, "in-memory store"),
            Instance::Default => write!(f, "default store"),
            Instance::Custom(name) => write!(f, "store '{}'", name),
        }
    }
}

/// Opens stores according to a [`StoreConfig`]
#[derive(Debug)]
pub struct StoreFactory {
    config: StoreConfig,
    /// Identity of this factory's in-memory store
    memory_id: String,
    /// Held while a key is looked up or generated
    key_lock: Mutex<()>,
}

impl StoreFactory {
    /// Create a factory
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            memory_id: format!("objkeep-{}", uuid::Uuid::new_v4().simple()),
            key_lock: Mutex::new(()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// File backing an on-disk store
    ///
    /// `None` for the in-memory store and for invalid custom names.
    pub fn file_path(&self, instance: &Instance) -> Option<PathBuf> {
        match instance {
            Instance::InMemory => None,
            other if other.validate().is_err() => None,
            other => Some(
                self.config
                    .directory
                    .join(format!("{}.{}", other.name(), STORE_FILE_EXTENSION)),
            ),
        }
    }

    /// Schema version a store is opened with
    pub fn schema_version(&self, instance: &Instance) -> u64 {
        match instance {
            Instance::InMemory => IN_MEMORY_SCHEMA_VERSION,
            _ => self.config.schema_version,
        }
    }

    /// Key name of a store in the key store
    pub fn key_name(&self, instance: &Instance) -> String {
        format!("{}.encrypt.key.{}", self.config.service, instance.name())
    }

    /// Encryption key of a store, generated and saved on first use
    ///
    /// Handles of one factory opening a new store at the same time all
    /// get the same key.
    pub fn encryption_key(&self, instance: &Instance) -> EngineResult<Vec<u8>> {
        let _guard = self.key_lock.lock().unwrap_or_else(|e| e.into_inner());
        let name = self.key_name(instance);
        if let Some(key) = self.config.key_store.get(&name)? {
            return Ok(key);
        }

        let key = crypto::generate_key();
        self.config.key_store.set(&name, &key)?;
        log::debug!("Generated encryption key for {}", instance);
        Ok(key)
    }

    /// Open a new connection to a store
    pub fn make(&self, instance: &Instance) -> EngineResult<Database> {
        instance.validate()?;
        let location = match self.file_path(instance) {
            Some(path) => {
                fs::create_dir_all(&self.config.directory)?;
                Location::File(path)
            }
            None => Location::Memory(self.memory_id.clone()),
        };
        let key = self.encryption_key(instance)?;
        let schema_version = self.schema_version(instance);

        log::debug!("Opening {} at {:?} (schema version {})", instance, location, schema_version);

        let migrate = |migration: &mut Migration<'_>, old_version: u64, current_version: u64| -> EngineResult<()> {
            match &self.config.migrator {
                Some(migrator) => migrator.execute(migration, instance, old_version, current_version),
                None => Ok(()),
            }
        };

        Database::open(location, key, schema_version, Some(&migrate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn test_instance_names() {
        assert_eq!(Instance::InMemory.name(), "");
        assert_eq!(Instance::Default.name(), "default");
        assert_eq!(Instance::Custom("cache".into()).name(), "cache");
        assert_ne!(Instance::Custom("a".into()), Instance::Custom("b".into()));
        assert_eq!(Instance::Custom("a".into()), Instance::Custom("a".into()));
    }

    #[test]
    fn test_file_paths() {
        let factory = StoreFactory::new(StoreConfig::new(Path::new("/data")));
        assert_eq!(factory.file_path(&Instance::InMemory), None);
        assert_eq!(factory.file_path(&Instance::Default), Some(PathBuf::from("/data/default.store")));
        assert_eq!(
            factory.file_path(&Instance::Custom("cache".into())),
            Some(PathBuf::from("/data/cache.store"))
        );
    }

    #[test]
    fn test_custom_names_are_validated() {
        let factory = StoreFactory::new(StoreConfig::new(Path::new("/data")));
        for name in ["", "default", "../escape", "a/b", ".hidden", "sp ace"] {
            let instance = Instance::Custom(name.to_string());
            assert!(matches!(instance.validate(), Err(EngineError::InvalidInstance(_))), "{:?}", name);
            assert_eq!(factory.file_path(&instance), None);
            assert!(matches!(factory.make(&instance), Err(EngineError::InvalidInstance(_))));
        }

        assert!(Instance::Custom("cache-2.v1_x".into()).validate().is_ok());
        assert!(Instance::Default.validate().is_ok());
        assert!(Instance::InMemory.validate().is_ok());
    }

    #[test]
    fn test_in_memory_schema_version_is_fixed() {
        let factory = StoreFactory::new(StoreConfig::new(Path::new("/data")).with_schema_version(9));
        assert_eq!(factory.schema_version(&Instance::InMemory), 1);
        assert_eq!(factory.schema_version(&Instance::Default), 9);
    }

    #[test]
    fn test_encryption_key_generated_once_per_instance() {
        let key_store = Arc::new(MemoryKeyStore::new());
        let config = StoreConfig::new(Path::new("/data"))
            .with_service("app")
            .with_key_store(key_store.clone());
        let factory = StoreFactory::new(config);

        let first = factory.encryption_key(&Instance::Default).unwrap();
        assert_eq!(first.len(), crypto::KEY_LENGTH);
        assert_eq!(factory.encryption_key(&Instance::Default).unwrap(), first);
        assert_eq!(key_store.get("app.encrypt.key.default").unwrap(), Some(first.clone()));

        let other = factory.encryption_key(&Instance::Custom("cache".into())).unwrap();
        assert_ne!(other, first);
    }

    #[test]
    fn test_factories_have_distinct_memory_stores() {
        let a = StoreFactory::new(StoreConfig::new(Path::new("/data")));
        let b = StoreFactory::new(StoreConfig::new(Path::new("/data")));
        assert_ne!(a.memory_id, b.memory_id);
    }
}
