//! Main store helper API
//!
//! This module provides the primary interface for working with a store:
//! connection lifetime, cloning for other threads and the transactional
//! write wrapper every write operation goes through.

use std::cell::OnceCell;
use std::sync::Arc;

use crate::database::{Database, StoreProperties, Writer};
use crate::error::{EngineError, Result, StoreError};
use crate::factory::{Instance, StoreFactory};

/// Typed access to one store
///
/// The connection is opened lazily on first use and stays bound to the
/// helper. A helper may be moved to another thread but not shared; use
/// [`StoreHelper::clone_handle`] to get an independent connection.
pub struct StoreHelper {
    /// Factory holding the store configuration
    pub(crate) factory: Arc<StoreFactory>,
    /// Store this helper points at
    pub(crate) instance: Instance,
    /// Open connection, `None` if opening failed
    connection: OnceCell<Option<Database>>,
}

impl StoreHelper {
    /// Create a helper for a store
    pub fn new(factory: Arc<StoreFactory>, instance: Instance) -> Self {
        Self {
            factory,
            instance,
            connection: OnceCell::new(),
        }
    }

    /// Helper for the default on-disk store
    pub fn default_store(factory: Arc<StoreFactory>) -> Self {
        Self::new(factory, Instance::Default)
    }

    /// Helper for the factory's in-memory store
    pub fn in_memory(factory: Arc<StoreFactory>) -> Self {
        Self::new(factory, Instance::InMemory)
    }

    /// Store this helper points at
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// New helper to the same store, with its own connection
    pub fn clone_handle(&self) -> Self {
        Self::new(Arc::clone(&self.factory), self.instance.clone())
    }

    /// Check if the store could be opened
    pub fn is_available(&self) -> bool {
        self.connection().is_some()
    }

    /// Store metadata, `None` if the store is unavailable
    pub fn store_properties(&self) -> Option<StoreProperties> {
        self.read(|db| db.properties())
    }

    /// Connection to the store, opened on first call
    pub(crate) fn connection(&self) -> Option<&Database> {
        self.connection
            .get_or_init(|| match self.factory.make(&self.instance) {
                Ok(db) => Some(db),
                Err(e) => {
                    log::error!("Failed to open {}: {}", self.instance, e);
                    None
                }
            })
            .as_ref()
    }

    /// Run a read, degrading to the default value when it cannot complete
    pub(crate) fn read<R: Default>(&self, query: impl FnOnce(&Database) -> std::result::Result<R, EngineError>) -> R {
        let Some(db) = self.connection() else {
            return R::default();
        };

        query(db).unwrap_or_else(|e| {
            log::warn!("Read from {} failed: {}", self.instance, e);
            R::default()
        })
    }

    /// Run `block` inside one write transaction
    ///
    /// The transaction commits when `block` returns `Ok` and rolls back
    /// otherwise.
    ///
    /// # Errors
    ///
    /// - [`StoreError::CannotAccessFile`] if the store cannot be opened
    /// - [`StoreError::CannotWriteOnDisk`] if the engine fails during the
    ///   block or on commit
    /// - store errors raised by `block` itself, unchanged
    pub fn write_in_store<R, F>(&self, block: F) -> Result<R>
    where
        F: FnOnce(&Writer<'_>) -> Result<R>,
    {
        let db = self.connection().ok_or_else(|| {
            StoreError::CannotAccessFile(format!("{} is not available", self.instance))
        })?;

        let writer = db.begin_write()?;
        let value = block(&writer)?;
        writer.commit()?;
        Ok(value)
    }

    /// Whether record contents should be logged
    pub(crate) fn log_records(&self) -> bool {
        self.factory.config().log_records
    }
}
