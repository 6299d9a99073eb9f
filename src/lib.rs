//! # objkeep
//!
//! A typed, encrypted object store on top of SQLite.
//!
//! ## Features
//!
//! - Store any serde type by implementing [`Record`]
//! - AES-256-CBC encryption of every stored payload
//! - One file per named store, plus a process-local in-memory store
//! - Store keys kept in the platform keychain (`keyring` feature)
//! - All-or-nothing write transactions
//! - Auto-increment of an integer property on save
//! - Cascading deletes along instance and type ownership graphs
//! - Schema versioning with a pluggable [`Migrator`]
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use objkeep::{Record, StoreConfig, StoreFactory, StoreHelper};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Employee {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Record for Employee {
//!     const NAME: &'static str = "Employee";
//!     const PRIMARY_KEY: Option<&'static str> = Some("id");
//! }
//!
//! let factory = Arc::new(StoreFactory::new(StoreConfig::from_env(Path::new("/path/to/stores"))));
//! let store = StoreHelper::default_store(factory);
//!
//! let mut employee = Employee { id: 0, name: "Ada".into() };
//! store.save(&mut employee, Some("id")).unwrap();
//!
//! for employee in store.find_all::<Employee>() {
//!     println!("{}: {}", employee.id, employee.name);
//! }
//! ```

pub mod crypto;
pub mod database;
pub mod record;
pub mod factory;
pub mod business;
pub mod error;

// Re-export main types
pub use error::{StoreError, EngineError, Result};
pub use record::{
    AnyRecord, CascadeDeletable, CascadeDeletableInstances, CascadeDeletableTypes, Record, RecordType,
};
pub use business::StoreHelper;
pub use factory::{Instance, KeyStore, MemoryKeyStore, StoreConfig, StoreFactory};
#[cfg(feature = "keyring")]
pub use factory::KeyringKeyStore;
pub use database::{Migration, Migrator, StoreProperties, Writer};

/// Schema version used when none is configured
pub const DEFAULT_SCHEMA_VERSION: u64 = 1;

/// Schema version of the in-memory store, never migrated
pub const IN_MEMORY_SCHEMA_VERSION: u64 = 1;

/// Default service name prefixing key names
pub const DEFAULT_SERVICE: &str = "objkeep";

/// Environment variable overriding the schema version
pub const SCHEMA_VERSION_ENV: &str = "OBJKEEP_SCHEMA_VERSION";

/// Extension of store files
pub const STORE_FILE_EXTENSION: &str = "store";
