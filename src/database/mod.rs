//! Storage engine adapter
//!
//! Handles SQLite operations including:
//! - Schema creation, key verification and migrations
//! - Encrypted record rows keyed by type and identity
//! - Write transactions

pub mod models;
pub mod schema;
pub mod connection;
pub mod migrations;
pub mod queries;
pub mod transaction;

pub use connection::{Database, Location};
pub use migrations::{Migration, Migrator};
pub use models::StoreProperties;
pub use transaction::Writer;
