//! Business logic layer for objkeep
//!
//! This module provides the [`StoreHelper`] API: typed reads, saves and
//! updates, plain and cascading deletes.

pub mod helper;
mod reads;
mod writes;
mod delete;
mod cascade;

pub use helper::StoreHelper;
