//! Read operations
//!
//! Reads never fail: an unavailable store or a failed query yields an
//! empty result.

use serde_json::Value;

use crate::record::Record;
use super::helper::StoreHelper;

impl StoreHelper {
    /// First stored record of `T`
    pub fn find_first<T: Record>(&self) -> Option<T> {
        self.find_all::<T>().into_iter().next()
    }

    /// All stored records of `T` in insertion order
    pub fn find_all<T: Record>(&self) -> Vec<T> {
        self.read(|db| db.objects::<T>())
    }

    /// All stored records of `T` matching a predicate
    pub fn find<T: Record>(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.find_all::<T>()
            .into_iter()
            .filter(|record| predicate(record))
            .collect()
    }

    /// First stored record of `T` matching a predicate
    pub fn find_first_where<T: Record>(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.find_all::<T>()
            .into_iter()
            .find(|record| predicate(record))
    }

    /// Stored record of `T` with the given primary key
    ///
    /// Always `None` for types without a primary key.
    pub fn find_by_primary_key<T: Record>(&self, key: impl Into<Value>) -> Option<T> {
        let key = key.into();
        self.read(|db| db.object_by_primary_key::<T>(&key))
    }

    /// Number of stored records of `T`
    pub fn count<T: Record>(&self) -> usize {
        self.read(|db| db.count::<T>())
    }

    /// Number of stored records of `T` matching a predicate
    pub fn count_where<T: Record>(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.find_all::<T>()
            .into_iter()
            .filter(|record| predicate(record))
            .count()
    }
}
