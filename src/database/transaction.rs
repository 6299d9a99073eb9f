//! Write transactions
//!
//! A [`Writer`] is the only way to mutate a store. It wraps one SQLite
//! transaction: dropping it without [`Writer::commit`] rolls everything
//! back.

use rusqlite::Transaction;

use super::models::{decode_payload, EncodedRow, RowKey};
use super::queries;
use crate::error::{EngineError, EngineResult};
use crate::record::{integer_property, AnyRecord, Record, RecordType};

/// An open write transaction on a store
pub struct Writer<'a> {
    tx: Transaction<'a>,
    key: &'a [u8],
}

impl<'a> Writer<'a> {
    pub(crate) fn new(tx: Transaction<'a>, key: &'a [u8]) -> Self {
        Self { tx, key }
    }

    /// Insert a new record
    pub fn add<T: Record>(&self, record: &T) -> EngineResult<()> {
        self.add_any(record)
    }

    /// Insert a new record of any type
    pub fn add_any(&self, record: &dyn AnyRecord) -> EngineResult<()> {
        let record_type = record.record_type();
        let row = EncodedRow::encode(&record_type, &record.to_json()?, self.key)?;
        queries::insert_record(
            &self.tx,
            record_type.name(),
            row.primary_key.as_deref(),
            &row.digest,
            &row.payload,
        )
    }

    /// Insert a record or replace the stored one with the same primary key
    pub fn upsert<T: Record>(&self, record: &T) -> EngineResult<()> {
        let record_type = RecordType::of::<T>();
        let row = EncodedRow::encode(&record_type, &record.to_json()?, self.key)?;
        let primary_key = row
            .primary_key
            .ok_or_else(|| EngineError::MissingPrimaryKey(T::NAME.to_string()))?;

        queries::upsert_record(&self.tx, T::NAME, &primary_key, &row.digest, &row.payload)
    }

    /// Delete one stored record
    pub fn delete<T: Record>(&self, record: &T) -> EngineResult<()> {
        self.delete_any(record)
    }

    /// Delete one stored record of any type
    ///
    /// Fails with [`EngineError::NotFound`] when nothing matches.
    pub fn delete_any(&self, record: &dyn AnyRecord) -> EngineResult<()> {
        let record_type = record.record_type();
        let deleted = match RowKey::of(&record_type, &record.to_json()?)? {
            RowKey::Primary(key) => queries::delete_by_primary_key(&self.tx, record_type.name(), &key)?,
            RowKey::Digest(digest) => queries::delete_by_digest(&self.tx, record_type.name(), &digest)?,
        };

        if deleted == 0 {
            return Err(EngineError::NotFound(record_type.name().to_string()));
        }
        Ok(())
    }

    /// Delete every stored record of a type, returns records deleted
    pub fn delete_type(&self, record_type: RecordType) -> EngineResult<usize> {
        queries::delete_records_of_type(&self.tx, record_type.name())
    }

    /// Delete every stored record of `T`, returns records deleted
    pub fn delete_all<T: Record>(&self) -> EngineResult<usize> {
        self.delete_type(RecordType::of::<T>())
    }

    /// Delete every stored record of every type
    pub fn delete_everything(&self) -> EngineResult<usize> {
        queries::delete_all_records(&self.tx)
    }

    /// Stored records of `T` as seen inside this transaction
    pub fn objects<T: Record>(&self) -> EngineResult<Vec<T>> {
        queries::get_records_raw(&self.tx, T::NAME)?
            .iter()
            .map(|raw| Ok(serde_json::from_value(decode_payload(&raw.payload, self.key)?)?))
            .collect()
    }

    /// Maximum of an integer property across stored records of a type
    ///
    /// Records where the property is absent or null are skipped. `None`
    /// when no record holds a value.
    pub fn max_of_property(&self, record_type: RecordType, property: &str) -> EngineResult<Option<i64>> {
        let mut max: Option<i64> = None;
        for raw in queries::get_records_raw(&self.tx, record_type.name())? {
            let value = decode_payload(&raw.payload, self.key)?;
            if value.get(property).is_none() {
                continue;
            }
            if let Some(n) = integer_property(&value, property)? {
                max = Some(max.map_or(n, |m| m.max(n)));
            }
        }
        Ok(max)
    }

    /// Commit every change made through this writer
    pub(crate) fn commit(self) -> EngineResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}
