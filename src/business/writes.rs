//! Save and update operations

use crate::error::{EngineError, Result};
use crate::record::{set_integer_property, Record, RecordType};
use super::helper::StoreHelper;

impl StoreHelper {
    /// Save a new record
    ///
    /// See [`StoreHelper::save_all`] for `increment_property`.
    pub fn save<T: Record>(&self, element: &mut T, increment_property: Option<&str>) -> Result<()> {
        self.save_all(std::slice::from_mut(element), increment_property)
    }

    /// Save new records
    ///
    /// With `increment_property`, that integer field is assigned the
    /// current maximum across stored records of `T` plus one, two, ... in
    /// input order, and the assigned values are written back into
    /// `elements`. Everything happens in one transaction.
    ///
    /// # Errors
    ///
    /// - [`StoreError::CannotAccessFile`](crate::StoreError::CannotAccessFile) if the store cannot be opened
    /// - [`StoreError::CannotWriteOnDisk`](crate::StoreError::CannotWriteOnDisk) on engine failure,
    ///   including a duplicate primary key
    /// - [`StoreError::InvalidProperty`](crate::StoreError::InvalidProperty) if the increment property
    ///   is not an integer or the next value would overflow
    pub fn save_all<T: Record>(&self, elements: &mut [T], increment_property: Option<&str>) -> Result<()> {
        self.write_in_store(|writer| {
            if let Some(property) = increment_property {
                let mut next = writer
                    .max_of_property(RecordType::of::<T>(), property)?
                    .unwrap_or(0);
                for element in elements.iter_mut() {
                    next = next.checked_add(1).ok_or_else(|| {
                        EngineError::InvalidProperty(format!("{}.{} overflows", T::NAME, property))
                    })?;
                    set_integer_property(element, property, next)?;
                }
            }

            for element in elements.iter() {
                writer.add(element)?;
            }
            Ok(())
        })?;

        if self.log_records() {
            log::debug!("Inserted elements: {:?}", elements);
        } else {
            log::debug!("Inserted {} {} element(s)", elements.len(), T::NAME);
        }
        Ok(())
    }

    /// Insert or replace a record by primary key
    pub fn update<T: Record>(&self, element: &T) -> Result<()> {
        self.update_all(std::slice::from_ref(element))
    }

    /// Insert or replace records by primary key
    ///
    /// # Errors
    ///
    /// [`StoreError::CannotWriteOnDisk`](crate::StoreError::CannotWriteOnDisk) when `T` declares no
    /// primary key or the engine fails, and
    /// [`StoreError::CannotAccessFile`](crate::StoreError::CannotAccessFile) if the store cannot be opened.
    pub fn update_all<T: Record>(&self, elements: &[T]) -> Result<()> {
        self.write_in_store(|writer| {
            for element in elements {
                writer.upsert(element)?;
            }
            Ok(())
        })?;

        if self.log_records() {
            log::debug!("Updated elements: {:?}", elements);
        } else {
            log::debug!("Updated {} {} element(s)", elements.len(), T::NAME);
        }
        Ok(())
    }
}
