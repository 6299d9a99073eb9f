//! Delete operations, plain and cascading

use crate::error::{Result, StoreError};
use crate::record::{AnyRecord, CascadeDeletableInstances, CascadeDeletableTypes, Record, RecordType};
use super::cascade;
use super::helper::StoreHelper;

/// Delete failures keep `ObjectNotFound`, everything else is `CannotDelete`
fn deletion_error(err: StoreError) -> StoreError {
    match err {
        StoreError::ObjectNotFound(_) | StoreError::CannotDelete(_) => err,
        other => StoreError::CannotDelete(other.to_string()),
    }
}

impl StoreHelper {
    /// Delete a record, leaving the records it owns in place
    ///
    /// # Errors
    ///
    /// [`StoreError::ObjectNotFound`] if the record is not stored,
    /// [`StoreError::CannotDelete`] for any other failure.
    pub fn delete<T: Record>(&self, element: &T) -> Result<()> {
        self.delete_all_of(std::slice::from_ref(element))
    }

    /// Delete records, leaving the records they own in place
    ///
    /// All or nothing: if one record is missing, none is deleted.
    pub fn delete_all_of<T: Record>(&self, elements: &[T]) -> Result<()> {
        self.write_in_store(|writer| {
            for element in elements {
                writer.delete(element)?;
            }
            Ok(())
        })
        .map_err(deletion_error)?;

        if self.log_records() {
            log::debug!("Deleted elements: {:?}", elements);
        } else {
            log::debug!("Deleted {} {} element(s)", elements.len(), T::NAME);
        }
        Ok(())
    }

    /// Delete every stored record of `T`, leaving owned types in place
    pub fn delete_all<T: Record>(&self) -> Result<()> {
        let deleted = self
            .write_in_store(|writer| Ok(writer.delete_all::<T>()?))
            .map_err(deletion_error)?;

        log::debug!("Deleted all {} {} element(s)", deleted, T::NAME);
        Ok(())
    }

    /// Delete a record together with everything it transitively owns
    ///
    /// Children are deleted before their parents. The ownership graph
    /// must be acyclic.
    ///
    /// # Errors
    ///
    /// [`StoreError::ObjectNotFound`] if any reachable record is not
    /// stored, [`StoreError::CannotDelete`] for any other failure. Nothing
    /// is deleted on error.
    pub fn cascading_delete<T>(&self, element: &T) -> Result<()>
    where
        T: Record + CascadeDeletableInstances,
    {
        self.cascading_delete_all_of(std::slice::from_ref(element))
    }

    /// Cascade-delete several roots in one transaction, one after another
    pub fn cascading_delete_all_of<T>(&self, elements: &[T]) -> Result<()>
    where
        T: Record + CascadeDeletableInstances,
    {
        let deleted = self
            .write_in_store(|writer| {
                let mut deleted = 0;
                for element in elements {
                    deleted += cascade::delete_instance(writer, element, element.owned_children())?;
                }
                Ok(deleted)
            })
            .map_err(deletion_error)?;

        if self.log_records() {
            log::debug!("Cascade deleted {} element(s) from roots {:?}", deleted, elements);
        } else {
            log::debug!("Cascade deleted {} element(s) from {} {} root(s)", deleted, elements.len(), T::NAME);
        }
        Ok(())
    }

    /// Delete every stored record of `T` and of every type it transitively owns
    ///
    /// Owned types are wiped whole, including records no `T` refers to.
    pub fn cascading_delete_all<T>(&self) -> Result<()>
    where
        T: Record + CascadeDeletableTypes,
    {
        let deleted = self
            .write_in_store(|writer| {
                let record_type = RecordType::of::<T>();
                Ok(cascade::delete_type(writer, record_type, record_type.owned_types())?)
            })
            .map_err(deletion_error)?;

        log::debug!("Cascade deleted all {} and owned types: {} element(s)", T::NAME, deleted);
        Ok(())
    }

    /// Delete every stored record of every type
    pub fn clear_database(&self) -> Result<()> {
        let deleted = self
            .write_in_store(|writer| Ok(writer.delete_everything()?))
            .map_err(deletion_error)?;

        log::debug!("Store cleared: {} element(s)", deleted);
        Ok(())
    }
}
