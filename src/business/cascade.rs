//! Cascading delete walkers
//!
//! Both walks are depth-first and post-order: everything a node owns is
//! deleted before the node itself. Ownership graphs must be acyclic.

use crate::database::Writer;
use crate::error::EngineResult;
use crate::record::{AnyRecord, RecordType};

/// Delete `children`, each with its owned subgraph, then `element`
///
/// Returns the number of records deleted.
pub(crate) fn delete_instance(
    writer: &Writer<'_>,
    element: &dyn AnyRecord,
    children: Vec<Box<dyn AnyRecord>>,
) -> EngineResult<usize> {
    let mut deleted = 0;
    for child in children {
        let grandchildren = child.owned_children();
        deleted += delete_instance(writer, child.as_ref(), grandchildren)?;
    }

    writer.delete_any(element)?;
    log::trace!("Cascade deleted one {}", element.record_type().name());
    Ok(deleted + 1)
}

/// Delete the extents of `owned_types`, recursively, then of `record_type`
///
/// Returns the number of records deleted.
pub(crate) fn delete_type(
    writer: &Writer<'_>,
    record_type: RecordType,
    owned_types: Vec<RecordType>,
) -> EngineResult<usize> {
    let mut deleted = 0;
    for child in owned_types {
        deleted += delete_type(writer, child, child.owned_types())?;
    }

    let own = writer.delete_type(record_type)?;
    log::trace!("Cascade deleted {} {}", own, record_type.name());
    Ok(deleted + own)
}
