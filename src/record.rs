//! Record types and cascade-delete capabilities
//!
//! Any serde-serializable type becomes storable by implementing
//! [`Record`]. Types that own other records for lifecycle purposes opt in
//! to cascading deletes by declaring what they own on [`Record`] and
//! implementing [`CascadeDeletableInstances`] (instance graph) or
//! [`CascadeDeletableTypes`] (type graph).
//!
//! Ownership graphs are expected to mirror containment and must be
//! acyclic. The cascade walkers do not detect cycles.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// A type that can be persisted in a store
///
/// ```
/// use objkeep::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Employee {
///     id: i64,
///     name: String,
/// }
///
/// impl Record for Employee {
///     const NAME: &'static str = "Employee";
///     const PRIMARY_KEY: Option<&'static str> = Some("id");
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + fmt::Debug + 'static {
    /// Stable type name, used as the stored record type
    const NAME: &'static str;

    /// Name of the primary key field, if the type declares one
    const PRIMARY_KEY: Option<&'static str> = None;

    /// Records exclusively owned by this one
    ///
    /// Cascading deletes remove them, with everything they own in turn,
    /// before this record. Owns nothing by default.
    fn objects_for_cascade_delete(&self) -> Vec<Box<dyn AnyRecord>> {
        Vec::new()
    }

    /// Record types whose whole extent is owned by this type
    ///
    /// Type-wide cascading deletes wipe them before this type. Owns no
    /// type by default.
    fn types_for_cascade_delete() -> Vec<RecordType> {
        Vec::new()
    }
}

/// Opt-in for [`StoreHelper::cascading_delete`](crate::StoreHelper::cascading_delete)
///
/// Children are declared once, in [`Record::objects_for_cascade_delete`],
/// and are walked the same way whether the record is the root or reached
/// as someone else's child.
pub trait CascadeDeletableInstances: Record {}

/// Opt-in for [`StoreHelper::cascading_delete_all`](crate::StoreHelper::cascading_delete_all)
///
/// Owned types are declared once, in [`Record::types_for_cascade_delete`].
pub trait CascadeDeletableTypes: Record {}

/// Both cascade capabilities
pub trait CascadeDeletable: CascadeDeletableInstances + CascadeDeletableTypes {}

impl<T: CascadeDeletableInstances + CascadeDeletableTypes> CascadeDeletable for T {}

/// Descriptor of a record type, usable without the static type
#[derive(Clone, Copy)]
pub struct RecordType {
    name: &'static str,
    primary_key: Option<&'static str>,
    owned_types: fn() -> Vec<RecordType>,
}

impl RecordType {
    /// Descriptor for `T`
    pub fn of<T: Record>() -> Self {
        Self {
            name: T::NAME,
            primary_key: T::PRIMARY_KEY,
            owned_types: T::types_for_cascade_delete,
        }
    }

    /// Stored type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Primary key field name
    pub fn primary_key(&self) -> Option<&'static str> {
        self.primary_key
    }

    /// Types owned by this type for type-wide cascades
    pub fn owned_types(&self) -> Vec<RecordType> {
        (self.owned_types)()
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for RecordType {}

/// Object-safe view of any record
///
/// Implemented for every [`Record`], so children of different types can be
/// returned together from [`CascadeDeletableInstances`].
pub trait AnyRecord: fmt::Debug {
    /// Descriptor of the concrete type
    fn record_type(&self) -> RecordType;

    /// JSON form of the record as stored
    fn to_json(&self) -> EngineResult<Value>;

    /// Direct owned children, see [`Record::objects_for_cascade_delete`]
    fn owned_children(&self) -> Vec<Box<dyn AnyRecord>>;
}

impl<T: Record> AnyRecord for T {
    fn record_type(&self) -> RecordType {
        RecordType::of::<T>()
    }

    fn to_json(&self) -> EngineResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn owned_children(&self) -> Vec<Box<dyn AnyRecord>> {
        self.objects_for_cascade_delete()
    }
}

/// Read an integer property from a record's JSON form
///
/// `Ok(None)` for a null value. Missing or non-integer values are an error.
pub(crate) fn integer_property(value: &Value, property: &str) -> EngineResult<Option<i64>> {
    match value.get(property) {
        Some(Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| {
            EngineError::InvalidProperty(format!("{} is not an integer", property))
        }),
        None => Err(EngineError::InvalidProperty(format!("{} does not exist", property))),
    }
}

/// Set an integer property on a record by name
///
/// The property must already exist in the record's JSON form and hold an
/// integer or null.
pub(crate) fn set_integer_property<T: Record>(
    record: &mut T,
    property: &str,
    new_value: i64,
) -> EngineResult<()> {
    let mut value = serde_json::to_value(&*record)?;
    integer_property(&value, property)?;

    let Some(object) = value.as_object_mut() else {
        return Err(EngineError::InvalidProperty(format!(
            "{} is not stored as an object",
            T::NAME
        )));
    };
    object.insert(property.to_string(), Value::from(new_value));

    *record = serde_json::from_value(value)?;
    Ok(())
}
