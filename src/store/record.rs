use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::field::Value;
use super::{Field, FieldName, FieldValue, Patch, StoreError, StoreResult};

/// A snapshot of every field held by a store.
///
/// Cloning a `Record` is cheap: snapshots share storage until the store
/// writes to a field while a snapshot is still alive, at which point the
/// store copies before mutating. A snapshot therefore never changes after
/// it has been handed out.
#[derive(Clone, Default)]
pub struct Record {
    fields: Rc<HashMap<FieldName, Value>>,
}

impl Record {
    /// Start building a record field by field.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Clone the value of a field, or `None` if the record has no such field
    /// of type `T`.
    pub fn get<T: FieldValue>(&self, field: &Field<T>) -> Option<T> {
        self.try_get(field).ok()
    }

    /// Like [`get`](Self::get), reporting why the value is absent.
    pub fn try_get<T: FieldValue>(&self, field: &Field<T>) -> StoreResult<T> {
        self.with(field, T::clone)
    }

    /// Read a field by reference.
    pub fn with<T: FieldValue, R>(
        &self,
        field: &Field<T>,
        f: impl FnOnce(&T) -> R,
    ) -> StoreResult<R> {
        let value = self
            .fields
            .get(field.name())
            .ok_or_else(|| StoreError::UnknownField {
                field: field.name().clone(),
            })?;
        value
            .downcast_ref::<T>()
            .map(f)
            .ok_or_else(|| StoreError::TypeMismatch {
                field: field.name().clone(),
                expected: std::any::type_name::<T>(),
                found: value.type_name(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in unspecified order.
    pub fn names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.keys()
    }

    /// Whether both records are the same snapshot (not merely equal content).
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }

    pub(crate) fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Check that `value` may be written to `name`.
    pub(crate) fn check(&self, name: &FieldName, value: &Value) -> StoreResult<()> {
        let current = self
            .fields
            .get(name)
            .ok_or_else(|| StoreError::UnknownField {
                field: name.clone(),
            })?;
        if current.value_type() != value.value_type() {
            return Err(StoreError::TypeMismatch {
                field: name.clone(),
                expected: current.type_name(),
                found: value.type_name(),
            });
        }
        Ok(())
    }

    /// Overwrite one field, copying the storage first if a snapshot shares it.
    pub(crate) fn insert(&mut self, name: FieldName, value: Value) -> Option<Value> {
        Rc::make_mut(&mut self.fields).insert(name, value)
    }

    /// A new record with every entry of `patch` applied over this one.
    pub(crate) fn merged(&self, patch: impl IntoIterator<Item = (FieldName, Value)>) -> Record {
        let mut fields = HashMap::clone(&self.fields);
        fields.extend(patch);
        Record {
            fields: Rc::new(fields),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sorted: BTreeMap<_, _> = self.fields.iter().collect();
        f.debug_map().entries(sorted).finish()
    }
}

impl From<Patch> for Record {
    fn from(patch: Patch) -> Self {
        Record::default().merged(patch.into_entries())
    }
}

/// Chained constructor for a [`Record`].
#[derive(Default)]
pub struct RecordBuilder {
    fields: HashMap<FieldName, Value>,
}

impl RecordBuilder {
    /// Add a field. Declaring the same name twice keeps the later value.
    pub fn field<T: FieldValue>(mut self, field: &Field<T>, initial: T) -> Self {
        self.fields.insert(field.name().clone(), Value::new(initial));
        self
    }

    pub fn build(self) -> Record {
        Record {
            fields: Rc::new(self.fields),
        }
    }
}
