use std::fmt;

use super::field::Value;
use super::{Field, FieldName, FieldValue};

/// A partial record: zero or more field updates applied in one step by
/// [`Store::patch`](super::Store::patch) or
/// [`Store::batch_set`](super::Store::batch_set).
///
/// When the same field is written twice, the later value wins.
#[derive(Clone, Default)]
pub struct Patch {
    entries: Vec<(FieldName, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an update for `field`.
    pub fn with<T: FieldValue>(mut self, field: &Field<T>, value: T) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert<T: FieldValue>(&mut self, field: &Field<T>, value: T) {
        let value = Value::new(value);
        match self.entries.iter_mut().find(|(name, _)| name == field.name()) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((field.name().clone(), value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the fields this patch touches, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &FieldName> {
        self.entries.iter().map(|(name, _)| name)
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (FieldName, Value)> {
        self.entries.into_iter()
    }
}

impl fmt::Debug for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, value)| (name, value)))
            .finish()
    }
}
