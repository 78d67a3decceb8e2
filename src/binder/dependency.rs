use std::collections::HashSet;

use crate::store::{Change, FieldName};

/// The fields a consumer has read.
///
/// Entries are only ever added. A consumer that read a field once keeps
/// receiving its changes even after it stops reading it.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    fields: HashSet<FieldName>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read. Returns `true` the first time `name` is marked.
    pub fn mark(&mut self, name: &FieldName) -> bool {
        if self.fields.contains(name) {
            return false;
        }
        self.fields.insert(name.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    /// Whether `change` concerns this consumer.
    pub fn matches(&self, change: &Change) -> bool {
        match change {
            Change::All => true,
            Change::Field(name) => self.fields.contains(name),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Marked field names, sorted.
    pub fn names(&self) -> Vec<FieldName> {
        let mut names: Vec<_> = self.fields.iter().cloned().collect();
        names.sort();
        names
    }
}
