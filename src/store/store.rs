use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::field::Value;
use super::subscription::{ListenerId, Subscription};
use super::{Field, FieldName, FieldValue, Patch, Record, RecordBuilder, StoreError, StoreResult};
use crate::binder::{Binder, FieldBinder, Setter};
use crate::runtime::{self, ConsumerId, SharedScheduler};

type Listener = Rc<dyn Fn(&Record, &Change)>;

/// What a store notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Change {
    /// A single field was set to a new value.
    Field(FieldName),
    /// Wildcard: the record was patched and any field may have changed.
    All,
}

impl Change {
    /// The changed field, or `None` for the wildcard.
    pub fn field(&self) -> Option<&FieldName> {
        match self {
            Self::Field(name) => Some(name),
            Self::All => None,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether a consumer of `name` has to look at this change.
    pub fn touches(&self, name: &str) -> bool {
        match self {
            Self::Field(changed) => changed.as_str() == name,
            Self::All => true,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::All => f.write_str("*"),
        }
    }
}

pub(crate) struct StoreInner {
    label: Option<String>,
    record: RefCell<Record>,
    listeners: RefCell<BTreeMap<ListenerId, Listener>>,
    next_listener: Cell<u64>,
}

impl StoreInner {
    pub(crate) fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow().contains_key(&id)
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) {
        // Released outside the borrow: dropping a listener may drop a binder.
        let removed = self.listeners.borrow_mut().remove(&id);
        if removed.is_some() {
            tracing::trace!(store = self.label.as_deref(), listener = id.0, "listener removed");
        }
        drop(removed);
    }
}

/// A reactive container for one record of named fields.
///
/// `Store` is a cheap handle: clones share the same record and listeners.
/// It is single-threaded; all reads, writes and notifications happen on the
/// thread that owns it.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use trackstore::{Change, Field, Store};
///
/// const AGE: Field<u32> = Field::new("age");
///
/// let store = Store::builder().field(&AGE, 0).build();
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&seen);
/// let _sub = store.subscribe(move |record, change| {
///     log.borrow_mut().push((change.clone(), record.get(&AGE)));
/// });
///
/// store.set(&AGE, 1);
/// store.set(&AGE, 1); // identical value, no notification
///
/// assert_eq!(*seen.borrow(), vec![(Change::Field("age".into()), Some(1))]);
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a store holding `initial`.
    pub fn new(initial: Record) -> Self {
        Self::from_parts(None, initial)
    }

    /// Configure a store field by field.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    fn from_parts(label: Option<String>, record: Record) -> Self {
        tracing::debug!(store = label.as_deref(), fields = record.len(), "store created");
        Self {
            inner: Rc::new(StoreInner {
                label,
                record: RefCell::new(record),
                listeners: RefCell::new(BTreeMap::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// The label given at construction, used in log output.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Current value of a field, or `None` if the record has no such field.
    pub fn get<T: FieldValue>(&self, field: &Field<T>) -> Option<T> {
        self.try_get(field)
            .map_err(|err| self.report(&err, "get"))
            .ok()
    }

    pub fn try_get<T: FieldValue>(&self, field: &Field<T>) -> StoreResult<T> {
        self.inner.record.borrow().try_get(field)
    }

    /// Read a field by reference.
    ///
    /// `f` sees a snapshot, so it may write to the store without conflict.
    pub fn with<T: FieldValue, R>(&self, field: &Field<T>, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.snapshot()
            .with(field, f)
            .map_err(|err| self.report(&err, "with"))
            .ok()
    }

    /// The full current record.
    pub fn snapshot(&self) -> Record {
        self.inner.record.borrow().clone()
    }

    /// Store `value` in `field` and notify every listener.
    ///
    /// Writing a value equal to the stored one is a no-op: nothing is stored
    /// and no listener runs. Returns whether the field changed. Writing to a
    /// field the record does not have is logged and ignored.
    pub fn set<T: FieldValue>(&self, field: &Field<T>, value: T) -> bool {
        self.try_set(field, value).unwrap_or_else(|err| {
            self.report(&err, "set");
            false
        })
    }

    /// Like [`set`](Self::set), reporting contract violations.
    pub fn try_set<T: FieldValue>(&self, field: &Field<T>, value: T) -> StoreResult<bool> {
        self.write(field.name(), Value::new(value))
    }

    /// Set `field` to a value computed from its current value.
    pub fn update<T: FieldValue>(&self, field: &Field<T>, f: impl FnOnce(&T) -> T) -> bool {
        match self.with(field, f) {
            Some(next) => self.set(field, next),
            None => false,
        }
    }

    /// Replace the record with a copy that has every entry of `patch`
    /// applied, then notify every listener once with [`Change::All`].
    ///
    /// Unlike [`set`](Self::set), values are not compared: listeners run
    /// even if no field actually changed. Entries naming unknown fields
    /// are logged and skipped.
    pub fn patch(&self, patch: Patch) {
        let entries: Vec<_> = {
            let record = self.inner.record.borrow();
            patch
                .into_entries()
                .filter(|(name, value)| match record.check(name, value) {
                    Ok(()) => true,
                    Err(err) => {
                        self.report(&err, "patch");
                        false
                    }
                })
                .collect()
        };
        self.commit_patch(entries);
    }

    /// Like [`patch`](Self::patch), but rejects the whole patch (without
    /// notifying) if any entry is invalid.
    pub fn try_patch(&self, patch: Patch) -> StoreResult<()> {
        let entries: Vec<_> = patch.into_entries().collect();
        {
            let record = self.inner.record.borrow();
            for (name, value) in &entries {
                record.check(name, value)?;
            }
        }
        self.commit_patch(entries);
        Ok(())
    }

    /// Apply each entry of `patch` through [`set`](Self::set) as one batch.
    ///
    /// Listeners see one [`Change::Field`] per field that actually changed,
    /// while consumer re-evaluation requests are collapsed until the batch
    /// ends (see [`batch`](crate::batch)). Returns the number of fields
    /// that changed.
    pub fn batch_set(&self, patch: Patch) -> usize {
        runtime::batch(|| {
            let mut changed = 0;
            for (name, value) in patch.into_entries() {
                match self.write(&name, value) {
                    Ok(true) => changed += 1,
                    Ok(false) => {}
                    Err(err) => self.report(&err, "batch_set"),
                }
            }
            changed
        })
    }

    /// Register a listener called after every successful write with the
    /// current record and what changed.
    ///
    /// Listeners may write to the store, subscribe and unsubscribe from
    /// inside the callback. A listener added during a notification is first
    /// called for the next one; a listener removed during a notification is
    /// not called for the rest of it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Record, &Change) + 'static,
    {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .insert(id, Rc::new(listener));
        tracing::trace!(store = self.label(), listener = id.0, "listener added");
        Subscription::new(id, Rc::downgrade(&self.inner))
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Log every change to this store at `INFO` until the subscription is
    /// dropped.
    pub fn trace_changes(&self) -> Subscription {
        let label = self.inner.label.clone();
        self.subscribe(move |record, change| match change {
            Change::Field(name) => tracing::info!(
                store = label.as_deref(),
                field = %name,
                value = ?record.value(name.as_str()),
                "state changed"
            ),
            Change::All => tracing::info!(
                store = label.as_deref(),
                record = ?record,
                "state patched"
            ),
        })
    }

    /// Bind a consumer to the whole record; see [`Binder`].
    pub fn bind_all(&self, consumer: ConsumerId, scheduler: SharedScheduler) -> Binder {
        Binder::new(self.clone(), consumer, scheduler)
    }

    /// Bind a consumer to a single field; see [`FieldBinder`].
    pub fn bind_field<T: FieldValue>(
        &self,
        field: &Field<T>,
        consumer: ConsumerId,
        scheduler: SharedScheduler,
    ) -> FieldBinder<T> {
        FieldBinder::new(self, field.clone(), consumer, scheduler)
    }

    /// A write-only handle to one field; see [`Setter`].
    pub fn bind_setter<T: FieldValue>(&self, field: &Field<T>) -> Setter<T> {
        Setter::new(self.clone(), field.clone())
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn write(&self, name: &FieldName, value: Value) -> StoreResult<bool> {
        {
            let record = self.inner.record.borrow();
            record.check(name, &value)?;
            if record
                .value(name.as_str())
                .is_some_and(|current| current.is_same(&value))
            {
                return Ok(false);
            }
        }
        let previous = self.inner.record.borrow_mut().insert(name.clone(), value);
        drop(previous);
        self.notify(Change::Field(name.clone()));
        Ok(true)
    }

    fn commit_patch(&self, entries: Vec<(FieldName, Value)>) {
        let next = self.inner.record.borrow().merged(entries);
        let previous = self.inner.record.replace(next);
        drop(previous);
        self.notify(Change::All);
    }

    fn notify(&self, change: Change) {
        let ids: Vec<ListenerId> = self.inner.listeners.borrow().keys().copied().collect();
        tracing::debug!(
            store = self.label(),
            change = %change,
            listeners = ids.len(),
            "dispatching change"
        );
        for id in ids {
            // Skip listeners removed by an earlier listener in this pass.
            let listener = self.inner.listeners.borrow().get(&id).cloned();
            if let Some(listener) = listener {
                // Fresh per listener: an earlier listener may have written back.
                let record = self.snapshot();
                listener(&record, &change);
            }
        }
    }

    fn report(&self, err: &StoreError, operation: &'static str) {
        tracing::warn!(
            store = self.label(),
            operation,
            field = %err.field(),
            error = %err,
            "invalid field access ignored"
        );
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.inner.label)
            .field("record", &*self.inner.record.borrow())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Chained configuration for a [`Store`].
#[derive(Default)]
pub struct StoreBuilder {
    label: Option<String>,
    record: RecordBuilder,
}

impl StoreBuilder {
    /// Name the store in log output.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Declare a field and its initial value.
    pub fn field<T: FieldValue>(mut self, field: &Field<T>, initial: T) -> Self {
        self.record = self.record.field(field, initial);
        self
    }

    pub fn build(self) -> Store {
        Store::from_parts(self.label, self.record.build())
    }
}
