use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::{self, ConsumerId, SharedScheduler};
use crate::store::{Field, FieldValue, Store, Subscription};

/// Binds a consumer to exactly one field.
///
/// The binder keeps its own copy of the field's value. The copy is refreshed,
/// and the consumer asked to re-run, only when that field is set or the
/// store is patched; changes to other fields are ignored entirely.
pub struct FieldBinder<T> {
    field: Field<T>,
    consumer: ConsumerId,
    value: Rc<RefCell<Option<T>>>,
    _subscription: Subscription,
}

impl<T: FieldValue> FieldBinder<T> {
    pub(crate) fn new(
        store: &Store,
        field: Field<T>,
        consumer: ConsumerId,
        scheduler: SharedScheduler,
    ) -> Self {
        let value = Rc::new(RefCell::new(store.get(&field)));

        let cached = Rc::clone(&value);
        let tracked = field.clone();
        let subscription = store.subscribe(move |record, change| {
            if !change.touches(tracked.name().as_str()) {
                return;
            }
            let fresh = record.get(&tracked);
            let previous = cached.replace(fresh);
            drop(previous);
            runtime::request(consumer, &scheduler);
        });

        Self {
            field,
            consumer,
            value,
            _subscription: subscription,
        }
    }

    /// The cached value of the field.
    pub fn get(&self) -> Option<T> {
        self.value.borrow().clone()
    }

    /// Read the cached value by reference.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.value.borrow().as_ref())
    }

    pub fn field(&self) -> &Field<T> {
        &self.field
    }

    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }

    /// Release the store subscription for good.
    pub fn retire(self) {}
}

impl<T: FieldValue> fmt::Debug for FieldBinder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinder")
            .field("field", self.field.name())
            .field("consumer", &self.consumer)
            .field("value", &*self.value.borrow())
            .finish()
    }
}
