use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::DependencySet;
use crate::runtime::{self, ConsumerId, SharedScheduler};
use crate::store::{Field, FieldName, FieldValue, Store, Subscription};

/// Tracked access to a store's fields during an evaluation pass.
///
/// Every read marks the field as a dependency of the owning [`Binder`] and
/// returns the store's current value. Writes go straight to
/// [`Store::set`].
pub struct View {
    store: Store,
    deps: Rc<RefCell<DependencySet>>,
}

impl View {
    /// Read a field and depend on it.
    pub fn get<T: FieldValue>(&self, field: &Field<T>) -> Option<T> {
        self.track(field.name());
        self.store.get(field)
    }

    /// Read a field by reference and depend on it.
    pub fn with<T: FieldValue, R>(&self, field: &Field<T>, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.track(field.name());
        self.store.with(field, f)
    }

    pub fn set<T: FieldValue>(&self, field: &Field<T>, value: T) -> bool {
        self.store.set(field, value)
    }

    pub fn update<T: FieldValue>(&self, field: &Field<T>, f: impl FnOnce(&T) -> T) -> bool {
        self.store.update(field, f)
    }

    fn track(&self, name: &FieldName) {
        if self.deps.borrow_mut().mark(name) {
            tracing::trace!(store = self.store.label(), field = %name, "dependency recorded");
        }
    }
}

/// Connects one consumer to a store, re-evaluating it only when a field it
/// has read changes.
///
/// Create one `Binder` per consumer instance and keep it for the consumer's
/// lifetime. Each evaluation pass runs through [`evaluate`](Self::evaluate);
/// the first pass subscribes to the store, and every later notification for
/// a field read in any pass (or a patch) asks the scheduler to re-run the
/// consumer. Dropping the binder, or calling [`retire`](Self::retire),
/// releases the subscription.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use trackstore::{ConsumerId, Field, Store, TurnScheduler};
///
/// const AGE: Field<u32> = Field::new("age");
/// const NAME: Field<String> = Field::new("name");
///
/// let store = Store::builder()
///     .field(&AGE, 0)
///     .field(&NAME, "alistair".to_string())
///     .build();
/// let scheduler = Rc::new(TurnScheduler::new());
/// let consumer = ConsumerId::new();
/// let binder = store.bind_all(consumer, scheduler.clone());
///
/// let name = binder.evaluate(|view| view.get(&NAME));
/// assert_eq!(name.as_deref(), Some("alistair"));
///
/// store.set(&AGE, 1);
/// assert!(!scheduler.is_pending(consumer));
///
/// store.set(&NAME, "someone".to_string());
/// assert!(scheduler.is_pending(consumer));
/// ```
pub struct Binder {
    consumer: ConsumerId,
    scheduler: SharedScheduler,
    view: View,
    subscription: RefCell<Option<Subscription>>,
    passes: Cell<u64>,
}

impl Binder {
    pub(crate) fn new(store: Store, consumer: ConsumerId, scheduler: SharedScheduler) -> Self {
        Self {
            consumer,
            scheduler,
            view: View {
                store,
                deps: Rc::default(),
            },
            subscription: RefCell::new(None),
            passes: Cell::new(0),
        }
    }

    /// Run one evaluation pass of the consumer.
    ///
    /// Reads made through the view during `f` become dependencies. The
    /// binder subscribes to the store after its first pass.
    pub fn evaluate<R>(&self, f: impl FnOnce(&View) -> R) -> R {
        let result = f(&self.view);
        self.passes.set(self.passes.get() + 1);
        self.attach();
        result
    }

    /// Subscribe to the store if not already subscribed.
    pub fn attach(&self) {
        if self.subscription.borrow().is_some() {
            return;
        }

        let deps = Rc::clone(&self.view.deps);
        let scheduler = SharedScheduler::clone(&self.scheduler);
        let consumer = self.consumer;
        let subscription = self.view.store.subscribe(move |_, change| {
            if deps.borrow().matches(change) {
                runtime::request(consumer, &scheduler);
            }
        });
        tracing::trace!(
            store = self.view.store.label(),
            %consumer,
            "binder attached"
        );
        *self.subscription.borrow_mut() = Some(subscription);
    }

    /// Release the store subscription for good.
    pub fn retire(self) {}

    pub fn is_attached(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    pub fn consumer(&self) -> ConsumerId {
        self.consumer
    }

    /// Number of completed evaluation passes.
    pub fn passes(&self) -> u64 {
        self.passes.get()
    }

    /// The fields this consumer depends on, sorted.
    pub fn dependencies(&self) -> Vec<FieldName> {
        self.view.deps.borrow().names()
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.view.deps.borrow().contains(name)
    }

    pub fn store(&self) -> &Store {
        &self.view.store
    }
}

impl Drop for Binder {
    fn drop(&mut self) {
        if self.subscription.get_mut().take().is_some() {
            tracing::trace!(consumer = %self.consumer, "binder retired");
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("consumer", &self.consumer)
            .field("attached", &self.is_attached())
            .field("passes", &self.passes.get())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TurnScheduler;
    use crate::store::Patch;

    const AGE: Field<u32> = Field::new("age");
    const OTHER: Field<u32> = Field::new("another_value");
    const NAME: Field<String> = Field::new("name");

    fn store() -> Store {
        Store::builder()
            .field(&AGE, 0)
            .field(&OTHER, 0)
            .field(&NAME, "alistair".to_string())
            .build()
    }

    fn bind(store: &Store) -> (Binder, Rc<TurnScheduler>) {
        let scheduler = Rc::new(TurnScheduler::new());
        let binder = store.bind_all(ConsumerId::new(), scheduler.clone());
        (binder, scheduler)
    }

    #[test]
    fn rerequests_only_for_fields_read() {
        let store = store();
        let (binder, scheduler) = bind(&store);
        binder.evaluate(|view| view.get(&AGE));

        store.set(&OTHER, 1);
        assert_eq!(scheduler.requests(), 0);

        store.set(&AGE, 1);
        assert_eq!(scheduler.requests(), 1);
        assert_eq!(scheduler.pending(), vec![binder.consumer()]);
        assert_eq!(store.get(&AGE), Some(1));
    }

    #[test]
    fn dependencies_persist_after_a_field_is_no_longer_read() {
        let store = store();
        let (binder, scheduler) = bind(&store);

        binder.evaluate(|view| view.get(&NAME));
        binder.evaluate(|view| view.get(&AGE));
        scheduler.take_pending();

        store.set(&NAME, "later".to_string());
        assert!(scheduler.is_pending(binder.consumer()));
        assert_eq!(binder.dependencies(), vec![FieldName::from("age"), "name".into()]);
    }

    #[test]
    fn view_reads_the_latest_value_every_pass() {
        let store = store();
        let (binder, _scheduler) = bind(&store);

        assert_eq!(binder.evaluate(|view| view.get(&AGE)), Some(0));
        store.set(&AGE, 5);
        assert_eq!(binder.evaluate(|view| view.get(&AGE)), Some(5));
        store.patch(Patch::new().with(&AGE, 9));
        assert_eq!(binder.evaluate(|view| view.get(&AGE)), Some(9));
        assert_eq!(binder.passes(), 3);
    }

    #[test]
    fn subscribes_once_across_passes() {
        let store = store();
        let (binder, _scheduler) = bind(&store);
        assert!(!binder.is_attached());
        assert_eq!(store.listener_count(), 0);

        for _ in 0..5 {
            binder.evaluate(|view| view.get(&AGE));
        }

        assert!(binder.is_attached());
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn consumer_reading_nothing_never_reruns_from_sets() {
        let store = store();
        let (binder, scheduler) = bind(&store);
        binder.evaluate(|_| ());

        store.set(&AGE, 1);
        store.set(&NAME, "x".to_string());

        assert!(binder.is_attached());
        assert!(binder.dependencies().is_empty());
        assert_eq!(scheduler.requests(), 0);
    }

    #[test]
    fn patch_reruns_every_attached_binder() {
        let store = store();
        let (reader, scheduler) = bind(&store);
        let idle = store.bind_all(ConsumerId::new(), scheduler.clone());
        reader.evaluate(|view| view.get(&AGE));
        idle.evaluate(|_| ());

        store.patch(Patch::new().with(&OTHER, 4));

        assert_eq!(scheduler.pending(), vec![reader.consumer(), idle.consumer()]);
    }

    #[test]
    fn writes_through_the_view_reach_the_store() {
        let store = store();
        let (binder, scheduler) = bind(&store);

        binder.evaluate(|view| {
            let age = view.get(&AGE).unwrap_or_default();
            view.set(&AGE, age + 1)
        });
        assert_eq!(store.get(&AGE), Some(1));
        // The write happened before the binder subscribed.
        assert_eq!(scheduler.requests(), 0);

        binder.evaluate(|view| view.update(&AGE, |age| age + 1));
        assert_eq!(store.get(&AGE), Some(2));
        assert_eq!(scheduler.requests(), 1);
    }

    #[test]
    fn retiring_releases_the_subscription() {
        let store = store();
        let (binder, scheduler) = bind(&store);
        binder.evaluate(|view| view.get(&AGE));
        assert_eq!(store.listener_count(), 1);

        binder.retire();
        store.set(&AGE, 3);

        assert_eq!(store.listener_count(), 0);
        assert_eq!(scheduler.requests(), 0);
    }

    #[test]
    fn batched_writes_collapse_into_one_request() {
        let store = store();
        let (binder, scheduler) = bind(&store);
        binder.evaluate(|view| (view.get(&AGE), view.get(&NAME)));

        let changed = store.batch_set(Patch::new().with(&AGE, 1).with(&NAME, "b".to_string()));

        assert_eq!(changed, 2);
        assert_eq!(scheduler.requests(), 1);
    }
}
