use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Upper bound on re-evaluation rounds within a single [`TurnScheduler::flush`].
const MAX_FLUSH_ROUNDS: usize = 64;

/// Identity of one consumer (for example a rendered component instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerId(usize);

impl ConsumerId {
    /// Allocate a new process-unique id.
    pub fn new() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// Receives requests to re-run a consumer.
///
/// A request is not a re-run: the scheduler decides when the consumer
/// actually evaluates again and is free to collapse repeated requests.
/// Any `Fn(ConsumerId)` closure is a scheduler.
pub trait Scheduler {
    fn request_reevaluation(&self, consumer: ConsumerId);
}

impl<F: Fn(ConsumerId)> Scheduler for F {
    fn request_reevaluation(&self, consumer: ConsumerId) {
        self(consumer)
    }
}

/// How binders hold their scheduler.
pub type SharedScheduler = Rc<dyn Scheduler>;

/// A scheduler that queues requests until the host runs its next turn.
///
/// Each consumer appears in the queue at most once, so any number of
/// requests between two flushes result in a single re-evaluation.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use trackstore::{ConsumerId, Field, Store, TurnScheduler};
///
/// const AGE: Field<u32> = Field::new("age");
///
/// let store = Store::builder().field(&AGE, 0).build();
/// let scheduler = Rc::new(TurnScheduler::new());
/// let consumer = ConsumerId::new();
/// let binder = store.bind_all(consumer, scheduler.clone());
///
/// binder.evaluate(|view| view.get(&AGE));
/// store.set(&AGE, 1);
/// store.set(&AGE, 2);
///
/// assert_eq!(scheduler.pending(), vec![consumer]);
/// let reruns = scheduler.flush(|id| assert_eq!(id, consumer));
/// assert_eq!(reruns, 1);
/// ```
#[derive(Default)]
pub struct TurnScheduler {
    queue: RefCell<VecDeque<ConsumerId>>,
    queued: RefCell<HashSet<ConsumerId>>,
    requests: Cell<u64>,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, consumer: ConsumerId) -> bool {
        self.queued.borrow().contains(&consumer)
    }

    /// Pending consumers in the order they were first requested.
    pub fn pending(&self) -> Vec<ConsumerId> {
        self.queue.borrow().iter().copied().collect()
    }

    /// Total requests received, including those collapsed into one re-run.
    pub fn requests(&self) -> u64 {
        self.requests.get()
    }

    /// Drain the queue without running anything.
    pub fn take_pending(&self) -> Vec<ConsumerId> {
        self.queued.borrow_mut().clear();
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Run `rerun` for every pending consumer.
    ///
    /// Re-runs may write to a store and request further re-evaluations;
    /// those are handled in later rounds of the same flush. Returns the
    /// number of re-runs performed.
    pub fn flush<F>(&self, mut rerun: F) -> usize
    where
        F: FnMut(ConsumerId),
    {
        let mut runs = 0;
        for round in 0..MAX_FLUSH_ROUNDS {
            let batch = self.take_pending();
            if batch.is_empty() {
                return runs;
            }
            tracing::trace!(round, consumers = batch.len(), "flushing re-evaluations");
            for consumer in batch {
                rerun(consumer);
                runs += 1;
            }
        }
        tracing::warn!(
            rounds = MAX_FLUSH_ROUNDS,
            remaining = self.queue.borrow().len(),
            "re-evaluation did not settle; leaving remaining requests queued"
        );
        runs
    }
}

impl Scheduler for TurnScheduler {
    fn request_reevaluation(&self, consumer: ConsumerId) {
        self.requests.set(self.requests.get() + 1);
        if self.queued.borrow_mut().insert(consumer) {
            self.queue.borrow_mut().push_back(consumer);
            tracing::trace!(%consumer, "re-evaluation queued");
        }
    }
}

impl fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("pending", &self.pending())
            .field("requests", &self.requests.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_ids_are_unique() {
        let a = ConsumerId::new();
        let b = ConsumerId::new();
        assert_ne!(a, b);
        assert!(b.as_usize() > a.as_usize());
    }

    #[test]
    fn requests_coalesce_within_a_turn() {
        let scheduler = TurnScheduler::new();
        let a = ConsumerId::new();
        let b = ConsumerId::new();

        scheduler.request_reevaluation(a);
        scheduler.request_reevaluation(b);
        scheduler.request_reevaluation(a);

        assert_eq!(scheduler.pending(), vec![a, b]);
        assert_eq!(scheduler.requests(), 3);

        let mut seen = Vec::new();
        assert_eq!(scheduler.flush(|id| seen.push(id)), 2);
        assert_eq!(seen, vec![a, b]);
        assert!(!scheduler.is_pending(a));
    }

    #[test]
    fn requests_made_while_flushing_run_in_the_same_flush() {
        let scheduler = Rc::new(TurnScheduler::new());
        let a = ConsumerId::new();
        let b = ConsumerId::new();
        scheduler.request_reevaluation(a);

        let inner = Rc::clone(&scheduler);
        let mut seen = Vec::new();
        scheduler.flush(|id| {
            seen.push(id);
            if id == a {
                inner.request_reevaluation(b);
            }
        });

        assert_eq!(seen, vec![a, b]);
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn flush_stops_on_endless_requests() {
        let scheduler = Rc::new(TurnScheduler::new());
        let a = ConsumerId::new();
        scheduler.request_reevaluation(a);

        let inner = Rc::clone(&scheduler);
        let runs = scheduler.flush(|id| inner.request_reevaluation(id));

        assert_eq!(runs, MAX_FLUSH_ROUNDS);
        assert!(scheduler.is_pending(a));
    }

    #[test]
    fn closures_are_schedulers() {
        let hits = Cell::new(0);
        let scheduler = |_: ConsumerId| hits.set(hits.get() + 1);
        scheduler.request_reevaluation(ConsumerId::new());
        assert_eq!(hits.get(), 1);
    }
}
