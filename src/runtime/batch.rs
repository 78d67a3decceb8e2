use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use super::{ConsumerId, SharedScheduler};

/// Re-evaluation requests held back until the outermost batch ends, one per
/// consumer and scheduler pair.
#[derive(Default)]
struct BatchState {
    depth: usize,
    deferred: Vec<(ConsumerId, SharedScheduler)>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// Run `f` as one batched update.
///
/// Re-evaluation requests raised while `f` runs are collected, collapsed to
/// one per consumer and scheduler, and handed to their schedulers after the outermost
/// `batch` returns. Store writes still commit and notify listeners
/// immediately. Batches nest.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use trackstore::{batch, ConsumerId, Field, Store};
///
/// const X: Field<i32> = Field::new("x");
/// const Y: Field<i32> = Field::new("y");
///
/// let store = Store::builder().field(&X, 0).field(&Y, 0).build();
/// let reruns = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&reruns);
/// let binder = store.bind_all(ConsumerId::new(), Rc::new(move |_: ConsumerId| {
///     counter.set(counter.get() + 1)
/// }));
/// binder.evaluate(|view| (view.get(&X), view.get(&Y)));
///
/// batch(|| {
///     store.set(&X, 1);
///     store.set(&Y, 1);
///     assert_eq!(reruns.get(), 0);
/// });
/// assert_eq!(reruns.get(), 1);
/// ```
pub fn batch<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    BATCH.with(|state| state.borrow_mut().depth += 1);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    let deferred = BATCH.with(|state| {
        let mut state = state.borrow_mut();
        state.depth -= 1;
        if state.depth == 0 {
            mem::take(&mut state.deferred)
        } else {
            Vec::new()
        }
    });

    match result {
        Ok(r) => {
            if !deferred.is_empty() {
                tracing::debug!(consumers = deferred.len(), "batch complete");
            }
            for (consumer, scheduler) in deferred {
                scheduler.request_reevaluation(consumer);
            }
            r
        }
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// Whether the current thread is inside [`batch`].
pub fn is_batching() -> bool {
    BATCH.with(|state| state.borrow().depth > 0)
}

/// Forward a re-evaluation request, deferring it while a batch is open.
pub(crate) fn request(consumer: ConsumerId, scheduler: &SharedScheduler) {
    let deferred = BATCH.with(|state| {
        let mut state = state.borrow_mut();
        if state.depth == 0 {
            return false;
        }
        let queued = state.deferred.iter().any(|(id, target)| {
            *id == consumer && Rc::ptr_eq(target, scheduler)
        });
        if !queued {
            state.deferred.push((consumer, SharedScheduler::clone(scheduler)));
        }
        true
    });

    if !deferred {
        scheduler.request_reevaluation(consumer);
    }
}
