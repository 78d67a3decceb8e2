//! Integration tests for Trackstore

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trackstore::{
    batch, Change, ConsumerId, Field, Patch, SetAction, Store, Subscription, TurnScheduler,
};

const AGE: Field<u32> = Field::new("age");
const ANOTHER: Field<u32> = Field::new("another_value");
const NAME: Field<String> = Field::new("name");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn demo_store() -> Store {
    Store::builder()
        .label("demo")
        .field(&AGE, 0)
        .field(&ANOTHER, 0)
        .field(&NAME, "alistair".to_string())
        .build()
}

#[test]
fn store_integration() {
    init_tracing();
    let store = demo_store();
    let _log = store.trace_changes();

    // Test read
    assert_eq!(store.get(&AGE), Some(0));
    assert_eq!(store.snapshot().len(), 3);

    // Test write
    assert!(store.set(&AGE, 42));
    assert_eq!(store.get(&AGE), Some(42));

    // Test update
    assert!(store.update(&AGE, |age| age + 10));
    assert_eq!(store.get(&AGE), Some(52));

    // Test patch
    store.patch(Patch::new().with(&AGE, 1).with(&NAME, "new".to_string()));
    assert_eq!(store.get(&AGE), Some(1));
    assert_eq!(store.get(&NAME).as_deref(), Some("new"));
}

#[test]
fn store_subscription() {
    let store = demo_store();
    let counter = Rc::new(Cell::new(0));
    let counter_clone = Rc::clone(&counter);

    let subscription = store.subscribe(move |_, _| {
        counter_clone.set(counter_clone.get() + 1);
    });

    assert_eq!(counter.get(), 0);

    store.update(&AGE, |n| n + 1);
    assert_eq!(counter.get(), 1);

    store.update(&AGE, |n| n + 1);
    assert_eq!(counter.get(), 2);

    subscription.unsubscribe();
    store.update(&AGE, |n| n + 1);
    assert_eq!(counter.get(), 2);
}

#[test]
fn distinct_sets_notify_every_listener_each_time() {
    let store = demo_store();
    let logs: Vec<Rc<RefCell<Vec<(Change, Option<u32>)>>>> =
        (0..3).map(|_| Rc::default()).collect();
    let _subs: Vec<Subscription> = logs
        .iter()
        .map(|log| {
            let log = Rc::clone(log);
            store.subscribe(move |record, change| {
                log.borrow_mut().push((change.clone(), record.get(&AGE)));
            })
        })
        .collect();

    store.set(&AGE, 1);
    store.set(&AGE, 2);

    let age = Change::Field("age".into());
    for log in &logs {
        assert_eq!(
            *log.borrow(),
            vec![(age.clone(), Some(1)), (age.clone(), Some(2))]
        );
    }
}

#[test]
fn binder_reruns_once_for_the_age_field() {
    let store = Store::builder().field(&AGE, 0).build();
    let scheduler = Rc::new(TurnScheduler::new());
    let consumer = ConsumerId::new();
    let binder = store.bind_all(consumer, scheduler.clone());

    binder.evaluate(|view| view.get(&AGE));
    store.set(&AGE, 1);

    assert_eq!(scheduler.requests(), 1);
    assert_eq!(scheduler.take_pending(), vec![consumer]);
    assert_eq!(store.get(&AGE), Some(1));
}

#[test]
fn field_binders_both_fire_on_patch() {
    const X: Field<i32> = Field::new("x");
    const Y: Field<i32> = Field::new("y");

    let store = Store::builder().field(&X, 0).field(&Y, 0).build();
    let scheduler = Rc::new(TurnScheduler::new());
    let x = store.bind_field(&X, ConsumerId::new(), scheduler.clone());
    let y = store.bind_field(&Y, ConsumerId::new(), scheduler.clone());

    store.patch(Patch::new().with(&X, 1).with(&Y, 1));

    assert_eq!(scheduler.requests(), 2);
    assert_eq!(scheduler.pending(), vec![x.consumer(), y.consumer()]);
}

/// Mirrors a parent component reading `age` and `another_value` with a
/// memoized child reading only `name`.
#[test]
fn parent_and_child_rerender_independently() {
    init_tracing();
    let store = demo_store();
    let scheduler = Rc::new(TurnScheduler::new());

    let parent = store.bind_all(ConsumerId::new(), scheduler.clone());
    let child = store.bind_all(ConsumerId::new(), scheduler.clone());
    let set_age = store.bind_setter(&AGE);
    let set_name = store.bind_setter(&NAME);

    let parent_renders = Cell::new(0);
    let child_renders = Cell::new(0);
    let render_parent = || {
        parent.evaluate(|view| (view.get(&AGE), view.get(&ANOTHER)));
        parent_renders.set(parent_renders.get() + 1);
    };
    let render_child = || {
        child.evaluate(|view| view.get(&NAME));
        child_renders.set(child_renders.get() + 1);
    };
    let run_turn = || {
        scheduler.flush(|id| {
            if id == parent.consumer() {
                render_parent();
            } else if id == child.consumer() {
                render_child();
            }
        })
    };

    render_parent();
    render_child();

    set_age.dispatch(SetAction::update(|age: &u32| age + 1));
    assert_eq!(run_turn(), 1);
    assert_eq!((parent_renders.get(), child_renders.get()), (2, 1));

    set_name.set("someone".to_string());
    assert_eq!(run_turn(), 1);
    assert_eq!((parent_renders.get(), child_renders.get()), (2, 2));

    // Several writes before the next turn collapse into one re-render.
    set_age.update(|age| age + 1);
    set_age.update(|age| age + 1);
    store.set(&ANOTHER, 5);
    assert_eq!(run_turn(), 1);
    assert_eq!((parent_renders.get(), child_renders.get()), (3, 2));
    assert_eq!(store.get(&AGE), Some(3));
}

#[test]
fn batch_defers_direct_reevaluation() {
    let store = demo_store();
    let reruns = Rc::new(Cell::new(0));
    let counter = Rc::clone(&reruns);
    let binder = store.bind_all(
        ConsumerId::new(),
        Rc::new(move |_: ConsumerId| counter.set(counter.get() + 1)),
    );
    binder.evaluate(|view| (view.get(&AGE), view.get(&NAME)));

    batch(|| {
        store.set(&AGE, 1);
        store.set(&NAME, "b".to_string());
        assert_eq!(reruns.get(), 0);
    });
    assert_eq!(reruns.get(), 1);

    store.batch_set(Patch::new().with(&AGE, 2).with(&NAME, "c".to_string()));
    assert_eq!(reruns.get(), 2);
}

#[test]
fn retired_binders_leave_no_listeners_behind() {
    let store = demo_store();
    let scheduler = Rc::new(TurnScheduler::new());

    let binders: Vec<_> = (0..10)
        .map(|_| {
            let binder = store.bind_all(ConsumerId::new(), scheduler.clone());
            binder.evaluate(|view| view.get(&AGE));
            binder
        })
        .collect();
    let field = store.bind_field(&NAME, ConsumerId::new(), scheduler.clone());
    assert_eq!(store.listener_count(), 11);

    for binder in binders {
        binder.retire();
    }
    field.retire();

    assert_eq!(store.listener_count(), 0);
    store.set(&AGE, 9);
    assert_eq!(scheduler.requests(), 0);
}

#[test]
fn binder_retired_from_inside_a_listener() {
    let store = demo_store();
    let scheduler = Rc::new(TurnScheduler::new());
    let binder = Rc::new(RefCell::new(Some(
        store.bind_all(ConsumerId::new(), scheduler.clone()),
    )));
    if let Some(binder) = binder.borrow().as_ref() {
        binder.evaluate(|view| view.get(&AGE));
    }

    let slot = Rc::clone(&binder);
    let _retire = store.subscribe(move |_, _| {
        slot.borrow_mut().take();
    });

    // The binder's listener runs first, then the retiring listener drops it.
    store.set(&AGE, 1);
    assert_eq!(scheduler.requests(), 1);
    assert_eq!(store.listener_count(), 1);

    store.set(&AGE, 2);
    assert_eq!(scheduler.requests(), 1);
}
