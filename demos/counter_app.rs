//! Parent and child components sharing one store, each re-rendering only
//! when a field it reads changes.
//!
//! Run with `RUST_LOG=trackstore=debug` to see the store's own tracing.

use std::cell::Cell;
use std::rc::Rc;

use trackstore::{Binder, ConsumerId, Field, Patch, SetAction, Store, TurnScheduler};

const AGE: Field<u32> = Field::new("age");
const ANOTHER_VALUE: Field<u32> = Field::new("another_value");
const NAME: Field<String> = Field::new("name");

/// A stand-in for a rendered component: a binder plus a render counter.
struct Component {
    label: &'static str,
    binder: Binder,
    renders: Cell<u32>,
    body: fn(&Component),
}

impl Component {
    fn new(
        label: &'static str,
        store: &Store,
        scheduler: &Rc<TurnScheduler>,
        body: fn(&Component),
    ) -> Self {
        Self {
            label,
            binder: store.bind_all(ConsumerId::new(), scheduler.clone()),
            renders: Cell::new(0),
            body,
        }
    }

    fn render(&self) {
        self.renders.set(self.renders.get() + 1);
        (self.body)(self);
    }
}

fn render_app(component: &Component) {
    let (age, another_value) = component
        .binder
        .evaluate(|view| (view.get(&AGE), view.get(&ANOTHER_VALUE)));
    println!(
        "   [{}] renders: {}, age: {:?}, another_value: {:?}",
        component.label,
        component.renders.get(),
        age.unwrap_or_default(),
        another_value.unwrap_or_default()
    );
}

fn render_child(component: &Component) {
    let name = component.binder.evaluate(|view| view.get(&NAME));
    println!(
        "   [{}] renders: {}, name: {:?}",
        component.label,
        component.renders.get(),
        name.unwrap_or_default()
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Counter Application ===\n");

    println!("1. Creating the store");
    let store = Store::builder()
        .label("counter")
        .field(&AGE, 0)
        .field(&ANOTHER_VALUE, 0)
        .field(&NAME, "alistair".to_string())
        .build();
    let _log = store.trace_changes();

    let scheduler = Rc::new(TurnScheduler::new());
    let app = Component::new("App", &store, &scheduler, render_app);
    let child = Component::new("OptimizedChild", &store, &scheduler, render_child);
    let components = [&app, &child];

    let set_age = store.bind_setter(&AGE);
    let set_another_value = store.bind_setter(&ANOTHER_VALUE);
    let set_name = store.bind_setter(&NAME);

    let run_turn = || {
        let reruns = scheduler.flush(|id| {
            if let Some(component) = components.iter().find(|c| c.binder.consumer() == id) {
                component.render();
            }
        });
        if reruns == 0 {
            println!("   (nothing to re-render)");
        }
    };

    println!("\n2. Initial render");
    for component in components {
        component.render();
    }

    println!("\n3. age++ (only App re-renders)");
    set_age.dispatch(SetAction::update(|age: &u32| age + 1));
    run_turn();

    println!("\n4. another_value++ twice in one turn (App re-renders once)");
    set_another_value.update(|value| value + 1);
    set_another_value.update(|value| value + 1);
    run_turn();

    println!("\n5. change name (only OptimizedChild re-renders)");
    set_name.set("someone".to_string());
    run_turn();

    println!("\n6. setting the same name again (no notification at all)");
    set_name.set("someone".to_string());
    run_turn();

    println!("\n7. patching every field (everyone re-renders)");
    store.patch(
        Patch::new()
            .with(&AGE, 0)
            .with(&ANOTHER_VALUE, 0)
            .with(&NAME, "alistair".to_string()),
    );
    run_turn();

    println!(
        "\n8. Totals: App rendered {} times, OptimizedChild rendered {} times",
        app.renders.get(),
        child.renders.get()
    );

    println!("\n✓ Counter application complete!");
}
