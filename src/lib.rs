//! # Trackstore
//!
//! A reactive state store with field-level change tracking for Rust.
//!
//! A [`Store`] holds one record of typed, named fields. Consumers (for
//! example the components of a rendering front-end) read it through
//! binders, and are asked to re-evaluate only when a field they actually
//! read changes.
//!
//! ## Store
//!
//! - [`Store::get`] / [`Store::set`] read and write single fields; writing
//!   an identical value is a no-op
//! - [`Store::patch`] replaces several fields at once and notifies with the
//!   [`Change::All`] wildcard
//! - [`Store::subscribe`] registers raw listeners
//!
//! ## Binders
//!
//! - [`Binder`] records the fields a consumer reads during each evaluation
//!   pass and filters notifications against them
//! - [`FieldBinder`] follows one field
//! - [`Setter`] writes one field
//!
//! Binders never re-run a consumer themselves. They hand a request to a
//! [`Scheduler`], such as the coalescing [`TurnScheduler`], and requests
//! made inside [`batch`] are collapsed until the batch ends.
//!
//! ```
//! use std::rc::Rc;
//! use trackstore::{ConsumerId, Field, Store, TurnScheduler};
//!
//! const AGE: Field<u32> = Field::new("age");
//!
//! let store = Store::builder().field(&AGE, 0).build();
//! let scheduler = Rc::new(TurnScheduler::new());
//! let consumer = ConsumerId::new();
//! let binder = store.bind_all(consumer, scheduler.clone());
//!
//! binder.evaluate(|view| view.get(&AGE));
//! store.set(&AGE, 1);
//!
//! assert_eq!(scheduler.take_pending(), vec![consumer]);
//! ```

pub mod binder;
pub mod runtime;
pub mod store;

pub use binder::{Binder, DependencySet, FieldBinder, SetAction, Setter, View};
pub use runtime::{batch, is_batching, ConsumerId, Scheduler, SharedScheduler, TurnScheduler};
pub use store::{
    Change, Field, FieldName, FieldValue, ListenerId, Patch, Record, RecordBuilder, Store,
    StoreBuilder, StoreError, StoreResult, Subscription,
};
