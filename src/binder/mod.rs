//! Per-consumer adapters over a [`Store`](crate::Store).
//!
//! - [`Binder`]: tracks which fields a consumer reads and re-evaluates it
//!   only when one of them changes
//! - [`FieldBinder`]: follows a single field with a locally cached copy
//! - [`Setter`]: writes one field without reading or subscribing

mod binder;
mod dependency;
mod field;
mod setter;

pub use binder::{Binder, View};
pub use dependency::DependencySet;
pub use field::FieldBinder;
pub use setter::{SetAction, Setter};
