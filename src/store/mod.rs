//! The state container.
//!
//! A [`Store`] owns one [`Record`] of typed fields, applies single-field
//! writes and batched patches, and notifies its listeners of every change.

mod error;
mod field;
mod patch;
mod record;
mod store;
mod subscription;

pub use error::{StoreError, StoreResult};
pub use field::{Field, FieldName, FieldValue};
pub use patch::Patch;
pub use record::{Record, RecordBuilder};
pub use store::{Change, Store, StoreBuilder};
pub use subscription::{ListenerId, Subscription};
