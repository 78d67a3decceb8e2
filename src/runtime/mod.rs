//! Scheduling support for store consumers.
//!
//! This module provides consumer identities, the [`Scheduler`] seam through
//! which binders ask for a consumer to be re-evaluated, and batching of
//! those requests.

mod batch;
mod scheduler;

pub use batch::{batch, is_batching};
pub(crate) use batch::request;
pub use scheduler::{ConsumerId, Scheduler, SharedScheduler, TurnScheduler};
