//! # substore
//!
//! Composable sliced state container.
//!
//! substore assembles multiple independently authored "slice" state
//! definitions into one reactively observable composite store. Each slice
//! gets the illusion of a private sub-store: its mutations are confined to
//! its own namespace while its reads see the full composite state, and
//! that scoping survives being wrapped by arbitrary state-transforming
//! middleware, because every capability resolves through a late-bound
//! engine handle instead of closing over state.
//!
//! ## Quick start
//!
//! ```ignore
//! use substore::prelude::*;
//!
//! let store: Store = Store::compose(
//!     Slices::new()
//!         .slice("counter", |cut, _read| {
//!             let inc = {
//!                 let cut = cut.clone();
//!                 SliceAction::new(move |_| {
//!                     cut.update(|rec| {
//!                         let n = rec.get("count").and_then(Value::as_int).unwrap_or(0);
//!                         Some(Record::new().field("count", n + 1))
//!                     });
//!                     Ok(Value::Null)
//!                 })
//!             };
//!             Record::new().field("count", 0).action("inc", inc)
//!         })
//!         .slice("todo", |_cut, _read| {
//!             Record::new().field("items", Vec::<Value>::new())
//!         }),
//! )?;
//!
//! store.select(|s| s.slice("counter").unwrap().invoke("inc", &[]))?;
//! assert_eq!(
//!     store.get_state().slice("counter").unwrap().get("count"),
//!     Some(&Value::Int(1)),
//! );
//! ```
//!
//! ## Composition protocol
//!
//! - [`bind`] produces a slice's capability pair: a [`ScopedMutator`]
//!   (writes confined to one key's slot) and a [`GlobalReader`] (full
//!   composite reads, never cached).
//! - [`Slices`] collects slice initializers; [`Store::compose`] invokes
//!   each exactly once, seeds the engine with the collected records, and
//!   resolves the handle binders were created against.
//! - [`Slices::into_init`] exposes the composition as a plain
//!   transition-source function, so labeling, structural-mutation, and
//!   persistence layers stack by ordinary function composition.
//!
//! ## Execution model
//!
//! Single-threaded, cooperative, synchronous and reentrant. No state is
//! ever cached across calls: a scoped update always merges into the
//! latest committed state at the moment its transition applies.

#![warn(missing_docs)]

mod binder;
mod composer;
mod engine;
mod error;
mod state;
mod store;
mod value;

pub mod prelude;

// Composition protocol
pub use binder::{bind, EngineApi, GlobalReader, ScopedMutator};
pub use composer::{CompositeShape, SliceInit, SliceShape, Slices, StateInit};

// Store handle and engine contract
pub use engine::{CellEngine, Listener, ReactiveEngine, SubscriberId, Transition};
pub use store::{Store, Subscription};

// State model
pub use state::{CompositeState, Record, StateDelta};
pub use value::{SliceAction, Value};

// Error handling
pub use error::{Error, Result};
