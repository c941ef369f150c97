//! Convenient imports for substore.
//!
//! This module re-exports the most commonly used types so you can get
//! started with a single import:
//!
//! ```ignore
//! use substore::prelude::*;
//!
//! let store: Store = Store::compose(
//!     Slices::new().slice("counter", |_cut, _read| Record::new().field("count", 0)),
//! )?;
//! ```

// Main entry points
pub use crate::composer::{CompositeShape, SliceShape, Slices};
pub use crate::store::{Store, Subscription};

// Error handling
pub use crate::error::{Error, Result};

// Capabilities handed to slice initializers
pub use crate::binder::{bind, EngineApi, GlobalReader, ScopedMutator};

// State model
pub use crate::state::{CompositeState, Record, StateDelta};
pub use crate::value::{SliceAction, Value};

// Engine contract
pub use crate::engine::{CellEngine, ReactiveEngine, Transition};

// Re-export serde_json for convenience
pub use serde_json::json;
