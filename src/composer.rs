//! Slice composer: assembling slice initializers into one composite state.
//!
//! [`Slices`] collects a keyed mapping of slice initializers.
//! [`Slices::into_init`] turns the mapping into a [`StateInit`] — a plain
//! transition-source function `FnOnce(&EngineApi) -> CompositeState` that
//! binds every slice to the handle it is given and returns the composite
//! initial state. Because a `StateInit` is just a function value,
//! middleware stacking is ordinary higher-order function composition:
//! wrap the init, hand the inner init a modified handle, and the whole
//! stack remains a valid input to [`Store::with_init`](crate::Store).
//!
//! Two composition entry points share this one runtime path: the inferred
//! mode takes each slice's shape from its initializer's return value, and
//! the checked mode validates the composite against a pre-declared
//! [`CompositeShape`] before the engine is constructed.

use crate::binder::{bind, EngineApi, GlobalReader, ScopedMutator};
use crate::error::{Error, Result};
use crate::state::{CompositeState, Record};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A slice initializer: invoked exactly once per key, at composition,
/// with the slice's own capability pair. Returns the slice's initial
/// record, which also fixes the slice's inferred shape.
pub type SliceInit = Box<dyn FnOnce(ScopedMutator, GlobalReader) -> Record>;

/// A transition-source function: given an engine handle, produce the
/// initial composite state. This is the form middleware layers wrap.
pub type StateInit = Box<dyn FnOnce(&EngineApi) -> CompositeState>;

/// An ordered mapping of slice key to slice initializer.
///
/// Keys are fixed and finite at composition time; slices cannot be added
/// to a live store.
///
/// # Example
///
/// ```ignore
/// let slices = Slices::new()
///     .slice("counter", |cut, _read| {
///         Record::new().field("count", 0)
///     })
///     .slice("todo", |cut, _read| {
///         Record::new().field("items", Vec::<Value>::new())
///     });
/// let store: Store = Store::compose(slices)?;
/// ```
#[derive(Default)]
pub struct Slices {
    entries: Vec<(String, SliceInit)>,
}

impl Slices {
    /// Start an empty mapping.
    pub fn new() -> Self {
        Slices {
            entries: Vec::new(),
        }
    }

    /// Register a slice under `key`.
    ///
    /// Insertion order is the initializer invocation order. Duplicate
    /// keys are rejected when the mapping is consumed.
    pub fn slice(
        mut self,
        key: impl Into<String>,
        init: impl FnOnce(ScopedMutator, GlobalReader) -> Record + 'static,
    ) -> Self {
        self.entries.push((key.into(), Box::new(init)));
        self
    }

    /// Number of registered slices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no slices are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert the mapping into a wrappable [`StateInit`].
    ///
    /// The returned function binds each key to the handle it receives,
    /// invokes each initializer exactly once (sequentially, in insertion
    /// order), and accumulates the returned records into the composite
    /// initial state. Cross-slice reads during initialization are a
    /// construction-order violation and panic.
    pub fn into_init(self) -> Result<StateInit> {
        let mut seen = BTreeSet::new();
        for (key, _) in &self.entries {
            if !seen.insert(key.clone()) {
                return Err(Error::DuplicateSlice(key.clone()));
            }
        }

        let entries = self.entries;
        Ok(Box::new(move |api: &EngineApi| {
            let mut state = CompositeState::new();
            for (key, init) in entries {
                let (mutator, reader) = bind(key.as_str(), api);
                let record = init(mutator, reader);
                debug!(slice = %key, fields = record.len(), "initialized slice");
                state.insert(key, record);
            }
            state
        }))
    }
}

// ============================================================================
// Declared shapes (checked composition)
// ============================================================================

/// The declared field set of one slice (data and action fields alike).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceShape(BTreeSet<String>);

impl SliceShape {
    /// Start an empty shape.
    pub fn new() -> Self {
        SliceShape(BTreeSet::new())
    }

    /// Builder-style: declare a field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into());
        self
    }

    /// Declared field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SliceShape {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        SliceShape(iter.into_iter().map(Into::into).collect())
    }
}

/// A pre-declared composite shape: the exact key set and per-slice field
/// sets a checked composition must produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeShape(BTreeMap<String, SliceShape>);

impl CompositeShape {
    /// Start an empty shape.
    pub fn new() -> Self {
        CompositeShape(BTreeMap::new())
    }

    /// Builder-style: declare a slice and its field set.
    pub fn slice(mut self, key: impl Into<String>, shape: SliceShape) -> Self {
        self.0.insert(key.into(), shape);
        self
    }

    /// Validate a composite state against this shape.
    ///
    /// Every declared slice must be present with exactly the declared
    /// field set, and no undeclared slice may appear. Runs once, ahead of
    /// engine construction; after that, values arriving through untyped
    /// boundaries are trusted as-is.
    pub fn check(&self, state: &CompositeState) -> Result<()> {
        for (key, shape) in &self.0 {
            let record = state
                .slice(key)
                .ok_or_else(|| Error::MissingSlice(key.clone()))?;

            for field in record.field_names() {
                if !shape.0.contains(field) {
                    return Err(Error::ShapeMismatch {
                        slice: key.clone(),
                        detail: format!("unexpected field `{field}`"),
                    });
                }
            }
            for field in &shape.0 {
                if record.get(field).is_none() {
                    return Err(Error::ShapeMismatch {
                        slice: key.clone(),
                        detail: format!("missing field `{field}`"),
                    });
                }
            }
        }

        for key in state.keys() {
            if !self.0.contains_key(key) {
                return Err(Error::ShapeMismatch {
                    slice: key.to_string(),
                    detail: "undeclared slice".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn two_slice_state() -> CompositeState {
        [
            (
                "counter".to_string(),
                Record::new().field("count", 0).field("step", 1),
            ),
            ("todo".to_string(), Record::new().field("items", Vec::<Value>::new())),
        ]
        .into_iter()
        .collect()
    }

    fn two_slice_shape() -> CompositeShape {
        CompositeShape::new()
            .slice("counter", SliceShape::new().field("count").field("step"))
            .slice("todo", SliceShape::new().field("items"))
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let slices = Slices::new()
            .slice("a", |_, _| Record::new())
            .slice("a", |_, _| Record::new());
        match slices.into_init() {
            Err(Error::DuplicateSlice(key)) => assert_eq!(key, "a"),
            other => panic!("expected DuplicateSlice, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn matching_shape_passes() {
        assert!(two_slice_shape().check(&two_slice_state()).is_ok());
    }

    #[test]
    fn extra_field_is_shape_drift() {
        let mut state = two_slice_state();
        state.insert(
            "todo",
            Record::new().field("items", Vec::<Value>::new()).field("done", 0),
        );
        match two_slice_shape().check(&state) {
            Err(Error::ShapeMismatch { slice, detail }) => {
                assert_eq!(slice, "todo");
                assert!(detail.contains("done"));
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_shape_drift() {
        let mut state = two_slice_state();
        state.insert("counter", Record::new().field("count", 0));
        assert!(matches!(
            two_slice_shape().check(&state),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn missing_slice_is_reported() {
        let state: CompositeState = [(
            "counter".to_string(),
            Record::new().field("count", 0).field("step", 1),
        )]
        .into_iter()
        .collect();
        assert!(matches!(
            two_slice_shape().check(&state),
            Err(Error::MissingSlice(_))
        ));
    }

    #[test]
    fn undeclared_slice_is_rejected() {
        let mut state = two_slice_state();
        state.insert("ghost", Record::new());
        assert!(matches!(
            two_slice_shape().check(&state),
            Err(Error::ShapeMismatch { slice, .. }) if slice == "ghost"
        ));
    }
}
