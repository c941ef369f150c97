//! Namespace binder: per-slice capabilities over a late-bound handle.
//!
//! [`bind`] takes a slice key and an [`EngineApi`] handle and produces the
//! pair every slice initializer receives: a [`ScopedMutator`] whose writes
//! are confined to that key's slot, and a [`GlobalReader`] that returns
//! the full composite state.
//!
//! Both capabilities resolve through the handle on every call rather than
//! closing over state. A wrapping layer may defer, batch, or relabel the
//! underlying transition calls without breaking the guarantee that a
//! scoped update always merges into the latest committed state.

use crate::engine::Transition;
use crate::state::{CompositeState, Record, StateDelta};
use std::rc::Rc;
use tracing::trace;

/// Panic message for construction-order violations.
pub(crate) const UNRESOLVED: &str =
    "engine handle used before store construction completed (a slice initializer \
     invoked a scoped mutator or global reader during composition)";

/// The late-bound engine handle: a cheap-clone pair of transition and
/// read functions.
///
/// During composition the handle points at a not-yet-constructed engine;
/// the composer resolves it exactly once, after the engine is seeded with
/// the initial composite state. Middleware layers wrap a handle by
/// supplying their own functions (see [`EngineApi::with_set`]) and passing
/// the wrapped handle down to inner layers.
///
/// # Panics
///
/// Calling [`set`](EngineApi::set) or [`get`](EngineApi::get) before the
/// composer resolves the underlying engine is a construction-order
/// violation and panics.
#[derive(Clone)]
pub struct EngineApi {
    set: Rc<dyn Fn(Transition)>,
    get: Rc<dyn Fn() -> CompositeState>,
}

impl EngineApi {
    /// Build a handle from raw transition and read functions.
    pub fn new(set: Rc<dyn Fn(Transition)>, get: Rc<dyn Fn() -> CompositeState>) -> Self {
        EngineApi { set, get }
    }

    /// Apply a transition through the handle.
    pub fn set(&self, transition: Transition) {
        (self.set)(transition);
    }

    /// Read the current composite state through the handle. Never cached.
    pub fn get(&self) -> CompositeState {
        (self.get)()
    }

    /// Derive a handle whose transitions pass through `wrap` before
    /// reaching this handle. Reads are shared unchanged.
    ///
    /// This is the decorator seam for change-labeling and structural
    /// mutation layers: `wrap` may rewrite or annotate the transition but
    /// still commits through the original handle.
    pub fn with_set(&self, wrap: impl Fn(Transition) -> Transition + 'static) -> EngineApi {
        let inner = Rc::clone(&self.set);
        EngineApi {
            set: Rc::new(move |t| inner(wrap(t))),
            get: Rc::clone(&self.get),
        }
    }
}

/// Produce the capability pair for one slice key.
///
/// No state is captured: both capabilities re-resolve through `api` at
/// every call.
pub fn bind(key: impl Into<String>, api: &EngineApi) -> (ScopedMutator, GlobalReader) {
    let key: Rc<str> = Rc::from(key.into());
    (
        ScopedMutator {
            key,
            api: api.clone(),
        },
        GlobalReader { api: api.clone() },
    )
}

/// How a scoped update describes the next record.
enum SliceUpdate {
    /// A partial record to shallow-merge into the current record.
    Patch(Record),
    /// An updater from the current record to a partial record;
    /// `None` is the no-op sentinel.
    With(Box<dyn FnOnce(&Record) -> Option<Record>>),
}

/// A mutation capability bound to exactly one slice key.
///
/// Every call commits exactly one transition whose delta replaces only
/// this key's slot; all other slots carry over unchanged. The current
/// record is read fresh inside the transition, never from closure
/// capture, so updates merge into the latest committed state even when
/// the underlying handle defers or reorders commits.
///
/// # Panics
///
/// Panics if called before the store finishes constructing, or if the
/// bound key's slot is missing from the composite state (both are
/// programming errors, not recoverable conditions).
#[derive(Clone)]
pub struct ScopedMutator {
    key: Rc<str>,
    api: EngineApi,
}

impl ScopedMutator {
    /// The slice key this mutator is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Shallow-merge a partial record into this slice's record.
    ///
    /// Fields not named in `patch` are retained; named fields are
    /// replaced; new fields are added. An empty patch commits an identity
    /// transition (subscribers are still notified; suppressing no-change
    /// notifications is the engine's concern).
    pub fn patch(&self, patch: Record) {
        self.commit(SliceUpdate::Patch(patch));
    }

    /// Compute a partial record from the current record, then merge it.
    ///
    /// `f` is invoked synchronously with this key's record as of the
    /// moment the transition applies. Returning `None` is the no-op
    /// sentinel used by layers that perform in-place structural edits:
    /// the transition still commits, carrying the record through
    /// unchanged. Returning an empty record behaves identically.
    pub fn update(&self, f: impl FnOnce(&Record) -> Option<Record> + 'static) {
        self.commit(SliceUpdate::With(Box::new(f)));
    }

    fn commit(&self, update: SliceUpdate) {
        let key = Rc::clone(&self.key);
        trace!(slice = %key, "scoped update");
        self.api.set(Box::new(move |state: &CompositeState| {
            let current = state
                .slice(&key)
                .unwrap_or_else(|| panic!("slice `{key}` missing from composite state"));
            let next = match update {
                SliceUpdate::Patch(patch) => current.merged(patch),
                SliceUpdate::With(f) => match f(current) {
                    Some(patch) => current.merged(patch),
                    None => current.clone(),
                },
            };
            StateDelta::single(key.as_ref(), next)
        }));
    }
}

/// A read capability exposing the entire composite state.
///
/// Each call re-reads the engine, so slice logic invoked later in a call
/// chain always observes writes committed earlier in that same chain,
/// whether by its own slice or by others.
#[derive(Clone)]
pub struct GlobalReader {
    api: EngineApi,
}

impl GlobalReader {
    /// The current composite state, fresh from the engine.
    pub fn read(&self) -> CompositeState {
        self.api.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CellEngine, ReactiveEngine};
    use crate::value::Value;
    use std::cell::RefCell;

    fn live_api() -> (Rc<CellEngine>, EngineApi) {
        let mut initial = CompositeState::new();
        initial.insert("a", Record::new().field("x", 1).field("keep", true));
        initial.insert("b", Record::new().field("y", 2));
        let engine = Rc::new(CellEngine::construct(initial));

        let set_engine = Rc::clone(&engine);
        let get_engine = Rc::clone(&engine);
        let api = EngineApi::new(
            Rc::new(move |t| set_engine.set_state(t)),
            Rc::new(move || get_engine.get_state()),
        );
        (engine, api)
    }

    #[test]
    fn patch_touches_only_bound_key() {
        let (engine, api) = live_api();
        let (cut, _) = bind("a", &api);

        let before_b = engine.get_state().slice("b").cloned();
        cut.patch(Record::new().field("x", 10));

        let state = engine.get_state();
        assert_eq!(
            state.slice("a").and_then(|r| r.get("x")),
            Some(&Value::Int(10))
        );
        assert_eq!(
            state.slice("a").and_then(|r| r.get("keep")),
            Some(&Value::Bool(true))
        );
        assert_eq!(state.slice("b").cloned(), before_b);
    }

    #[test]
    fn update_sees_current_record_at_apply_time() {
        let (engine, api) = live_api();
        let (cut, _) = bind("a", &api);

        cut.patch(Record::new().field("x", 41));
        cut.update(|rec| {
            let x = rec.get("x").and_then(Value::as_int).unwrap_or(0);
            Some(Record::new().field("x", x + 1))
        });

        assert_eq!(
            engine.get_state().slice("a").and_then(|r| r.get("x")),
            Some(&Value::Int(42))
        );
    }

    #[test]
    fn noop_sentinel_commits_identity() {
        let (engine, api) = live_api();
        let (cut, _) = bind("a", &api);

        let notified = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&notified);
        engine.subscribe(Rc::new(move |_: &CompositeState| *sink.borrow_mut() += 1));

        let before = engine.get_state();
        cut.update(|_| None);
        cut.patch(Record::new());

        assert_eq!(engine.get_state(), before);
        assert_eq!(*notified.borrow(), 2, "identity commits still notify");
    }

    #[test]
    fn reader_is_never_cached() {
        let (_engine, api) = live_api();
        let (cut, read) = bind("a", &api);

        let first = read.read();
        cut.patch(Record::new().field("x", 7));
        let second = read.read();

        assert_eq!(
            first.slice("a").and_then(|r| r.get("x")),
            Some(&Value::Int(1))
        );
        assert_eq!(
            second.slice("a").and_then(|r| r.get("x")),
            Some(&Value::Int(7))
        );
    }

    #[test]
    fn with_set_still_commits_through_original_handle() {
        let (engine, api) = live_api();
        let labels = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&labels);
        let wrapped = api.with_set(move |t| {
            sink.borrow_mut().push("a/commit".to_string());
            t
        });

        let (cut, _) = bind("a", &wrapped);
        cut.patch(Record::new().field("x", 3));

        assert_eq!(labels.borrow().as_slice(), ["a/commit"]);
        assert_eq!(
            engine.get_state().slice("a").and_then(|r| r.get("x")),
            Some(&Value::Int(3))
        );
    }
}
