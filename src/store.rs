//! Store handle: the externally consumed output of composition.
//!
//! [`Store`] owns the reactive engine and exposes the handle contract:
//! full-state reads, raw transitions, change subscriptions, and
//! selector-applying reads. It is generic over the engine; the bundled
//! [`CellEngine`](crate::engine::CellEngine) is the default.
//!
//! Construction resolves the forward reference between binders and the
//! engine: binders are created (inside the init) against a write-once
//! cell, the engine is constructed from the init's returned composite
//! state, and the cell is then written exactly once. Every previously
//! bound mutator and reader now resolves to the live engine.

use crate::binder::{EngineApi, UNRESOLVED};
use crate::composer::{CompositeShape, Slices, StateInit};
use crate::engine::{CellEngine, Listener, ReactiveEngine, SubscriberId, Transition};
use crate::error::Result;
use crate::state::CompositeState;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// A composed, reactively observable state container.
///
/// # Example
///
/// ```ignore
/// use substore::prelude::*;
///
/// let store: Store = Store::compose(
///     Slices::new().slice("counter", |cut, _read| {
///         let inc = {
///             let cut = cut.clone();
///             SliceAction::new(move |_| {
///                 cut.update(|rec| {
///                     let n = rec.get("count").and_then(Value::as_int).unwrap_or(0);
///                     Some(Record::new().field("count", n + 1))
///                 });
///                 Ok(Value::Null)
///             })
///         };
///         Record::new().field("count", 0).action("inc", inc)
///     }),
/// )?;
///
/// store.select(|s| s.slice("counter").unwrap().invoke("inc", &[]))?;
/// ```
pub struct Store<E: ReactiveEngine = CellEngine> {
    engine: Rc<E>,
    api: EngineApi,
}

impl<E: ReactiveEngine> Store<E> {
    /// Compose a store from a mapping of slice initializers (inferred
    /// shape mode).
    ///
    /// Every initializer runs exactly once, synchronously, in insertion
    /// order, before the engine is constructed.
    pub fn compose(slices: Slices) -> Result<Self> {
        Ok(Self::with_init(slices.into_init()?))
    }

    /// Compose a store and validate the initial composite state against a
    /// pre-declared shape (checked mode).
    ///
    /// Shares the runtime path of [`compose`](Store::compose); the only
    /// difference is the ahead-of-construction shape check.
    pub fn compose_checked(shape: &CompositeShape, slices: Slices) -> Result<Self> {
        Self::with_init_checked(shape, slices.into_init()?)
    }

    /// Construct a store from a transition-source function.
    ///
    /// This is the seam middleware stacks through: any function with the
    /// [`StateInit`] signature — a composed slice mapping, or that mapping
    /// wrapped in arbitrarily many transformation layers — is accepted.
    pub fn with_init(init: StateInit) -> Self {
        let (cell, api, initial) = Self::seed(init);
        Self::finish(cell, api, initial)
    }

    /// [`with_init`](Store::with_init) plus the ahead-of-construction
    /// shape check.
    pub fn with_init_checked(shape: &CompositeShape, init: StateInit) -> Result<Self> {
        let (cell, api, initial) = Self::seed(init);
        shape.check(&initial)?;
        Ok(Self::finish(cell, api, initial))
    }

    /// Run the init against a handle over a not-yet-resolved engine cell.
    fn seed(init: StateInit) -> (Rc<OnceCell<Rc<E>>>, EngineApi, CompositeState) {
        let cell: Rc<OnceCell<Rc<E>>> = Rc::new(OnceCell::new());

        let set_cell = Rc::clone(&cell);
        let get_cell = Rc::clone(&cell);
        let api = EngineApi::new(
            Rc::new(move |transition: Transition| {
                set_cell.get().expect(UNRESOLVED).set_state(transition)
            }),
            Rc::new(move || get_cell.get().expect(UNRESOLVED).get_state()),
        );

        let initial = init(&api);
        (cell, api, initial)
    }

    /// Construct the engine and resolve the cell (single write, no
    /// reassignment afterward).
    fn finish(cell: Rc<OnceCell<Rc<E>>>, api: EngineApi, initial: CompositeState) -> Self {
        debug!(slices = initial.len(), "constructing store");
        let engine = Rc::new(E::construct(initial));
        assert!(cell.set(Rc::clone(&engine)).is_ok(), "engine cell resolved twice");
        Store { engine, api }
    }

    /// The current composite state.
    pub fn get_state(&self) -> CompositeState {
        self.engine.get_state()
    }

    /// Apply a raw transition against the engine.
    pub fn set_state(&self, transition: Transition) {
        self.engine.set_state(transition);
    }

    /// Apply a projection to the current composite state.
    pub fn select<T>(&self, selector: impl FnOnce(&CompositeState) -> T) -> T {
        let state = self.engine.get_state();
        selector(&state)
    }

    /// Subscribe to every committed transition.
    ///
    /// The subscription unregisters when dropped; call
    /// [`Subscription::detach`] to keep it for the store's lifetime.
    pub fn subscribe(&self, listener: impl Fn(&CompositeState) + 'static) -> Subscription<E> {
        let id = self.engine.subscribe(Rc::new(listener) as Listener);
        Subscription {
            engine: Rc::clone(&self.engine),
            id: Some(id),
        }
    }

    /// Subscribe to a projection of the state, notified only when the
    /// selected value changes (compared with `PartialEq`).
    pub fn observe<T>(
        &self,
        selector: impl Fn(&CompositeState) -> T + 'static,
        listener: impl Fn(&T) + 'static,
    ) -> Subscription<E>
    where
        T: Clone + PartialEq + 'static,
    {
        let last = RefCell::new(self.select(&selector));
        self.subscribe(move |state| {
            let next = selector(state);
            if *last.borrow() != next {
                *last.borrow_mut() = next.clone();
                listener(&next);
            }
        })
    }

    /// The store's engine handle, for wrapping layers that need to stack
    /// on top of a live store.
    pub fn api(&self) -> EngineApi {
        self.api.clone()
    }
}

/// A registered change listener. Unsubscribes when dropped.
pub struct Subscription<E: ReactiveEngine = CellEngine> {
    engine: Rc<E>,
    id: Option<SubscriberId>,
}

impl<E: ReactiveEngine> Subscription<E> {
    /// Keep the listener registered for the store's lifetime.
    pub fn detach(mut self) {
        self.id = None;
    }

    /// Unsubscribe now (equivalent to dropping).
    pub fn cancel(self) {}
}

impl<E: ReactiveEngine> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.engine.unsubscribe(id);
        }
    }
}
