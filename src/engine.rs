//! Reactive engine contract and reference implementation.
//!
//! The composition core consumes exactly one collaborator: a reactive
//! state container providing construct / read / transition / subscribe.
//! Anything implementing [`ReactiveEngine`] can sit underneath a store;
//! persistence, equality suppression, and change labeling all live in the
//! engine or in layers wrapped around it, never in the core.
//!
//! [`CellEngine`] is the bundled reference engine: a single-threaded
//! snapshot cell with a listener list. It exists so the crate is usable
//! and testable standalone and deliberately does nothing clever.

use crate::state::{CompositeState, StateDelta};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;

/// A transition function: given the current composite state, produce the
/// delta to commit. Applied synchronously; the commit is visible to the
/// next state read.
pub type Transition = Box<dyn FnOnce(&CompositeState) -> StateDelta>;

/// A change listener, invoked after every committed transition with the
/// new composite state.
pub type Listener = Rc<dyn Fn(&CompositeState)>;

/// Identifies one subscription on an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

/// The external reactive engine contract.
///
/// Execution is single-threaded, cooperative and reentrant: a transition
/// function may itself read state, commit nested transitions, and invoke
/// listeners' side effects, all on one call stack. Implementations must
/// therefore never hold internal borrows while running caller-supplied
/// code.
pub trait ReactiveEngine: 'static {
    /// Build a state container seeded with `initial`.
    fn construct(initial: CompositeState) -> Self;

    /// Synchronous full-state read.
    fn get_state(&self) -> CompositeState;

    /// Apply `transition` to the current state and commit the resulting
    /// delta. Exactly one commit per call; listeners observe the new state
    /// after the commit.
    fn set_state(&self, transition: Transition);

    /// Register a change listener.
    fn subscribe(&self, listener: Listener) -> SubscriberId;

    /// Remove a previously registered listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriberId);
}

/// Reference engine: a snapshot cell plus a listener list.
///
/// Transitions run against a cloned snapshot so no borrow is held while
/// caller code executes; nested `set_state` calls from inside a transition
/// commit first, and the outer delta then merges into the post-nested
/// state at slot granularity.
pub struct CellEngine {
    state: RefCell<CompositeState>,
    listeners: RefCell<Vec<(SubscriberId, Listener)>>,
    next_id: Cell<u64>,
}

impl ReactiveEngine for CellEngine {
    fn construct(initial: CompositeState) -> Self {
        CellEngine {
            state: RefCell::new(initial),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn get_state(&self) -> CompositeState {
        self.state.borrow().clone()
    }

    fn set_state(&self, transition: Transition) {
        // Snapshot first and drop the borrow: the transition may reenter.
        let snapshot = self.state.borrow().clone();
        let delta = transition(&snapshot);
        trace!(slots = delta.len(), "commit");

        let committed = {
            let mut current = self.state.borrow_mut();
            delta.apply_to(&mut current);
            current.clone()
        };

        // Listeners may subscribe or unsubscribe reentrantly; iterate a
        // copy of the list taken at commit time.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(&committed);
        }
    }

    fn subscribe(&self, listener: Listener) -> SubscriberId {
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.listeners.borrow_mut().retain(|(sid, _)| *sid != id);
    }
}
