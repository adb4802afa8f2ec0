//! Observation Registry
//!
//! Maps container identities to their [`Observer`] markers. A container is
//! observed exactly when it has an entry here, so "is this value observed"
//! and "what is its child observer" are lookups rather than hidden fields on
//! the container.
//!
//! Containers evict their own entry when the last handle to them is dropped.
//! The registry holds markers strongly but markers never hold their
//! container, so it does not keep containers alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::{ContainerId, Value};
use super::Observer;

thread_local! {
    static OBSERVERS: RefCell<HashMap<ContainerId, Rc<Observer>>> = RefCell::new(HashMap::new());
}

pub(crate) fn lookup(id: ContainerId) -> Option<Rc<Observer>> {
    OBSERVERS.with(|observers| observers.borrow().get(&id).cloned())
}

pub(crate) fn register(observer: Rc<Observer>) {
    OBSERVERS.with(|observers| {
        observers
            .borrow_mut()
            .insert(observer.container_id(), observer);
    });
}

pub(crate) fn evict(id: ContainerId) {
    // The thread-local may already be gone when containers are dropped
    // during thread teardown.
    let _ = OBSERVERS.try_with(|observers| {
        let removed = observers.borrow_mut().remove(&id);
        drop(removed);
    });
}

/// The marker of an observed container, if `value` is one.
pub fn observer_of(value: &Value) -> Option<Rc<Observer>> {
    value.container_id().and_then(lookup)
}

#[cfg(test)]
pub(crate) fn len() -> usize {
    OBSERVERS.with(|observers| observers.borrow().len())
}
