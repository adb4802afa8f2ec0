//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that depends on observed data: render
//! functions, watchers, computed values. The core only needs three things
//! from it, captured by the [`Subscriber`] trait.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;
use crate::error::BoxError;

/// Unique identifier for a subscriber.
///
/// Ids are handed out in creation order, so sorting by id runs parents
/// before the children they created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A computation that can be notified of changes.
pub trait Subscriber {
    /// Stable identity, used to order notifications.
    fn id(&self) -> SubscriberId;

    /// Re-run after a dependency changed.
    ///
    /// Errors are reported through the host error hook; they never stop
    /// the remaining subscribers of the same notification.
    fn update(&self) -> Result<(), BoxError>;

    /// Called by [`Dep::depend`] while this subscriber is the active one.
    ///
    /// Implementations decide whether to register, usually by
    /// deduplicating per evaluation pass, and then call
    /// [`Dep::add_subscriber`] with themselves.
    fn add_dependency(self: Rc<Self>, dep: &Dep);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_ids_follow_creation_order() {
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        assert!(first < second);
        assert_eq!(first.to_string(), format!("#{}", first.raw()));
    }
}
