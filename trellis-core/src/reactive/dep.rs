//! Change-Publisher
//!
//! A `Dep` is the broadcast point between observed data and the
//! subscribers that read it. Every reactive property owns one, and every
//! observed container owns one more for structural changes.
//!
//! # How a Dep Works
//!
//! 1. While a subscriber evaluates, reading a property calls
//!    [`Dep::depend`], which hands the dep to the active subscriber.
//!
//! 2. The subscriber decides whether it already depends on this dep and, if
//!    not, registers itself with [`Dep::add_subscriber`].
//!
//! 3. Writing the property calls [`Dep::notify`], which calls `update()` on
//!    every registered subscriber.
//!
//! # Ownership
//!
//! A dep only holds weak references. Subscribers are owned by whoever
//! created them and may be dropped at any time; dead entries are pruned on
//! the next notification.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::context::current_target;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config;
use crate::error::ReactivityError;

/// Unique identifier for a dep, monotonic in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct Entry {
    id: SubscriberId,
    subscriber: Weak<dyn Subscriber>,
}

struct DepInner {
    id: DepId,
    subs: RefCell<SmallVec<[Entry; 4]>>,
}

/// A change publisher. Cloning shares the same subscriber list.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::next(),
            subs: RefCell::new(SmallVec::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// Append `subscriber`. No uniqueness check is made.
    pub fn add_subscriber(&self, subscriber: &Rc<dyn Subscriber>) {
        self.0.subs.borrow_mut().push(Entry {
            id: subscriber.id(),
            subscriber: Rc::downgrade(subscriber),
        });
    }

    /// Remove the first entry for `id`. No-op when absent.
    pub fn remove_subscriber(&self, id: SubscriberId) {
        let mut subs = self.0.subs.borrow_mut();
        if let Some(pos) = subs.iter().position(|e| e.id == id) {
            subs.remove(pos);
        }
    }

    /// Hand this dep to the active subscriber, if there is one.
    pub fn depend(&self) {
        if let Some(target) = current_target() {
            tracing::trace!(dep = self.0.id.0, subscriber = %target.id(), "collect");
            target.add_dependency(self);
        }
    }

    /// Call `update()` on every registered subscriber.
    ///
    /// The list is snapshotted first, so subscribers may add or remove
    /// themselves while the notification runs. Without async scheduling the
    /// snapshot is sorted by subscriber id. A failing subscriber is
    /// reported and the rest still run.
    pub fn notify(&self) {
        let mut snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subs = self.0.subs.borrow_mut();
            subs.retain(|e| e.subscriber.strong_count() > 0);
            subs.iter().filter_map(|e| e.subscriber.upgrade()).collect()
        };

        if !config::async_scheduling() {
            snapshot.sort_by_key(|s| s.id());
        }

        tracing::trace!(dep = self.0.id.0, subscribers = snapshot.len(), "notify");

        for sub in snapshot {
            if let Err(source) = sub.update() {
                config::report_error(ReactivityError::SubscriberFailed {
                    subscriber: sub.id(),
                    source,
                });
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0
            .subs
            .borrow()
            .iter()
            .filter(|e| e.subscriber.strong_count() > 0)
            .count()
    }

    /// Whether `id` is currently registered.
    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.0.subs.borrow().iter().any(|e| e.id == id)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id.0)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
