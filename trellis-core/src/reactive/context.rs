//! Active-Subscriber Stack
//!
//! The stack tracks which subscriber is currently evaluating. Property reads
//! consult its top entry to decide who the read should be attributed to.
//!
//! # Implementation
//!
//! We use a thread-local stack. Evaluating a subscriber pushes it; finishing
//! pops it. Nested evaluation (a subscriber whose evaluation runs another
//! one) works because the stack is strictly LIFO.
//!
//! An entry may be `None`: that suspends collection for the duration, which
//! is how [`untracked`] reads values without depending on them.
//!
//! Pushes and pops must stay paired. [`TargetGuard`] guarantees that by
//! popping in `Drop`; the raw [`push_target`]/[`pop_target`] pair is exposed
//! for hosts that manage the pairing themselves.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Rc<dyn Subscriber>>>> = const { RefCell::new(Vec::new()) };
}

/// Push `target` and make it the current subscriber.
pub fn push_target(target: Option<Rc<dyn Subscriber>>) {
    TARGET_STACK.with(|stack| stack.borrow_mut().push(target));
}

/// Pop the most recent entry. The new top becomes current.
pub fn pop_target() -> Option<Rc<dyn Subscriber>> {
    TARGET_STACK.with(|stack| stack.borrow_mut().pop().flatten())
}

/// The subscriber reads are currently attributed to, if any.
pub fn current_target() -> Option<Rc<dyn Subscriber>> {
    TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Whether a read right now would be collected.
pub fn is_tracking() -> bool {
    TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Number of entries on the stack, `None` entries included.
pub fn depth() -> usize {
    TARGET_STACK.with(|stack| stack.borrow().len())
}

/// Run `f` without collecting any dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = TargetGuard::enter(None);
    f()
}

/// Guard that pops the stack when dropped.
///
/// This keeps the stack balanced even if the evaluation panics.
pub struct TargetGuard {
    id: Option<SubscriberId>,
}

impl TargetGuard {
    /// Make `target` current until the guard is dropped.
    pub fn enter(target: Option<Rc<dyn Subscriber>>) -> Self {
        let id = target.as_ref().map(|t| t.id());
        push_target(target);
        Self { id }
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        TARGET_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catches guards dropped out of order. Skipped while unwinding,
            // where a second panic would abort.
            if let (Some(entry), false) = (popped, std::thread::panicking()) {
                debug_assert_eq!(
                    entry.as_ref().map(|t| t.id()),
                    self.id,
                    "TargetGuard mismatch"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::reactive::Dep;

    struct Probe(SubscriberId);

    impl Subscriber for Probe {
        fn id(&self) -> SubscriberId {
            self.0
        }
        fn update(&self) -> Result<(), BoxError> {
            Ok(())
        }
        fn add_dependency(self: Rc<Self>, _dep: &Dep) {}
    }

    fn probe() -> Rc<dyn Subscriber> {
        Rc::new(Probe(SubscriberId::new()))
    }

    #[test]
    fn guard_tracks_subscriber() {
        let sub = probe();
        let id = sub.id();

        assert!(!is_tracking());
        assert!(current_target().is_none());

        {
            let _guard = TargetGuard::enter(Some(sub));
            assert!(is_tracking());
            assert_eq!(current_target().map(|t| t.id()), Some(id));
        }

        assert!(!is_tracking());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn nested_targets() {
        let outer = probe();
        let inner = probe();
        let (outer_id, inner_id) = (outer.id(), inner.id());

        {
            let _outer = TargetGuard::enter(Some(outer));
            {
                let _inner = TargetGuard::enter(Some(inner));
                assert_eq!(current_target().map(|t| t.id()), Some(inner_id));
            }
            // After inner pops, outer is current again
            assert_eq!(current_target().map(|t| t.id()), Some(outer_id));
        }

        assert!(current_target().is_none());
    }

    #[test]
    fn untracked_suspends_collection() {
        let _guard = TargetGuard::enter(Some(probe()));
        assert!(is_tracking());
        let inside = untracked(is_tracking);
        assert!(!inside);
        assert!(is_tracking());
    }

    #[test]
    fn raw_push_and_pop() {
        let sub = probe();
        let id = sub.id();
        push_target(Some(sub));
        push_target(None);
        assert!(!is_tracking());
        assert_eq!(depth(), 2);
        assert!(pop_target().is_none());
        assert_eq!(pop_target().map(|t| t.id()), Some(id));
        assert!(current_target().is_none());
    }

    #[test]
    fn guard_pops_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = TargetGuard::enter(Some(probe()));
            panic!("evaluation failed");
        });
        assert!(result.is_err());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn unbalanced_push_during_panic_does_not_abort() {
        let stray = probe();
        let stray_id = stray.id();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = TargetGuard::enter(Some(probe()));
            push_target(Some(stray));
            panic!("evaluation failed");
        }));

        // The guard popped the stray entry; its own entry is left behind.
        assert!(result.is_err());
        assert_eq!(depth(), 1);
        assert_ne!(pop_target().map(|t| t.id()), Some(stray_id));
        assert_eq!(depth(), 0);
    }
}
