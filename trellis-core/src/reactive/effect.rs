//! Effect Implementation
//!
//! An Effect is the simplest complete [`Subscriber`]: a side-effecting
//! closure that re-runs whenever something it read changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its closure immediately to establish
//!    initial dependencies (unless created with [`Effect::lazy`]).
//!
//! 2. During a run the effect is the active subscriber, so every observed
//!    property it reads hands its dep to [`Effect::add_dependency`]. Deps are
//!    deduplicated per run: reading the same property many times registers
//!    the effect once.
//!
//! 3. After a run, deps that were read last time but not this time drop the
//!    effect, so a branch that is no longer taken stops triggering it.
//!
//! 4. When any dep notifies, `update()` runs the closure again.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::TargetGuard;
use super::dep::{Dep, DepId};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::BoxError;

type EffectFn = Box<dyn Fn() -> Result<(), BoxError>>;

/// A side-effecting computation that runs when its dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let state = Object::from_pairs([("count", 0.into())]);
/// observe(&state.clone().into(), false);
///
/// let effect = Effect::new({
///     let state = state.clone();
///     move || println!("count is {}", state.get("count"))
/// });
///
/// state.set("count", 5.into()); // prints "count is 5"
/// ```
pub struct Effect {
    id: SubscriberId,
    this: Weak<Effect>,
    run: EffectFn,

    deps: RefCell<Vec<Dep>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<Vec<Dep>>,
    new_dep_ids: RefCell<HashSet<DepId>>,

    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

impl Effect {
    /// Create an effect and run it once.
    pub fn new<F>(run: F) -> Rc<Self>
    where
        F: Fn() + 'static,
    {
        Self::try_new(move || {
            run();
            Ok(())
        })
    }

    /// Create an effect whose closure may fail, and run it once.
    ///
    /// Failures, including one on the first run, go through the host error
    /// hook like any other subscriber failure.
    pub fn try_new<F>(run: F) -> Rc<Self>
    where
        F: Fn() -> Result<(), BoxError> + 'static,
    {
        let effect = Self::build(Box::new(run));
        if let Err(error) = effect.execute() {
            crate::config::report_error(crate::error::ReactivityError::SubscriberFailed {
                subscriber: effect.id,
                source: error,
            });
        }
        effect
    }

    /// Create an effect without running it.
    pub fn lazy<F>(run: F) -> Rc<Self>
    where
        F: Fn() + 'static,
    {
        Self::build(Box::new(move || {
            run();
            Ok(())
        }))
    }

    fn build(run: EffectFn) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            id: SubscriberId::new(),
            this: this.clone(),
            run,
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        })
    }

    /// Run the closure as the active subscriber and refresh dependencies.
    pub fn execute(&self) -> Result<(), BoxError> {
        if self.disposed.get() {
            return Ok(());
        }
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };

        let result = {
            let _guard = TargetGuard::enter(Some(this as Rc<dyn Subscriber>));
            (self.run)()
        };

        self.cleanup_deps();
        self.run_count.set(self.run_count.get() + 1);
        result
    }

    /// Swap in the deps collected by the last run, releasing stale ones.
    fn cleanup_deps(&self) {
        {
            let new_ids = self.new_dep_ids.borrow();
            for dep in self.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_subscriber(self.id);
                }
            }
        }

        std::mem::swap(&mut *self.deps.borrow_mut(), &mut *self.new_deps.borrow_mut());
        std::mem::swap(
            &mut *self.dep_ids.borrow_mut(),
            &mut *self.new_dep_ids.borrow_mut(),
        );
        self.new_deps.borrow_mut().clear();
        self.new_dep_ids.borrow_mut().clear();
    }

    /// Stop the effect and detach it from every dep.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        for dep in self.deps.borrow_mut().drain(..) {
            dep.remove_subscriber(self.id);
        }
        self.dep_ids.borrow_mut().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.run_count.get()
    }

    /// Number of distinct deps read by the last run.
    pub fn dependency_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

impl Subscriber for Effect {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) -> Result<(), BoxError> {
        self.execute()
    }

    fn add_dependency(self: Rc<Self>, dep: &Dep) {
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.new_deps.borrow_mut().push(dep.clone());
        if !self.dep_ids.borrow().contains(&id) {
            let this: Rc<dyn Subscriber> = self.clone();
            dep.add_subscriber(&this);
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_runs_on_creation() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();

        let _effect = Effect::new(move || counter.set(counter.get() + 1));

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn lazy_effect_waits_for_execute() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();

        let effect = Effect::lazy(move || counter.set(counter.get() + 1));
        assert_eq!(runs.get(), 0);
        assert_eq!(effect.run_count(), 0);

        effect.execute().unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn repeated_reads_register_once() {
        let dep = Dep::new();
        let reader = dep.clone();

        let effect = Effect::new(move || {
            reader.depend();
            reader.depend();
            reader.depend();
        });

        assert_eq!(dep.subscriber_count(), 1);
        assert_eq!(effect.dependency_count(), 1);

        effect.execute().unwrap();
        assert_eq!(dep.subscriber_count(), 1);
    }

    #[test]
    fn notify_reruns_effect() {
        let dep = Dep::new();
        let reader = dep.clone();
        let effect = Effect::new(move || reader.depend());

        dep.notify();
        dep.notify();
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn stale_deps_are_released() {
        let flag = Rc::new(Cell::new(true));
        let a = Dep::new();
        let b = Dep::new();

        let effect = Effect::new({
            let (flag, a, b) = (flag.clone(), a.clone(), b.clone());
            move || {
                if flag.get() {
                    a.depend();
                } else {
                    b.depend();
                }
            }
        });
        assert_eq!(a.subscriber_count(), 1);
        assert_eq!(b.subscriber_count(), 0);

        flag.set(false);
        effect.execute().unwrap();
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 1);
    }

    #[test]
    fn disposed_effect_does_not_run() {
        let dep = Dep::new();
        let reader = dep.clone();
        let effect = Effect::new(move || reader.depend());

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(dep.subscriber_count(), 0);

        dep.notify();
        effect.execute().unwrap();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn failing_first_run_is_reported() {
        let reported = Rc::new(Cell::new(false));
        let flag = reported.clone();
        crate::config::set_error_handler(Some(Rc::new(move |_: &crate::error::ReactivityError| {
            flag.set(true)
        })));

        let effect = Effect::try_new(|| Err("nope".into()));
        crate::config::set_error_handler(None);

        assert!(reported.get());
        assert_eq!(effect.run_count(), 1);
    }
}
