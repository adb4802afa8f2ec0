//! Reactive Primitives
//!
//! This module implements the subscriber side of the system: the change
//! publisher, the active-subscriber stack and the subscriber capability.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] is a broadcast point. Observed properties own one each; it
//! collects the subscribers that read the property and notifies them when
//! the property is written.
//!
//! ## The active subscriber
//!
//! While a subscriber evaluates it sits on top of a thread-local stack.
//! Reads performed during that time are attributed to it. Nested
//! evaluations push and pop in LIFO order.
//!
//! ## Subscribers
//!
//! Anything implementing [`Subscriber`] can be notified. [`Effect`] is the
//! bundled implementation: a closure that re-runs when something it read
//! changes.

mod context;
mod dep;
mod effect;
mod subscriber;

pub use context::{
    current_target, depth, is_tracking, pop_target, push_target, untracked, TargetGuard,
};
pub use dep::{Dep, DepId};
pub use effect::Effect;
pub use subscriber::{Subscriber, SubscriberId};
