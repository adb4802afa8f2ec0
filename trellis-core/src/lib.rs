//! Trellis Core
//!
//! This crate provides the reactivity core of the Trellis component
//! framework. It implements:
//!
//! - Transparent observation of plain data (objects and arrays)
//! - Automatic dependency collection while subscribers evaluate
//! - Ordered, failure-isolated change notification
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: change publishers, the active-subscriber stack and the
//!   subscriber capability
//! - `observer`: values, containers and the interceptors that make them
//!   observable
//! - `config`: per-thread settings and host hooks
//! - `error`: diagnostics and errors
//!
//! Everything is single-threaded. Values, publishers and subscribers are
//! `Rc`-based and belong to the thread that created them.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::observer::{observe, Object, Value};
//! use trellis_core::reactive::Effect;
//!
//! let state = Object::from_pairs([("count", Value::from(0))]);
//! observe(&state.clone().into(), true);
//!
//! let effect = Effect::new({
//!     let state = state.clone();
//!     move || println!("count is {}", state.get("count"))
//! });
//!
//! state.set("count", Value::from(5));
//! // Effect re-ran and printed "count is 5"
//! assert_eq!(effect.run_count(), 2);
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod reactive;

pub use config::ReactivityConfig;
pub use error::{BoxError, Diagnostic, ReactivityError};
pub use observer::{del, observe, set, Array, Object, Value};
pub use reactive::{Dep, Effect, Subscriber, SubscriberId};
