//! Observation
//!
//! This module turns plain data into observed data.
//!
//! # Overview
//!
//! [`observe`] takes a [`Value`]. If it is a plain object or an array that
//! is not observed yet, it creates an [`Observer`] marker for it and
//! instruments it:
//!
//! - every own key of an object is replaced by a reactive property
//!   ([`define_reactive`]), recursively observing the values,
//! - every element of an array is observed; the array's own mutating
//!   operations notify the marker dep.
//!
//! Observation is permanent for the container's lifetime. Keys added later
//! are invisible until defined through [`set`]; keys removed through [`del`]
//! notify the container's marker dep.
//!
//! # Design Decisions
//!
//! 1. Markers live in a registry keyed by [`ContainerId`], not on the
//!    containers themselves. Checking whether a value is observed is a
//!    lookup.
//!
//! 2. Observability is decided by the value's variant. Only plain objects
//!    and arrays qualify; vnodes, opaque host values, root instances and
//!    primitives never do.
//!
//! 3. Arrays are their own wrapper type. There is no unobserved array whose
//!    methods could bypass notification.

mod array;
mod object;
mod property;
mod registry;
mod value;
mod vnode;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

pub use array::{Array, MAX_LENGTH};
pub use object::{Accessor, Getter, Object, ObjectKind, Setter};
pub use property::{define_reactive, CustomSetter, DefineOptions, ReactiveProperty};
pub use registry::observer_of;
pub use value::{ContainerId, Opaque, Value};
pub use vnode::VNode;

use crate::config::{self, is_observing};
use crate::error::Diagnostic;
use crate::reactive::Dep;

/// The marker attached to every observed container.
pub struct Observer {
    id: ContainerId,
    is_array: bool,
    dep: Dep,
    root_count: Cell<usize>,
}

impl Observer {
    /// The container-identity dep: notified on structural changes such as
    /// array mutation or keys added and removed through [`set`] and [`del`].
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    pub fn container_id(&self) -> ContainerId {
        self.id
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// How many owners use the container directly as their root state.
    pub fn root_count(&self) -> usize {
        self.root_count.get()
    }

    fn attach(value: &Value) -> Option<Rc<Observer>> {
        let (id, is_array) = match value {
            Value::Object(obj) => (obj.id(), false),
            Value::Array(array) => (array.id(), true),
            _ => return None,
        };

        let ob = Rc::new(Observer {
            id,
            is_array,
            dep: Dep::new(),
            root_count: Cell::new(0),
        });
        // Register before walking so cycles find the marker.
        registry::register(ob.clone());
        tracing::trace!(container = id.raw(), is_array, "observe");

        match value {
            Value::Object(obj) => {
                for key in obj.keys() {
                    define_reactive(obj, &key, None, DefineOptions::default());
                }
            }
            Value::Array(array) => {
                for item in array.to_vec() {
                    observe(&item, false);
                }
            }
            _ => {}
        }

        Some(ob)
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("container", &self.id.raw())
            .field("is_array", &self.is_array)
            .field("dep", &self.dep)
            .field("root_count", &self.root_count.get())
            .finish()
    }
}

fn is_eligible(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.is_plain() && obj.is_extensible(),
        Value::Array(_) => true,
        _ => false,
    }
}

/// Observe `value`, returning its marker.
///
/// Returns the existing marker when `value` is already observed, and `None`
/// when it cannot be observed (primitives, vnodes, opaque values, root
/// instances, non-extensible objects) or observation is switched off.
/// `as_root` records that the caller uses the container as root state.
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observer>> {
    let id = value.container_id()?;
    let ob = match registry::lookup(id) {
        Some(ob) => Some(ob),
        None if is_observing() && is_eligible(value) => Observer::attach(value),
        None => None,
    };

    if as_root {
        if let Some(ob) = &ob {
            ob.root_count.set(ob.root_count.get() + 1);
        }
    }
    ob
}

/// A property key for [`set`] and [`del`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Name(Rc<str>),
    Index(usize),
}

impl Key {
    /// The array index this key denotes, if any. Canonical decimal names
    /// ("3", not "03") count as indices.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(name) => {
                let index: usize = name.parse().ok()?;
                (index.to_string() == **name).then_some(index)
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Key::Name(name) => name.to_string(),
            Key::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(Rc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Rc::from(name))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

fn is_root_bound(obj: &Object, ob: Option<&Rc<Observer>>) -> bool {
    !obj.is_plain() || ob.is_some_and(|ob| ob.root_count() > 0)
}

/// Assign `target[key] = value`, making a new key reactive.
///
/// - On an array, an index key replaces the element through
///   [`Array::splice`], growing the array first if needed.
/// - On an object, an existing key is assigned normally. A new key on an
///   observed object is defined as a reactive property and the object's
///   marker dep is notified; on an unobserved object it is plain data.
///
/// Adding keys to a root instance or root-bound state is allowed but
/// warned about. Returns `value`.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
    let key = key.into();
    match target {
        Value::Array(array) => match key.as_index() {
            Some(index) if index >= MAX_LENGTH || !array.grow_to(index) => {
                config::warn(Diagnostic::IndexOutOfRange { index });
            }
            Some(index) => {
                array.splice(index, 1, [value.clone()]);
            }
            None => config::warn(Diagnostic::NonIndexArrayKey { key: key.name() }),
        },
        Value::Object(obj) => {
            let name = key.name();
            if obj.has(&name) {
                obj.set(&name, value.clone());
                return value;
            }

            let ob = registry::lookup(obj.id());
            if is_root_bound(obj, ob.as_ref()) {
                config::warn(Diagnostic::RootAddition { key: name.clone() });
            }
            match ob {
                None if obj.is_extensible() => obj.set(&name, value.clone()),
                None => config::warn(Diagnostic::NonExtensibleTarget { key: name }),
                Some(ob) => {
                    if !define_reactive(obj, &name, Some(value.clone()), DefineOptions::default()) {
                        config::warn(Diagnostic::NonExtensibleTarget { key: name });
                        return value;
                    }
                    tracing::debug!(container = obj.id().raw(), key = %name, "reactive key added");
                    ob.dep().notify();
                }
            }
        }
        other => config::warn(Diagnostic::NonReactiveTarget {
            op: "set",
            target: other.to_string(),
        }),
    }
    value
}

/// Delete `target[key]`, notifying the marker dep of an observed object.
///
/// On an array an index key removes the element through
/// [`Array::splice`]. Deleting a missing key does nothing. Deleting from a
/// root instance or root-bound state is allowed but warned about.
pub fn del(target: &Value, key: impl Into<Key>) {
    let key = key.into();
    match target {
        Value::Array(array) => match key.as_index() {
            Some(index) => {
                array.splice(index, 1, []);
            }
            None => config::warn(Diagnostic::NonIndexArrayKey { key: key.name() }),
        },
        Value::Object(obj) => {
            let name = key.name();
            let ob = registry::lookup(obj.id());
            if is_root_bound(obj, ob.as_ref()) {
                config::warn(Diagnostic::RootDeletion { key: name.clone() });
            }
            if !obj.remove(&name) {
                return;
            }
            if let Some(ob) = ob {
                tracing::debug!(container = obj.id().raw(), key = %name, "reactive key removed");
                ob.dep().notify();
            }
        }
        other => config::warn(Diagnostic::NonReactiveTarget {
            op: "delete",
            target: other.to_string(),
        }),
    }
}
