//! Reactive Properties
//!
//! [`define_reactive`] replaces a key's storage with a [`ReactiveProperty`]:
//! a backing value, a dedicated [`Dep`], and the marker of the value if it is
//! itself an observed container.
//!
//! # Read path
//!
//! Returns the value (through the host getter if the key had one). While a
//! subscriber is active it also collects:
//!
//! - the property's own dep,
//! - the child container's dep, so structural changes inside the value
//!   (new keys, array mutation) reach the reader,
//! - for arrays, the dep of every observed element, recursively, because
//!   element reads by index are not intercepted.
//!
//! # Write path
//!
//! Skips writes equal to the current value ([`Value::same`]), runs the
//! custom setter hook, stores the value (through the host setter if there
//! was one; getter-only keys drop the write), observes the new value unless
//! the property is shallow, and notifies.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::array::Array;
use super::object::{Getter, Object, Setter, Slot};
use super::registry::observer_of;
use super::value::{ContainerId, Value};
use super::{observe, Observer};
use crate::reactive::{is_tracking, Dep};

/// Hook run on every effective write, before the value is stored.
pub type CustomSetter = Rc<dyn Fn(&Value)>;

/// Extra knobs for [`define_reactive`].
#[derive(Clone, Default)]
pub struct DefineOptions {
    /// Called with the incoming value on every effective write. Hosts use
    /// it to warn about writes that should not happen (for example writing
    /// to a value owned by a parent).
    pub custom_setter: Option<CustomSetter>,

    /// Do not observe the value or any value written later.
    pub shallow: bool,
}

impl DefineOptions {
    pub fn shallow() -> Self {
        Self {
            shallow: true,
            ..Self::default()
        }
    }

    pub fn with_custom_setter(mut self, hook: impl Fn(&Value) + 'static) -> Self {
        self.custom_setter = Some(Rc::new(hook));
        self
    }
}

/// An intercepted key of an object.
pub struct ReactiveProperty {
    dep: Dep,
    value: RefCell<Value>,
    child: RefCell<Option<Rc<Observer>>>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    custom_setter: Option<CustomSetter>,
    shallow: bool,
}

impl ReactiveProperty {
    pub(crate) fn get(&self) -> Value {
        let value = match &self.getter {
            Some(get) => get(),
            None => self.value.borrow().clone(),
        };

        if is_tracking() {
            self.dep.depend();
            let child = self.child.borrow().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::Array(items) = &value {
                    depend_array(items);
                }
            }
        }

        value
    }

    pub(crate) fn set(&self, new_value: Value) {
        let current = match &self.getter {
            Some(get) => get(),
            None => self.value.borrow().clone(),
        };
        if new_value.same(&current) {
            return;
        }

        if let Some(hook) = &self.custom_setter {
            hook(&new_value);
        }

        match (&self.getter, &self.setter) {
            (Some(_), None) => return,
            (_, Some(set)) => set(new_value.clone()),
            (None, None) => *self.value.borrow_mut() = new_value.clone(),
        }

        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        *self.child.borrow_mut() = child;

        self.dep.notify();
    }

    #[cfg(test)]
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }
}

impl fmt::Debug for ReactiveProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveProperty")
            .field("dep", &self.dep)
            .field("value", &*self.value.borrow())
            .field("shallow", &self.shallow)
            .finish()
    }
}

/// Install a reactive property on `obj[key]`.
///
/// With `value` set to `None` the current value of the key is used, unless
/// the key is a getter-only accessor. An existing accessor pair (including a
/// reactive property installed earlier) is kept and delegated to.
///
/// Returns whether the property was installed. Nothing happens, and
/// `false` is returned, when `key` is new and `obj` is not extensible.
pub fn define_reactive(
    obj: &Object,
    key: &str,
    value: Option<Value>,
    options: DefineOptions,
) -> bool {
    let existing = obj.slot(key);
    if existing.is_none() && !obj.is_extensible() {
        return false;
    }

    let (getter, setter): (Option<Getter>, Option<Setter>) = match &existing {
        Some(Slot::Accessor(accessor)) => (accessor.get.clone(), accessor.set.clone()),
        Some(Slot::Reactive(previous)) => {
            let (reader, writer) = (previous.clone(), previous.clone());
            let get: Getter = Rc::new(move || reader.get());
            let set: Setter = Rc::new(move |v: Value| writer.set(v));
            (Some(get), Some(set))
        }
        _ => (None, None),
    };

    let value = match value {
        Some(value) => value,
        None if getter.is_none() || setter.is_some() => obj.get(key),
        None => Value::Undefined,
    };

    let child = if options.shallow {
        None
    } else {
        observe(&value, false)
    };

    let property = ReactiveProperty {
        dep: Dep::new(),
        value: RefCell::new(value),
        child: RefCell::new(child),
        getter,
        setter,
        custom_setter: options.custom_setter,
        shallow: options.shallow,
    };
    obj.install(key, Slot::Reactive(Rc::new(property)));
    true
}

/// Collect the marker dep of every observed element, descending into nested
/// arrays.
pub(crate) fn depend_array(items: &Array) {
    let mut seen = HashSet::new();
    depend_items(items, &mut seen);
}

fn depend_items(items: &Array, seen: &mut HashSet<ContainerId>) {
    if !seen.insert(items.id()) {
        return;
    }
    for item in items.to_vec() {
        if let Some(ob) = observer_of(&item) {
            ob.dep().depend();
        }
        if let Value::Array(nested) = &item {
            depend_items(nested, seen);
        }
    }
}
