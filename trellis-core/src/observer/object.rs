//! Key-value containers.
//!
//! An [`Object`] is a shared handle over an insertion-ordered map of
//! properties. A property slot is one of:
//!
//! - a data value,
//! - an accessor pair supplied by the host (a computed getter and/or
//!   setter),
//! - a reactive property installed by observation.
//!
//! Reads and writes go through [`Object::get`] and [`Object::set`], which
//! dispatch on the slot kind. That dispatch is the interception point: once
//! a key holds a reactive property, every read and write of it is seen.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::property::ReactiveProperty;
use super::registry;
use super::value::{ContainerId, Value};

pub type Getter = Rc<dyn Fn() -> Value>;
pub type Setter = Rc<dyn Fn(Value)>;

/// A host-defined accessor pair.
///
/// A getter without a setter makes the key read-only: writes are dropped.
#[derive(Clone, Default)]
pub struct Accessor {
    pub get: Option<Getter>,
    pub set: Option<Setter>,
}

impl Accessor {
    pub fn getter(get: impl Fn() -> Value + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: None,
        }
    }

    pub fn new(get: impl Fn() -> Value + 'static, set: impl Fn(Value) + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Accessor(Accessor),
    Reactive(Rc<ReactiveProperty>),
}

/// What an object stands for, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Plain data. Eligible for observation.
    Plain,
    /// A framework root instance. Never observed.
    Instance,
}

pub(crate) struct ObjectInner {
    id: ContainerId,
    kind: ObjectKind,
    extensible: Cell<bool>,
    props: RefCell<IndexMap<Rc<str>, Slot>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        registry::evict(self.id);
    }
}

/// A shared key-value container. Cloning shares the same properties.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    /// Create an empty plain object.
    pub fn new() -> Self {
        Self::with_kind(ObjectKind::Plain)
    }

    /// Create an empty root instance.
    pub fn instance() -> Self {
        Self::with_kind(ObjectKind::Instance)
    }

    pub fn with_kind(kind: ObjectKind) -> Self {
        Self(Rc::new(ObjectInner {
            id: ContainerId::next(),
            kind,
            extensible: Cell::new(true),
            props: RefCell::new(IndexMap::new()),
        }))
    }

    /// Create a plain object holding data values.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let obj = Self::new();
        {
            let mut props = obj.0.props.borrow_mut();
            for (key, value) in pairs {
                props.insert(Rc::from(key.as_ref()), Slot::Data(value));
            }
        }
        obj
    }

    pub fn id(&self) -> ContainerId {
        self.0.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.kind
    }

    pub fn is_plain(&self) -> bool {
        self.0.kind == ObjectKind::Plain
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Forbid new keys. Existing keys stay writable and deletable.
    pub fn prevent_extensions(&self) {
        self.0.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    /// Read `key`. Missing keys read as `Undefined`.
    ///
    /// Reading a reactive property while a subscriber is active records the
    /// dependency.
    pub fn get(&self, key: &str) -> Value {
        match self.slot(key) {
            None => Value::Undefined,
            Some(Slot::Data(value)) => value,
            Some(Slot::Accessor(accessor)) => accessor.get.map(|get| get()).unwrap_or_default(),
            Some(Slot::Reactive(prop)) => prop.get(),
        }
    }

    /// Plain assignment.
    ///
    /// Reactive properties notify their subscribers. A new key is added as a
    /// plain, non-reactive data value; use [`set`](crate::observer::set) to
    /// add a reactive key to an observed object. New keys on a
    /// non-extensible object and writes to getter-only keys are dropped.
    pub fn set(&self, key: &str, value: Value) {
        match self.slot(key) {
            Some(Slot::Reactive(prop)) => prop.set(value),
            Some(Slot::Accessor(accessor)) => {
                if let Some(set) = accessor.set {
                    set(value);
                }
            }
            Some(Slot::Data(_)) => self.install(key, Slot::Data(value)),
            None if self.is_extensible() => self.install(key, Slot::Data(value)),
            None => {}
        }
    }

    /// Install a host accessor pair on `key`.
    pub fn define_accessor(&self, key: &str, accessor: Accessor) {
        if self.has(key) || self.is_extensible() {
            self.install(key, Slot::Accessor(accessor));
        }
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.0.props.borrow_mut().shift_remove(key).is_some()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    /// Whether `key` is currently intercepted by observation.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(self.slot(key), Some(Slot::Reactive(_)))
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.props.borrow().keys().map(|k| k.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the slot out so no borrow is held while getters run.
    pub(crate) fn slot(&self, key: &str) -> Option<Slot> {
        self.0.props.borrow().get(key).cloned()
    }

    pub(crate) fn install(&self, key: &str, slot: Slot) {
        let mut props = self.0.props.borrow_mut();
        match props.get_mut(key) {
            Some(existing) => *existing = slot,
            None => {
                props.insert(Rc::from(key), slot);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn property(&self, key: &str) -> Option<Rc<ReactiveProperty>> {
        match self.slot(key) {
            Some(Slot::Reactive(prop)) => Some(prop),
            _ => None,
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id.raw())
            .field("kind", &self.0.kind)
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_properties_read_and_write() {
        let obj = Object::from_pairs([("a", Value::from(1))]);
        assert_eq!(obj.get("a"), Value::from(1));
        assert!(obj.get("missing").is_undefined());

        obj.set("a", Value::from(2));
        obj.set("b", Value::from(3));
        assert_eq!(obj.get("a"), Value::from(2));
        assert_eq!(obj.keys(), vec!["a".to_string(), "b".to_string()]);
        assert!(!obj.is_reactive("a"));
    }

    #[test]
    fn non_extensible_objects_ignore_new_keys() {
        let obj = Object::from_pairs([("a", Value::from(1))]);
        obj.prevent_extensions();

        obj.set("b", Value::from(2));
        obj.set("a", Value::from(5));
        assert!(!obj.has("b"));
        assert_eq!(obj.get("a"), Value::from(5));
    }

    #[test]
    fn getter_only_accessor_drops_writes() {
        let obj = Object::new();
        obj.define_accessor("answer", Accessor::getter(|| Value::from(42)));

        obj.set("answer", Value::from(0));
        assert_eq!(obj.get("answer"), Value::from(42));
    }

    #[test]
    fn accessor_pair_delegates() {
        let backing = Rc::new(RefCell::new(Value::from(1)));
        let obj = Object::new();
        obj.define_accessor(
            "x",
            Accessor::new(
                {
                    let b = backing.clone();
                    move || b.borrow().clone()
                },
                {
                    let b = backing.clone();
                    move |v| *b.borrow_mut() = v
                },
            ),
        );

        obj.set("x", Value::from(7));
        assert_eq!(*backing.borrow(), Value::from(7));
        assert_eq!(obj.get("x"), Value::from(7));
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let obj = Object::from_pairs([
            ("a", Value::from(1)),
            ("b", Value::from(2)),
            ("c", Value::from(3)),
        ]);
        assert!(obj.remove("b"));
        assert!(!obj.remove("b"));
        assert_eq!(obj.keys(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn instance_kind_is_fixed() {
        assert!(Object::new().is_plain());
        assert_eq!(Object::instance().kind(), ObjectKind::Instance);
    }
}
