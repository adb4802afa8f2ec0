//! Ordered sequences.
//!
//! Element access by index cannot be intercepted the way keyed properties
//! are, so [`Array`] owns its storage and routes every structural change
//! through one of seven mutating operations:
//!
//! | operation   | inserted elements       |
//! |-------------|-------------------------|
//! | `push`      | all arguments           |
//! | `pop`       | none                    |
//! | `shift`     | none                    |
//! | `unshift`   | all arguments           |
//! | `splice`    | the replacement items   |
//! | `sort`      | none                    |
//! | `reverse`   | none                    |
//!
//! Each operation first applies the plain sequence semantics. If the array
//! is observed it then observes the inserted elements and notifies the
//! array's marker dep. The plain result is returned unchanged. An array
//! that is not observed behaves exactly like a `Vec`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::registry;
use super::value::{default_compare, ContainerId, Value};
use super::observe;

/// Largest length an array can be grown to by index assignment.
pub const MAX_LENGTH: usize = u32::MAX as usize;

pub(crate) struct ArrayInner {
    id: ContainerId,
    items: RefCell<Vec<Value>>,
}

impl Drop for ArrayInner {
    fn drop(&mut self) {
        registry::evict(self.id);
    }
}

/// A shared ordered sequence. Cloning shares the same storage.
#[derive(Clone)]
pub struct Array(Rc<ArrayInner>);

impl Array {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayInner {
            id: ContainerId::next(),
            items: RefCell::new(items),
        }))
    }

    pub fn id(&self) -> ContainerId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an element. Out-of-range reads are `Undefined`. Not tracked.
    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Snapshot of the elements. Not tracked.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Append `values`. Returns the new length.
    pub fn push(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let inserted: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.extend(inserted.iter().cloned());
            items.len()
        };
        self.mutated(&inserted);
        len
    }

    /// Remove the last element.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.0.items.borrow_mut().pop();
        self.mutated(&[]);
        removed
    }

    /// Remove the first element.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.mutated(&[]);
        removed
    }

    /// Prepend `values`, keeping their order. Returns the new length.
    pub fn unshift(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let inserted: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, inserted.iter().cloned());
            items.len()
        };
        self.mutated(&inserted);
        len
    }

    /// Remove `delete_count` elements at `start` and insert `values` there.
    ///
    /// `start` and `delete_count` are clamped to the array. Returns the
    /// removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        values: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let inserted: Vec<Value> = values.into_iter().collect();
        let removed = {
            let mut items = self.0.items.borrow_mut();
            let start = start.min(items.len());
            let end = start + delete_count.min(items.len() - start);
            items.splice(start..end, inserted.iter().cloned()).collect()
        };
        self.mutated(&inserted);
        removed
    }

    /// Sort in place by string conversion, `Undefined` last. Stable.
    pub fn sort(&self) -> &Self {
        self.sort_by(default_compare)
    }

    /// Sort in place with `compare`. Stable.
    ///
    /// A copy is sorted and swapped in afterwards, so `compare` sees the
    /// unsorted array if it reads it, and a panicking `compare` leaves the
    /// array untouched.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) -> &Self {
        let mut sorted = self.to_vec();
        sorted.sort_by(compare);
        *self.0.items.borrow_mut() = sorted;
        self.mutated(&[]);
        self
    }

    /// Reverse in place.
    pub fn reverse(&self) -> &Self {
        self.0.items.borrow_mut().reverse();
        self.mutated(&[]);
        self
    }

    /// Pad with `Undefined` up to `len` without notifying.
    ///
    /// Returns `false`, leaving the array as it was, when `len` exceeds
    /// [`MAX_LENGTH`] or the storage cannot be allocated.
    pub(crate) fn grow_to(&self, len: usize) -> bool {
        if len > MAX_LENGTH {
            return false;
        }
        let mut items = self.0.items.borrow_mut();
        let current = items.len();
        if current < len {
            if items.try_reserve_exact(len - current).is_err() {
                return false;
            }
            items.resize(len, Value::Undefined);
        }
        true
    }

    fn mutated(&self, inserted: &[Value]) {
        let Some(ob) = registry::lookup(self.id()) else {
            return;
        };
        for value in inserted {
            observe(value, false);
        }
        ob.dep().notify();
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("id", &self.0.id.raw())
            .field("items", &*self.0.items.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{observer_of, Object};
    use crate::reactive::Effect;

    fn nums(items: &[i32]) -> Vec<Value> {
        items.iter().map(|&n| Value::from(n)).collect()
    }

    fn observed(items: &[i32]) -> (Array, Rc<Effect>) {
        let array = Array::from_vec(nums(items));
        let ob = observe(&array.clone().into(), false).unwrap();
        let effect = Effect::new(move || ob.dep().depend());
        (array, effect)
    }

    #[test]
    fn unobserved_array_behaves_like_a_vec() {
        let array = Array::from_vec(nums(&[1, 2, 3]));
        assert_eq!(array.push(nums(&[4])), 4);
        assert_eq!(array.shift(), Some(Value::from(1)));
        assert_eq!(array.to_vec(), nums(&[2, 3, 4]));
        assert!(array.get(10).is_undefined());
    }

    #[test]
    fn each_mutation_notifies_once() {
        let (array, effect) = observed(&[3, 1, 2]);

        assert_eq!(array.push(nums(&[4, 5])), 5);
        assert_eq!(effect.run_count(), 2);

        assert_eq!(array.pop(), Some(Value::from(5)));
        assert_eq!(effect.run_count(), 3);

        assert_eq!(array.shift(), Some(Value::from(3)));
        assert_eq!(effect.run_count(), 4);

        assert_eq!(array.unshift(nums(&[7, 8])), 5);
        assert_eq!(array.to_vec(), nums(&[7, 8, 1, 2, 4]));
        assert_eq!(effect.run_count(), 5);

        assert_eq!(array.splice(1, 2, nums(&[9])), nums(&[8, 1]));
        assert_eq!(array.to_vec(), nums(&[7, 9, 2, 4]));
        assert_eq!(effect.run_count(), 6);

        array.sort();
        assert_eq!(array.to_vec(), nums(&[2, 4, 7, 9]));
        assert_eq!(effect.run_count(), 7);

        array.reverse();
        assert_eq!(array.to_vec(), nums(&[9, 7, 4, 2]));
        assert_eq!(effect.run_count(), 8);
    }

    #[test]
    fn mutating_an_empty_array_still_notifies() {
        let (array, effect) = observed(&[]);
        assert_eq!(array.pop(), None);
        assert_eq!(array.shift(), None);
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn splice_clamps_its_range() {
        let array = Array::from_vec(nums(&[1, 2, 3]));
        assert_eq!(array.splice(2, 10, []), nums(&[3]));
        assert_eq!(array.splice(10, 1, nums(&[4])), Vec::<Value>::new());
        assert_eq!(array.to_vec(), nums(&[1, 2, 4]));
    }

    #[test]
    fn sort_uses_string_order_by_default() {
        let array = Array::from_vec(nums(&[10, 9, 1]));
        array.sort();
        assert_eq!(array.to_vec(), nums(&[1, 10, 9]));

        array.sort_by(|a, b| {
            a.as_number()
                .unwrap_or_default()
                .total_cmp(&b.as_number().unwrap_or_default())
        });
        assert_eq!(array.to_vec(), nums(&[1, 9, 10]));
    }

    #[test]
    fn panicking_comparator_keeps_the_elements() {
        let (array, effect) = observed(&[2, 1, 3]);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            array.sort_by(|_, _| panic!("comparator failed"));
        }));

        assert!(result.is_err());
        assert_eq!(array.to_vec(), nums(&[2, 1, 3]));
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn comparator_may_read_the_array() {
        let array = Array::from_vec(nums(&[3, 1, 2]));
        let reader = array.clone();
        array.sort_by(|a, b| {
            assert_eq!(reader.len(), 3);
            a.as_number()
                .unwrap_or_default()
                .total_cmp(&b.as_number().unwrap_or_default())
        });
        assert_eq!(array.to_vec(), nums(&[1, 2, 3]));
    }

    #[test]
    fn grow_to_refuses_oversized_lengths() {
        let array = Array::from_vec(nums(&[1]));
        assert!(!array.grow_to(usize::MAX));
        assert!(!array.grow_to(MAX_LENGTH + 1));
        assert_eq!(array.len(), 1);

        assert!(array.grow_to(3));
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn inserted_objects_become_observed() {
        let (array, _effect) = observed(&[]);
        let pushed = Value::from(Object::from_pairs([("a", Value::from(1))]));
        let unshifted = Value::from(Object::new());
        let spliced = Value::from(Array::new());

        array.push([pushed.clone()]);
        array.unshift([unshifted.clone()]);
        array.splice(1, 0, [spliced.clone()]);

        assert!(observer_of(&pushed).is_some());
        assert!(observer_of(&unshifted).is_some());
        assert!(observer_of(&spliced).is_some());
        assert!(pushed.as_object().unwrap().is_reactive("a"));
    }

    #[test]
    fn unobserved_array_does_not_observe_inserted_values() {
        let array = Array::new();
        let pushed = Value::from(Object::new());
        array.push([pushed.clone()]);
        assert!(observer_of(&pushed).is_none());
    }
}
