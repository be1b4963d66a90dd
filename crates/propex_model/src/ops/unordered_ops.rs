//! Operations over unordered containers.

use crate::spec::TypeSpec;
use crate::value::Accessible;

// -----------------------------------------------------------------------------
// Unordered trait

/// A trait for type-erased operations on unordered containers.
///
/// Implemented for `HashSet<T>` and `BTreeSet<T>`. Elements are
/// readable by iteration position only; there is no mutable element
/// access, since handing out `&mut` into a set would invalidate its
/// hashing/ordering invariants. Writes that pass through a set element
/// instead take the element out, mutate it as an owned value and
/// reinsert it. Writing the element slot itself is rejected.
pub trait Unordered: Accessible {
    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if the container holds no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at the given iteration position.
    fn get_at(&self, index: usize) -> Option<&dyn Accessible>;

    /// Removes and returns the element at the given iteration position.
    ///
    /// This is how a path write reaches into a set: the element is
    /// taken out, mutated as an owned value and reinserted.
    fn take_at(&mut self, index: usize) -> Option<Box<dyn Accessible>>;

    /// Inserts a value, handing it back unchanged when its type does
    /// not match the element type. Returns `true` if the value was new.
    fn try_insert(&mut self, value: Box<dyn Accessible>) -> Result<bool, Box<dyn Accessible>>;

    /// Returns the declared element spec.
    fn elem_spec(&self) -> TypeSpec;
}

impl dyn Unordered {
    /// Iterates the elements in iteration order.
    #[inline]
    pub fn elements(&self) -> UnorderedIter<'_> {
        UnorderedIter {
            set: self,
            index: 0,
        }
    }
}

// -----------------------------------------------------------------------------
// Iterator

/// An iterator over the elements of an [`Unordered`] container.
pub struct UnorderedIter<'a> {
    set: &'a dyn Unordered,
    index: usize,
}

impl<'a> Iterator for UnorderedIter<'a> {
    type Item = &'a dyn Accessible;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.set.get_at(self.index)?;
        self.index += 1;
        Some(item)
    }
}
