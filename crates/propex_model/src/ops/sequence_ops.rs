//! Operations over ordered, index-addressable containers.

use crate::spec::TypeSpec;
use crate::value::Accessible;

// -----------------------------------------------------------------------------
// Sequence trait

/// A trait for type-erased operations on ordered containers.
///
/// Implemented for `Vec<T>` (growable) and `[T; N]` (fixed-size).
/// Bracket `Index` keys in a property path dispatch here.
///
/// # Examples
///
/// ```
/// use propex_model::ops::Sequence;
///
/// let values = vec![10_i32, 20, 30];
/// let seq: &dyn Sequence = &values;
///
/// assert_eq!(seq.len(), 3);
/// assert_eq!(seq.get(1).unwrap().downcast_ref::<i32>(), Some(&20));
/// assert!(seq.get(9).is_none());
/// ```
pub trait Sequence: Accessible {
    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns `true` if the sequence holds no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the element at `index`, if in bounds.
    fn get(&self, index: usize) -> Option<&dyn Accessible>;

    /// Returns a mutable reference to the element at `index`, if in bounds.
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Accessible>;

    /// Replaces the element at `index`.
    ///
    /// The value is handed back unchanged when its type does not match
    /// the element type or `index` is out of bounds.
    fn set(&mut self, index: usize, value: Box<dyn Accessible>)
    -> Result<(), Box<dyn Accessible>>;

    /// Appends a value, handing it back unchanged when its type does
    /// not match the element type or the sequence cannot grow.
    fn try_push(&mut self, value: Box<dyn Accessible>) -> Result<(), Box<dyn Accessible>>;

    /// Appends a default-constructed element.
    ///
    /// Returns `false` when the sequence cannot grow or the element
    /// type has no known default; auto-grow degrades to a null-path
    /// failure in that case.
    fn push_default(&mut self) -> bool;

    /// Returns the declared element spec.
    fn elem_spec(&self) -> TypeSpec;

    /// Iterates the elements in order.
    #[inline]
    fn iter_elements(&self) -> SequenceIter<'_>
    where
        Self: Sized,
    {
        SequenceIter {
            sequence: self,
            index: 0,
        }
    }
}

impl dyn Sequence {
    /// Iterates the elements of a type-erased sequence in order.
    #[inline]
    pub fn elements(&self) -> SequenceIter<'_> {
        SequenceIter {
            sequence: self,
            index: 0,
        }
    }
}

// -----------------------------------------------------------------------------
// Iterator

/// An iterator over the elements of a [`Sequence`].
pub struct SequenceIter<'a> {
    sequence: &'a dyn Sequence,
    index: usize,
}

impl<'a> Iterator for SequenceIter<'a> {
    type Item = &'a dyn Accessible;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.sequence.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sequence.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SequenceIter<'_> {}
