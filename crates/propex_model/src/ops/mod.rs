//! Type-erased container operations.
//!
//! One trait per container shape, mirroring the bracket-key dispatch of
//! the path grammar: [`Sequence`] for index-addressable containers,
//! [`Keyed`] for textual-key maps, [`Unordered`] for sets readable by
//! iteration position.

mod keyed_ops;
mod sequence_ops;
mod unordered_ops;

pub use keyed_ops::Keyed;
pub use sequence_ops::{Sequence, SequenceIter};
pub use unordered_ops::{Unordered, UnorderedIter};
