//! [`Accessible`](crate::Accessible) / [`Typed`](crate::Typed) impls
//! for scalars and std containers.

mod collections;
mod scalars;
