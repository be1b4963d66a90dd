//! The [`Accessible`] capability trait and per-shape dispatch.

use std::any::Any;
use std::fmt;

use crate::ops::{Keyed, Sequence, Unordered};
use crate::spec::TypeIdent;

// -----------------------------------------------------------------------------
// Shape

/// The container shape of an accessible value.
///
/// Every value participating in property access falls into exactly one
/// of these shapes; bracket keys in a property path are dispatched on
/// the shape of the value they are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A named-property bearer; accessed through its descriptor set.
    Bean,
    /// An ordered, index-addressable container (`Vec<T>`, `[T; N]`).
    Sequence,
    /// A keyed container addressed by textual keys (`HashMap<String, V>`).
    Keyed,
    /// An unordered container readable by iteration position only.
    Unordered,
    /// A leaf value with no addressable interior.
    Scalar,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Bean => "bean",
            Shape::Sequence => "sequence",
            Shape::Keyed => "keyed",
            Shape::Unordered => "unordered",
            Shape::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

// -----------------------------------------------------------------------------
// Container dispatch

/// A shared reference to an accessible value, tagged by shape.
///
/// Resolved once per bracket group; container operations are reached
/// through the op-trait references carried here, while beans and
/// scalars carry the plain value (bean property access flows through
/// the descriptor registry, not through an op trait).
pub enum ContainerRef<'a> {
    Bean(&'a dyn Accessible),
    Sequence(&'a dyn Sequence),
    Keyed(&'a dyn Keyed),
    Unordered(&'a dyn Unordered),
    Scalar(&'a dyn Accessible),
}

/// A mutable reference to an accessible value, tagged by shape.
pub enum ContainerMut<'a> {
    Bean(&'a mut dyn Accessible),
    Sequence(&'a mut dyn Sequence),
    Keyed(&'a mut dyn Keyed),
    Unordered(&'a mut dyn Unordered),
    Scalar(&'a mut dyn Accessible),
}

impl ContainerRef<'_> {
    /// Returns the shape tag of this reference.
    #[inline]
    pub fn shape(&self) -> Shape {
        match self {
            ContainerRef::Bean(_) => Shape::Bean,
            ContainerRef::Sequence(_) => Shape::Sequence,
            ContainerRef::Keyed(_) => Shape::Keyed,
            ContainerRef::Unordered(_) => Shape::Unordered,
            ContainerRef::Scalar(_) => Shape::Scalar,
        }
    }
}

impl ContainerMut<'_> {
    /// Returns the shape tag of this reference.
    #[inline]
    pub fn shape(&self) -> Shape {
        match self {
            ContainerMut::Bean(_) => Shape::Bean,
            ContainerMut::Sequence(_) => Shape::Sequence,
            ContainerMut::Keyed(_) => Shape::Keyed,
            ContainerMut::Unordered(_) => Shape::Unordered,
            ContainerMut::Scalar(_) => Shape::Scalar,
        }
    }
}

// -----------------------------------------------------------------------------
// Accessible

/// A value that can take part in property path access.
///
/// Implemented by scalars, the provided std containers, and (normally
/// through [`define_properties!`](crate::define_properties)) by bean
/// types. The trait deliberately stays small: runtime type identity,
/// shape dispatch, `Any`-based downcasting, cloning a value out of a
/// graph, and rendering for error messages.
///
/// # Examples
///
/// ```
/// use propex_model::{Accessible, Shape};
///
/// let value: &dyn Accessible = &42_i32;
/// assert_eq!(value.shape(), Shape::Scalar);
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// ```
pub trait Accessible: Any + Send + Sync {
    /// Returns the runtime type identity of this value.
    fn type_ident(&self) -> TypeIdent;

    /// Dispatches this value into its shape-tagged shared form.
    fn container_ref(&self) -> ContainerRef<'_>;

    /// Dispatches this value into its shape-tagged mutable form.
    fn container_mut(&mut self) -> ContainerMut<'_>;

    /// Returns the shape of this value.
    #[inline]
    fn shape(&self) -> Shape {
        self.container_ref().shape()
    }

    /// Upcasts to [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to [`Any`] for mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Upcasts a boxed value to [`Any`] for by-value downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Clones this value into an owned boxed form.
    fn clone_value(&self) -> Box<dyn Accessible>;

    /// Renders this value for error reporting.
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl dyn Accessible {
    /// Returns `true` if the inner value is of type `T`.
    #[inline]
    pub fn is<T: Accessible>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcasts to a shared reference of type `T`.
    #[inline]
    pub fn downcast_ref<T: Accessible>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcasts to a mutable reference of type `T`.
    #[inline]
    pub fn downcast_mut<T: Accessible>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Takes the inner value out of the box as a `T`.
    ///
    /// On a type mismatch the original box is handed back unchanged,
    /// so callers can still render it in an error message.
    pub fn take<T: Accessible>(self: Box<Self>) -> Result<T, Box<dyn Accessible>> {
        if !(*self).is::<T>() {
            return Err(self);
        }
        match self.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            // The `is` check above guarantees the downcast succeeds.
            Err(_) => unreachable!(),
        }
    }

    /// Returns a [`Display`](fmt::Display) adapter over [`Accessible::render`].
    #[inline]
    pub fn rendered(&self) -> Rendered<'_> {
        Rendered(self)
    }
}

// -----------------------------------------------------------------------------
// Shared plumbing

/// Expands the `Any`/clone plumbing of an [`Accessible`] impl.
///
/// Used by the std impls and by [`define_properties!`](crate::define_properties);
/// not part of the public surface.
#[doc(hidden)]
#[macro_export]
macro_rules! __accessible_plumbing {
    () => {
        #[inline]
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        #[inline]
        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }

        #[inline]
        fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
            self
        }

        #[inline]
        fn clone_value(&self) -> ::std::boxed::Box<dyn $crate::Accessible> {
            ::std::boxed::Box::new(self.clone())
        }
    };
}

// -----------------------------------------------------------------------------
// Rendering

/// Display adapter for error messages; see [`Accessible::render`].
pub struct Rendered<'a>(&'a dyn Accessible);

impl fmt::Display for Rendered<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.render(f)
    }
}

impl fmt::Debug for dyn Accessible {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f)
    }
}
