//! Declared-type metadata: [`TypeIdent`], [`TypeSpec`] and [`Typed`].

use std::any::{Any, TypeId};
use std::fmt;

use crate::value::{Accessible, Shape};

// -----------------------------------------------------------------------------
// TypeIdent

/// Runtime type identity: a [`TypeId`] paired with the full type name.
///
/// # Examples
///
/// ```
/// use propex_model::TypeIdent;
///
/// let ident = TypeIdent::of::<Vec<String>>();
/// assert!(ident.is::<Vec<String>>());
/// assert_eq!(ident.short_name(), "Vec<String>");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeIdent {
    id: TypeId,
    name: &'static str,
}

impl TypeIdent {
    /// Returns the identity of `T`.
    #[inline]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`].
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the full type name, including module paths.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this identity is `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Returns the type name with all module paths stripped.
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl fmt::Display for TypeIdent {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Strips module paths from a full type name, keeping generic structure
/// (`alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`).
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut start = 0;
    for (i, ch) in full.char_indices() {
        match ch {
            ':' => start = i + 1,
            '<' | '>' | '(' | ')' | '[' | ']' | ',' | ';' | ' ' | '&' => {
                out.push_str(&full[start..i]);
                out.push(ch);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push_str(&full[start..]);
    out
}

// -----------------------------------------------------------------------------
// Top type

/// Marker for the *top* declared type: any value is acceptable.
///
/// Used where a declared type cannot be resolved more precisely, e.g.
/// contract fragments whose generic parameters never receive a
/// concrete binding. Coercion towards top is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyValue;

// -----------------------------------------------------------------------------
// TypeSpec

/// Declared-type metadata for a property, element or key position.
///
/// A `TypeSpec` carries the shape of the declared type, its
/// nullability, one level of element/value parameterization per
/// container nesting (so `Vec<HashMap<String, i32>>` resolves element
/// then value across two bracket groups), an optional default
/// constructor used by auto-grow, and an optional text parser used by
/// built-in coercion for scalars and variant enums.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    ident: TypeIdent,
    shape: Shape,
    nullable: bool,
    elem: Option<Box<TypeSpec>>,
    key: Option<TypeIdent>,
    construct: Option<fn() -> Box<dyn Accessible>>,
    parse: Option<fn(&str) -> Option<Box<dyn Accessible>>>,
}

impl TypeSpec {
    fn new<T: Any>(shape: Shape) -> Self {
        Self {
            ident: TypeIdent::of::<T>(),
            shape,
            nullable: false,
            elem: None,
            key: None,
            construct: None,
            parse: None,
        }
    }

    /// A scalar leaf type.
    #[inline]
    pub fn scalar<T: Any>() -> Self {
        Self::new::<T>(Shape::Scalar)
    }

    /// A bean type; its properties come from the descriptor registry.
    #[inline]
    pub fn bean<T: Any>() -> Self {
        Self::new::<T>(Shape::Bean)
    }

    /// An ordered container with the given element spec.
    pub fn sequence<T: Any>(elem: TypeSpec) -> Self {
        let mut spec = Self::new::<T>(Shape::Sequence);
        spec.elem = Some(Box::new(elem));
        spec
    }

    /// A keyed container with the given key identity and value spec.
    pub fn keyed<T: Any>(key: TypeIdent, value: TypeSpec) -> Self {
        let mut spec = Self::new::<T>(Shape::Keyed);
        spec.key = Some(key);
        spec.elem = Some(Box::new(value));
        spec
    }

    /// An unordered container with the given element spec.
    pub fn unordered<T: Any>(elem: TypeSpec) -> Self {
        let mut spec = Self::new::<T>(Shape::Unordered);
        spec.elem = Some(Box::new(elem));
        spec
    }

    /// The top type: any value is acceptable, coercion is identity.
    #[inline]
    pub fn top() -> Self {
        Self::new::<AnyValue>(Shape::Scalar)
    }

    /// Attaches a default constructor, enabling auto-grow for values
    /// of this declared type.
    #[inline]
    pub fn with_construct(mut self, construct: fn() -> Box<dyn Accessible>) -> Self {
        self.construct = Some(construct);
        self
    }

    /// Attaches a text parser used by built-in string coercion.
    #[inline]
    pub fn with_parse(mut self, parse: fn(&str) -> Option<Box<dyn Accessible>>) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Marks the declared type as nullable (an `Option` slot).
    #[inline]
    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns the type identity.
    #[inline]
    pub fn ident(&self) -> TypeIdent {
        self.ident
    }

    /// Returns the declared shape.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns `true` for `Option`-backed slots.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns `true` for the top type.
    #[inline]
    pub fn is_top(&self) -> bool {
        self.ident.is::<AnyValue>()
    }

    /// Returns the element spec (sequence/unordered) or value spec (keyed).
    #[inline]
    pub fn elem(&self) -> Option<&TypeSpec> {
        self.elem.as_deref()
    }

    /// Returns the key identity of a keyed container.
    #[inline]
    pub fn key(&self) -> Option<TypeIdent> {
        self.key
    }

    /// Default-constructs a value of this type, if a constructor is known.
    #[inline]
    pub fn construct_default(&self) -> Option<Box<dyn Accessible>> {
        self.construct.map(|construct| construct())
    }

    /// Returns `true` if a default constructor is known.
    #[inline]
    pub fn can_construct(&self) -> bool {
        self.construct.is_some()
    }

    /// Parses a value of this type from text, if a parser is known.
    #[inline]
    pub fn parse_text(&self, text: &str) -> Option<Box<dyn Accessible>> {
        self.parse.and_then(|parse| parse(text))
    }

    /// Returns `true` if a text parser is known (numerics, `String`,
    /// `bool`, `char`, variant enums).
    #[inline]
    pub fn is_text_parseable(&self) -> bool {
        self.parse.is_some()
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident.short_name())?;
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Typed

/// A static accessor to a type's declared [`TypeSpec`].
///
/// Implemented for scalars and the provided std containers, and by
/// [`define_properties!`](crate::define_properties) /
/// [`scalar_variants!`](crate::scalar_variants) for user types.
pub trait Typed: 'static {
    /// Returns the declared spec of `Self`.
    fn type_spec() -> TypeSpec;
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(
            short_type_name("alloc::vec::Vec<alloc::string::String>"),
            "Vec<String>"
        );
        assert_eq!(
            short_type_name("std::collections::HashMap<alloc::string::String, i32>"),
            "HashMap<String, i32>"
        );
        assert_eq!(short_type_name("i32"), "i32");
    }

    #[test]
    fn top_spec() {
        let top = TypeSpec::top();
        assert!(top.is_top());
        assert!(!TypeSpec::scalar::<i32>().is_top());
    }

    #[test]
    fn nullable_marker() {
        let spec = TypeSpec::scalar::<i32>().into_nullable();
        assert!(spec.is_nullable());
        assert_eq!(format!("{spec}"), "i32?");
    }
}
