//! Scalar impls: numerics, `bool`, `char`, `String`.

use std::fmt;

use crate::spec::{TypeIdent, TypeSpec};
use crate::value::{Accessible, ContainerMut, ContainerRef};
use crate::{Typed, __accessible_plumbing};

// -----------------------------------------------------------------------------
// Scalar impls

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Accessible for $ty {
            #[inline]
            fn type_ident(&self) -> TypeIdent {
                TypeIdent::of::<$ty>()
            }

            #[inline]
            fn container_ref(&self) -> ContainerRef<'_> {
                ContainerRef::Scalar(self)
            }

            #[inline]
            fn container_mut(&mut self) -> ContainerMut<'_> {
                ContainerMut::Scalar(self)
            }

            __accessible_plumbing!();

            #[inline]
            fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{self:?}")
            }
        }

        impl Typed for $ty {
            fn type_spec() -> TypeSpec {
                TypeSpec::scalar::<$ty>()
                    .with_construct(|| Box::new(<$ty>::default()))
                    .with_parse(|text| {
                        text.trim()
                            .parse::<$ty>()
                            .ok()
                            .map(|value| Box::new(value) as Box<dyn Accessible>)
                    })
            }
        }
    )*};
}

impl_scalar!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
);

// `String` keeps its text verbatim; trimming is a numeric concern.
impl Accessible for String {
    #[inline]
    fn type_ident(&self) -> TypeIdent {
        TypeIdent::of::<String>()
    }

    #[inline]
    fn container_ref(&self) -> ContainerRef<'_> {
        ContainerRef::Scalar(self)
    }

    #[inline]
    fn container_mut(&mut self) -> ContainerMut<'_> {
        ContainerMut::Scalar(self)
    }

    __accessible_plumbing!();

    #[inline]
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Typed for String {
    fn type_spec() -> TypeSpec {
        TypeSpec::scalar::<String>()
            .with_construct(|| Box::new(String::new()))
            .with_parse(|text| Some(Box::new(text.to_string()) as Box<dyn Accessible>))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_shape_and_identity() {
        let value: &dyn Accessible = &7_u32;
        assert!(value.type_ident().is::<u32>());
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn numeric_parse_trims() {
        let spec = <i32 as Typed>::type_spec();
        let parsed = spec.parse_text("  65 ").unwrap();
        assert_eq!(parsed.downcast_ref::<i32>(), Some(&65));
    }

    #[test]
    fn string_parse_keeps_whitespace() {
        let spec = <String as Typed>::type_spec();
        let parsed = spec.parse_text(" padded ").unwrap();
        assert_eq!(
            parsed.downcast_ref::<String>().map(String::as_str),
            Some(" padded ")
        );
    }

    #[test]
    fn take_roundtrip() {
        let boxed: Box<dyn Accessible> = Box::new(5_i64);
        assert_eq!(boxed.take::<i64>().ok(), Some(5));

        let boxed: Box<dyn Accessible> = Box::new(5_i64);
        let back = boxed.take::<i32>().unwrap_err();
        assert!(back.is::<i64>());
    }
}
