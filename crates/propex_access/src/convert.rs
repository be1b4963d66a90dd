//! Value coercion: adapting an incoming value to a declared property
//! type.
//!
//! The [`Coercer`] runs a fixed precedence order. Custom converters
//! registered for a `(source, target, path)` triple win over
//! `(target, path)` pairs, which win over plain target registrations;
//! a pluggable [`ConversionService`] comes next; built-in conversions
//! run last. Built-ins cover identity and the top type, text parsing
//! into scalars and variant enums, checked numeric conversions,
//! scalar-to-text, per-element container conversions and wrapping a
//! lone value into a singleton container.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use propex_model::{Accessible, ContainerMut, ContainerRef, Shape, TypeSpec};
use thiserror::Error;

// -----------------------------------------------------------------------------
// Errors

/// Why a coercion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConversionErrorKind {
    #[error("no applicable conversion")]
    NoMatch,
    #[error("value out of range for the target type")]
    OutOfRange,
    #[error("text does not parse as the target type")]
    Unparseable,
}

/// A failed coercion, carrying both type names and the rendered value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert `{value}` from {from} to {to}: {kind}")]
pub struct ConversionError {
    pub from: String,
    pub to: String,
    pub value: String,
    pub kind: ConversionErrorKind,
}

// -----------------------------------------------------------------------------
// Converter hooks

/// The context handed to a custom converter.
pub struct ConversionRequest<'a> {
    /// The incoming value.
    pub value: &'a dyn Accessible,
    /// The declared type being coerced towards.
    pub target: &'a TypeSpec,
    /// The property path being written, empty for standalone coercion.
    pub path: &'a str,
}

/// A custom conversion hook.
///
/// Returning `Ok(None)` declines the request and lets the rest of the
/// pipeline run. Returning `Err` aborts the coercion; the failure is
/// carried to the caller as the mismatch cause. Implemented for any
/// matching closure.
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        request: &ConversionRequest<'_>,
    ) -> Result<Option<Box<dyn Accessible>>, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(&ConversionRequest<'_>) -> Result<Option<Box<dyn Accessible>>, ConversionError>
        + Send
        + Sync,
{
    fn convert(
        &self,
        request: &ConversionRequest<'_>,
    ) -> Result<Option<Box<dyn Accessible>>, ConversionError> {
        self(request)
    }
}

/// A whole-service fallback consulted between custom converters and
/// the built-ins, for plugging in an external conversion framework.
pub trait ConversionService: Send + Sync {
    fn convert(&self, value: &dyn Accessible, target: &TypeSpec) -> Option<Box<dyn Accessible>>;
}

// -----------------------------------------------------------------------------
// Coercer

/// The precedence-ordered coercion pipeline.
pub struct Coercer {
    by_pair_path: HashMap<(TypeId, TypeId, String), Arc<dyn Converter>>,
    by_target_path: HashMap<(TypeId, String), Arc<dyn Converter>>,
    by_target: HashMap<TypeId, Arc<dyn Converter>>,
    service: Option<Arc<dyn ConversionService>>,
}

impl Coercer {
    /// A pipeline with only the built-in conversions.
    pub fn new() -> Self {
        Self {
            by_pair_path: HashMap::new(),
            by_target_path: HashMap::new(),
            by_target: HashMap::new(),
            service: None,
        }
    }

    /// Registers a converter for a source/target pair at one path.
    pub fn register_pair_at_path<S, T>(
        &mut self,
        path: &str,
        converter: impl Converter + 'static,
    ) where
        S: Accessible,
        T: Accessible,
    {
        self.by_pair_path.insert(
            (TypeId::of::<S>(), TypeId::of::<T>(), path.to_string()),
            Arc::new(converter),
        );
    }

    /// Registers a converter for a target type at one path.
    pub fn register_target_at_path<T: Accessible>(
        &mut self,
        path: &str,
        converter: impl Converter + 'static,
    ) {
        self.by_target_path
            .insert((TypeId::of::<T>(), path.to_string()), Arc::new(converter));
    }

    /// Registers a converter for a target type at any path.
    pub fn register_target<T: Accessible>(&mut self, converter: impl Converter + 'static) {
        self.by_target.insert(TypeId::of::<T>(), Arc::new(converter));
    }

    /// Installs the fallback conversion service.
    pub fn set_service(&mut self, service: Arc<dyn ConversionService>) {
        self.service = Some(service);
    }

    /// Coerces `value` to `target`, consuming the value.
    ///
    /// `path` is the property path being written; standalone callers
    /// pass `""`.
    pub fn coerce(
        &self,
        value: Box<dyn Accessible>,
        target: &TypeSpec,
        path: &str,
    ) -> Result<Box<dyn Accessible>, ConversionError> {
        let target_id = target.ident().id();
        let source_id = value.type_ident().id();

        let custom = self
            .by_pair_path
            .get(&(source_id, target_id, path.to_string()))
            .or_else(|| self.by_target_path.get(&(target_id, path.to_string())))
            .or_else(|| self.by_target.get(&target_id));
        if let Some(converter) = custom {
            let request = ConversionRequest { value: &*value, target, path };
            match converter.convert(&request) {
                Ok(Some(converted)) => return Ok(converted),
                Ok(None) => {}
                Err(error) => return Err(error),
            }
        }

        // Identity, including towards top, passes the box through.
        if target.is_top() || source_id == target_id {
            return Ok(value);
        }

        if let Some(service) = &self.service {
            if let Some(converted) = service.convert(&*value, target) {
                return Ok(converted);
            }
        }

        match self.builtin(&*value, target, path) {
            Ok(converted) => Ok(converted),
            Err(kind) => Err(ConversionError {
                from: value.type_ident().short_name(),
                to: target.ident().short_name(),
                value: value.rendered().to_string(),
                kind,
            }),
        }
    }

    fn builtin(
        &self,
        value: &dyn Accessible,
        target: &TypeSpec,
        path: &str,
    ) -> Result<Box<dyn Accessible>, ConversionErrorKind> {
        if let Some(text) = value.downcast_ref::<String>() {
            if target.is_text_parseable() {
                return target.parse_text(text).ok_or(ConversionErrorKind::Unparseable);
            }
        } else if target.ident().is::<String>() && value.shape() == Shape::Scalar {
            return Ok(Box::new(scalar_to_text(value)));
        }

        if let Some(wide) = widen_numeric(value) {
            if let Some(narrowed) = narrow_numeric(target, wide) {
                return narrowed;
            }
        }

        match target.shape() {
            Shape::Sequence | Shape::Unordered => self.to_container(value, target, path),
            Shape::Keyed => self.to_keyed(value, target, path),
            Shape::Bean | Shape::Scalar => Err(ConversionErrorKind::NoMatch),
        }
    }

    /// Fills a sequence or unordered target, per-element coercing a
    /// container source or wrapping anything else as a singleton.
    fn to_container(
        &self,
        value: &dyn Accessible,
        target: &TypeSpec,
        path: &str,
    ) -> Result<Box<dyn Accessible>, ConversionErrorKind> {
        let elem_spec = target.elem().cloned().unwrap_or_else(TypeSpec::top);
        let mut fresh = target
            .construct_default()
            .ok_or(ConversionErrorKind::NoMatch)?;

        let elements: Vec<Box<dyn Accessible>> = match value.container_ref() {
            ContainerRef::Sequence(seq) => seq.elements().map(Accessible::clone_value).collect(),
            ContainerRef::Unordered(set) => set.elements().map(Accessible::clone_value).collect(),
            ContainerRef::Bean(single) | ContainerRef::Scalar(single) => {
                vec![single.clone_value()]
            }
            ContainerRef::Keyed(_) => return Err(ConversionErrorKind::NoMatch),
        };

        for element in elements {
            let element = self
                .coerce(element, &elem_spec, path)
                .map_err(|error| error.kind)?;
            let pushed = match fresh.container_mut() {
                ContainerMut::Sequence(seq) => seq.try_push(element).is_ok(),
                ContainerMut::Unordered(set) => set.try_insert(element).is_ok(),
                _ => false,
            };
            if !pushed {
                return Err(ConversionErrorKind::NoMatch);
            }
        }
        Ok(fresh)
    }

    /// Fills a keyed target from a keyed source, coercing each value.
    fn to_keyed(
        &self,
        value: &dyn Accessible,
        target: &TypeSpec,
        path: &str,
    ) -> Result<Box<dyn Accessible>, ConversionErrorKind> {
        let ContainerRef::Keyed(source) = value.container_ref() else {
            return Err(ConversionErrorKind::NoMatch);
        };
        let value_spec = target.elem().cloned().unwrap_or_else(TypeSpec::top);
        let mut fresh = target
            .construct_default()
            .ok_or(ConversionErrorKind::NoMatch)?;

        for key in source.keys() {
            let Some(entry) = source.get(&key) else { continue };
            let entry = self
                .coerce(entry.clone_value(), &value_spec, path)
                .map_err(|error| error.kind)?;
            let ContainerMut::Keyed(sink) = fresh.container_mut() else {
                return Err(ConversionErrorKind::NoMatch);
            };
            if sink.insert(&key, entry).is_err() {
                return Err(ConversionErrorKind::NoMatch);
            }
        }
        Ok(fresh)
    }
}

impl Default for Coercer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Coercer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coercer")
            .field("pair_path_converters", &self.by_pair_path.len())
            .field("target_path_converters", &self.by_target_path.len())
            .field("target_converters", &self.by_target.len())
            .field("has_service", &self.service.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Numeric and text helpers

/// A numeric value lifted to its widest carrier.
#[derive(Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

fn widen_numeric(value: &dyn Accessible) -> Option<Numeric> {
    macro_rules! probe_int {
        ($($ty:ty),*) => {$(
            if let Some(v) = value.downcast_ref::<$ty>() {
                return Some(Numeric::Int(*v as i128));
            }
        )*};
    }
    probe_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, i128);
    if let Some(v) = value.downcast_ref::<u128>() {
        return i128::try_from(*v).ok().map(Numeric::Int);
    }
    if let Some(v) = value.downcast_ref::<f32>() {
        return Some(Numeric::Float(f64::from(*v)));
    }
    if let Some(v) = value.downcast_ref::<f64>() {
        return Some(Numeric::Float(*v));
    }
    None
}

/// Converts a widened numeric into the target type, range-checked.
/// `None` means the target is not numeric.
fn narrow_numeric(
    target: &TypeSpec,
    value: Numeric,
) -> Option<Result<Box<dyn Accessible>, ConversionErrorKind>> {
    if target.ident().is::<f64>() {
        let v = match value {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        };
        return Some(Ok(Box::new(v)));
    }
    if target.ident().is::<f32>() {
        let v = match value {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        };
        return Some(Ok(Box::new(v as f32)));
    }

    let int = match value {
        Numeric::Int(i) => i,
        Numeric::Float(f) => {
            if !f.is_finite() || f.fract() != 0.0 || f < i128::MIN as f64 || f > i128::MAX as f64 {
                return target_is_int(target).then_some(Err(ConversionErrorKind::OutOfRange));
            }
            f as i128
        }
    };

    macro_rules! emit {
        ($($ty:ty),*) => {$(
            if target.ident().is::<$ty>() {
                return Some(
                    <$ty>::try_from(int)
                        .map(|v| Box::new(v) as Box<dyn Accessible>)
                        .map_err(|_| ConversionErrorKind::OutOfRange),
                );
            }
        )*};
    }
    emit!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
    None
}

fn target_is_int(target: &TypeSpec) -> bool {
    macro_rules! probe {
        ($($ty:ty),*) => {
            false $(|| target.ident().is::<$ty>())*
        };
    }
    probe!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize)
}

/// Renders a scalar as plain text, without `Debug` quoting.
fn scalar_to_text(value: &dyn Accessible) -> String {
    macro_rules! probe {
        ($($ty:ty),*) => {$(
            if let Some(v) = value.downcast_ref::<$ty>() {
                return v.to_string();
            }
        )*};
    }
    probe!(bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);
    // Variant enums and other scalar newcomers render their own text.
    value.rendered().to_string()
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use propex_model::Typed;

    fn coerce_ok<T: Accessible + PartialEq + std::fmt::Debug>(
        value: Box<dyn Accessible>,
        target: &TypeSpec,
    ) -> T {
        let coercer = Coercer::new();
        let out = coercer.coerce(value, target, "").unwrap();
        out.take::<T>().unwrap()
    }

    #[test]
    fn text_to_number_round_trip() {
        let target = i32::type_spec();
        assert_eq!(coerce_ok::<i32>(Box::new("65".to_string()), &target), 65);
        assert_eq!(coerce_ok::<i32>(Box::new(" 65 ".to_string()), &target), 65);
    }

    #[test]
    fn unparseable_text_reports_kind() {
        let coercer = Coercer::new();
        let err = coercer
            .coerce(Box::new("sixty-five".to_string()), &i32::type_spec(), "")
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::Unparseable);
    }

    #[test]
    fn numeric_narrowing_is_range_checked() {
        assert_eq!(coerce_ok::<u8>(Box::new(200_i64), &u8::type_spec()), 200);

        let coercer = Coercer::new();
        let err = coercer
            .coerce(Box::new(300_i64), &u8::type_spec(), "")
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::OutOfRange);
    }

    #[test]
    fn floats_with_fractions_do_not_narrow_to_ints() {
        let coercer = Coercer::new();
        let err = coercer
            .coerce(Box::new(1.5_f64), &i32::type_spec(), "")
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::OutOfRange);

        assert_eq!(coerce_ok::<i32>(Box::new(2.0_f64), &i32::type_spec()), 2);
        assert!((coerce_ok::<f64>(Box::new(3_i32), &f64::type_spec()) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scalar_to_text_is_unquoted() {
        let target = String::type_spec();
        assert_eq!(coerce_ok::<String>(Box::new(65_i32), &target), "65");
        assert_eq!(coerce_ok::<String>(Box::new('x'), &target), "x");
        assert_eq!(coerce_ok::<String>(Box::new(true), &target), "true");
    }

    #[test]
    fn sequence_converts_per_element() {
        let target = Vec::<i32>::type_spec();
        let source: Box<dyn Accessible> =
            Box::new(vec!["1".to_string(), "2".to_string(), "3".to_string()]);
        assert_eq!(coerce_ok::<Vec<i32>>(source, &target), vec![1, 2, 3]);
    }

    #[test]
    fn lone_value_becomes_singleton_sequence() {
        let target = Vec::<i32>::type_spec();
        assert_eq!(coerce_ok::<Vec<i32>>(Box::new(7_i32), &target), vec![7]);
    }

    #[test]
    fn keyed_converts_values_keeping_keys() {
        use std::collections::HashMap;

        let target = HashMap::<String, i64>::type_spec();
        let mut source = HashMap::new();
        source.insert("a".to_string(), "1".to_string());
        source.insert("b".to_string(), "2".to_string());

        let out = coerce_ok::<HashMap<String, i64>>(Box::new(source), &target);
        assert_eq!(out.get("a"), Some(&1));
        assert_eq!(out.get("b"), Some(&2));
    }

    #[test]
    fn identity_and_top_pass_through() {
        let coercer = Coercer::new();
        let out = coercer
            .coerce(Box::new(5_i32), &i32::type_spec(), "")
            .unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&5));

        let out = coercer
            .coerce(Box::new(5_i32), &TypeSpec::top(), "")
            .unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&5));
    }

    #[test]
    fn custom_converter_precedence() {
        fn anywhere(
            request: &ConversionRequest<'_>,
        ) -> Result<Option<Box<dyn Accessible>>, ConversionError> {
            Ok(request
                .value
                .downcast_ref::<String>()
                .map(|_| Box::new(-1_i32) as Box<dyn Accessible>))
        }
        fn at_age(
            request: &ConversionRequest<'_>,
        ) -> Result<Option<Box<dyn Accessible>>, ConversionError> {
            Ok(request
                .value
                .downcast_ref::<String>()
                .map(|_| Box::new(-2_i32) as Box<dyn Accessible>))
        }
        fn string_at_age(
            _: &ConversionRequest<'_>,
        ) -> Result<Option<Box<dyn Accessible>>, ConversionError> {
            Ok(Some(Box::new(-3_i32) as Box<dyn Accessible>))
        }

        let mut coercer = Coercer::new();
        coercer.register_target::<i32>(anywhere);
        coercer.register_target_at_path::<i32>("age", at_age);
        coercer.register_pair_at_path::<String, i32>("age", string_at_age);

        let out = coercer
            .coerce(Box::new("9".to_string()), &i32::type_spec(), "age")
            .unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&-3));

        let out = coercer
            .coerce(Box::new("9".to_string()), &i32::type_spec(), "other")
            .unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&-1));
    }

    #[test]
    fn declining_converter_falls_through_to_builtins() {
        fn decline(
            _: &ConversionRequest<'_>,
        ) -> Result<Option<Box<dyn Accessible>>, ConversionError> {
            Ok(None)
        }

        let mut coercer = Coercer::new();
        coercer.register_target::<i32>(decline);
        let out = coercer
            .coerce(Box::new("65".to_string()), &i32::type_spec(), "")
            .unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&65));
    }

    #[test]
    fn failing_converter_aborts_the_pipeline() {
        fn reject(
            request: &ConversionRequest<'_>,
        ) -> Result<Option<Box<dyn Accessible>>, ConversionError> {
            Err(ConversionError {
                from: request.value.type_ident().short_name(),
                to: request.target.ident().short_name(),
                value: request.value.rendered().to_string(),
                kind: ConversionErrorKind::Unparseable,
            })
        }

        let mut coercer = Coercer::new();
        coercer.register_target::<i32>(reject);

        // "65" would parse via the built-ins; the converter failure
        // wins instead of falling through.
        let err = coercer
            .coerce(Box::new("65".to_string()), &i32::type_spec(), "")
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::Unparseable);
        assert_eq!(err.value, "\"65\"");
        assert_eq!(err.to, "i32");
    }

    #[test]
    fn service_runs_before_builtins() {
        struct Doubler;
        impl ConversionService for Doubler {
            fn convert(
                &self,
                value: &dyn Accessible,
                target: &TypeSpec,
            ) -> Option<Box<dyn Accessible>> {
                let v = value.downcast_ref::<i64>()?;
                target
                    .ident()
                    .is::<i32>()
                    .then(|| Box::new((*v * 2) as i32) as Box<dyn Accessible>)
            }
        }

        let mut coercer = Coercer::new();
        coercer.set_service(Arc::new(Doubler));
        let out = coercer
            .coerce(Box::new(21_i64), &i32::type_spec(), "")
            .unwrap();
        assert_eq!(out.downcast_ref::<i32>(), Some(&42));
    }
}
