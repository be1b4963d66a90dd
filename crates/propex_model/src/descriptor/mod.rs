//! Property descriptors: declared accessor pairs, type fragments and
//! the merged, immutable per-type descriptor set.
//!
//! A type describes its properties as an ordered list of
//! [`DescriptorFragment`]s: its own declarations, declarations
//! inherited from an embedded base value (reached through projection
//! closures and resolved recursively), and contract fragments
//! (interface-like declaration sets). The [resolver](crate::descriptor)
//! merges fragments most-specific-first into a [`DescriptorSet`],
//! computing read and write types independently per property name.

mod resolve;

pub(crate) use resolve::resolve;

use std::fmt;
use std::sync::Arc;

use crate::spec::{TypeIdent, TypeSpec};
use crate::value::Accessible;

// -----------------------------------------------------------------------------
// Accessor closures

/// Reads a property slot out of its owner; `None` is a null slot.
pub type GetFn = Arc<dyn for<'a> Fn(&'a dyn Accessible) -> Option<&'a dyn Accessible> + Send + Sync>;

/// Mutable counterpart of [`GetFn`].
pub type GetMutFn =
    Arc<dyn for<'a> Fn(&'a mut dyn Accessible) -> Option<&'a mut dyn Accessible> + Send + Sync>;

/// Writes an already-coerced value into its owner's slot.
///
/// The value is handed back unchanged when the owner or value type
/// does not match.
pub type SetFn =
    Arc<dyn Fn(&mut dyn Accessible, Box<dyn Accessible>) -> Result<(), Box<dyn Accessible>> + Send + Sync>;

// -----------------------------------------------------------------------------
// Declared accessors

/// The read half of a property: declared type plus get closures.
#[derive(Clone)]
pub struct ReadAccessor {
    pub ty: TypeSpec,
    pub get: GetFn,
    pub get_mut: GetMutFn,
}

/// The write half of a property: declared parameter type plus set closure.
#[derive(Clone)]
pub struct WriteAccessor {
    pub ty: TypeSpec,
    pub set: SetFn,
}

/// One declared accessor pair, before any merging.
///
/// A fragment may declare the same name more than once with different
/// write parameter types; those are overloads and are disambiguated at
/// merge time according to the [`ResolutionMode`].
#[derive(Clone)]
pub struct DeclaredProperty {
    pub name: &'static str,
    pub read: Option<ReadAccessor>,
    pub write: Option<WriteAccessor>,
}

impl fmt::Debug for ReadAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadAccessor").field("ty", &self.ty).finish_non_exhaustive()
    }
}

impl fmt::Debug for WriteAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteAccessor").field("ty", &self.ty).finish_non_exhaustive()
    }
}

impl fmt::Debug for DeclaredProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredProperty")
            .field("name", &self.name)
            .field("read", &self.read)
            .field("write", &self.write)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Fragments

/// One declaration layer of a type's property surface.
pub enum DescriptorFragment {
    /// The described type's own accessor declarations.
    Own { properties: Vec<DeclaredProperty> },
    /// Declarations inherited from an embedded base value.
    ///
    /// The base type's fragments are resolved recursively and each
    /// inherited accessor is re-targeted through the projections.
    /// Because the base is embedded at a concrete parameterization,
    /// monomorphization performs the generic substitution: a derived
    /// type embedding `Ident<i64>` reports `i64`, never a placeholder.
    Base {
        ty: TypeIdent,
        project: GetFn,
        project_mut: GetMutFn,
    },
    /// An interface-like declaration set.
    ///
    /// `redeclares` is `false` for a contract that merely extends
    /// another property-bearing contract without redeclaring its
    /// accessors; such fragments are visible in [`ResolutionMode::Basic`]
    /// and hidden in [`ResolutionMode::Strict`].
    Contract {
        ty: TypeIdent,
        redeclares: bool,
        properties: Vec<DeclaredProperty>,
    },
}

/// The full declared property surface of one type.
pub struct TypeProperties {
    pub ty: TypeIdent,
    pub fragments: Vec<DescriptorFragment>,
}

/// A static accessor to a type's declared property surface.
///
/// Implemented by [`define_properties!`](crate::define_properties);
/// hand-written impls are the escape hatch for overloaded setters and
/// contract fragments.
pub trait PropertySource: 'static {
    /// Returns the declared property surface of `Self`.
    fn type_properties() -> TypeProperties;
}

// -----------------------------------------------------------------------------
// Resolution mode

/// Selects between the two documented descriptor-merge behaviors.
///
/// The modes diverge on exactly two points: whether a non-redeclaring
/// sub-contract exposes its inherited properties, and how overloaded
/// setters unrelated to the read type are disambiguated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolutionMode {
    /// Standard-introspection-compatible: non-redeclaring contracts
    /// are hidden; ambiguous overloaded setters yield no write
    /// accessor unless one matches the read type.
    #[default]
    Strict,
    /// Usability-leaning: non-redeclaring contracts are included;
    /// ambiguous overloaded setters fall back to the most specific
    /// declared candidate.
    Basic,
}

// -----------------------------------------------------------------------------
// Merged descriptors

/// Resolved metadata for one property of one type.
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub(crate) name: &'static str,
    pub(crate) read: Option<ReadAccessor>,
    pub(crate) write: Option<WriteAccessor>,
    pub(crate) declaring_type: TypeIdent,
}

impl PropertyDescriptor {
    /// Returns the property name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the read accessor, if the property is readable.
    #[inline]
    pub fn read(&self) -> Option<&ReadAccessor> {
        self.read.as_ref()
    }

    /// Returns the write accessor, if the property is writable.
    #[inline]
    pub fn write(&self) -> Option<&WriteAccessor> {
        self.write.as_ref()
    }

    /// Returns the declared read type.
    #[inline]
    pub fn read_type(&self) -> Option<&TypeSpec> {
        self.read.as_ref().map(|read| &read.ty)
    }

    /// Returns the declared write type.
    #[inline]
    pub fn write_type(&self) -> Option<&TypeSpec> {
        self.write.as_ref().map(|write| &write.ty)
    }

    /// Returns the type whose declaration won the merge.
    #[inline]
    pub fn declaring_type(&self) -> TypeIdent {
        self.declaring_type
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("read_type", &self.read_type())
            .field("write_type", &self.write_type())
            .field("declaring_type", &self.declaring_type)
            .finish()
    }
}

/// The merged, immutable property surface of one type in one mode.
///
/// Built once, published behind `Arc`, safe for concurrent readers.
pub struct DescriptorSet {
    pub(crate) ty: TypeIdent,
    pub(crate) mode: ResolutionMode,
    pub(crate) by_name: std::collections::HashMap<&'static str, PropertyDescriptor>,
    pub(crate) names: Vec<&'static str>,
}

impl DescriptorSet {
    /// Returns the described type.
    #[inline]
    pub fn ty(&self) -> TypeIdent {
        self.ty
    }

    /// Returns the mode this set was resolved under.
    #[inline]
    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Looks up a property descriptor by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.by_name.get(name)
    }

    /// Returns the property names, sorted.
    #[inline]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Returns the number of properties.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the type exposes no properties.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for DescriptorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorSet")
            .field("ty", &self.ty)
            .field("mode", &self.mode)
            .field("names", &self.names)
            .finish()
    }
}
