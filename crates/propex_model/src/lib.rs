#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod descriptor;
mod impls;
mod macros;
pub mod ops;
pub mod registry;
mod spec;
mod value;

pub use descriptor::{
    DeclaredProperty, DescriptorFragment, DescriptorSet, GetFn, GetMutFn, PropertyDescriptor,
    PropertySource, ReadAccessor, ResolutionMode, SetFn, TypeProperties, WriteAccessor,
};
pub use registry::DescriptorRegistry;
pub use spec::{AnyValue, TypeIdent, TypeSpec, Typed, short_type_name};
pub use value::{Accessible, ContainerMut, ContainerRef, Rendered, Shape};

// Used by the expansion of `define_properties!`.
#[cfg(feature = "auto_register")]
#[doc(hidden)]
pub use inventory;
