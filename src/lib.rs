#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use propex_access as access;
pub use propex_model as model;

pub use propex_access::{Accessor, Coercer, PropertyAccessError, PropertyPath, PropertyUpdate};
pub use propex_model::{Accessible, ResolutionMode, TypeSpec, Typed};
pub use propex_model::{define_properties, scalar_variants};
