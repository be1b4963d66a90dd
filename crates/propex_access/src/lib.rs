#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod accessor;
mod batch;
pub mod convert;
mod error;
pub mod path;

pub use accessor::Accessor;
pub use batch::{BatchReport, BatchUpdateError, PropertyUpdate, UpdateOutcome};
pub use convert::{
    ConversionError, ConversionErrorKind, ConversionRequest, ConversionService, Converter, Coercer,
};
pub use error::{PropertyAccessError, Suggestions};
pub use path::{KeyToken, PathErrorKind, PathParseError, PathSegment, PropertyPath};
