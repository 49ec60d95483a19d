#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

pub mod archive;
pub mod class;
pub mod enums;
pub mod error;
pub mod function;
pub mod object;
pub mod property;
pub mod registry;
pub mod runtime;
pub mod value;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use class::Class;
pub use enums::{Enum, EnumValue};
pub use error::{Error, Result};
pub use function::Function;
pub use object::{UserObject, UserType};
pub use property::Property;
pub use value::{Args, FromValue, ToValue, Value, ValueKind};
