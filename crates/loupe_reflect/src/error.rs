//! The error type shared by every fallible operation in the crate.

use core::{error, fmt};

use crate::value::ValueKind;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// An enumeration of every failure the reflection layer can signal.
///
/// All errors are raised synchronously at the point of detection and
/// propagated to the immediate caller; there is no internal retry or
/// recovery. Callers wanting tolerant behavior should use the `try_*`
/// lookup variants or pre-validate (e.g. [`Property::is_writable`]) instead
/// of matching on these.
///
/// [`Property::is_writable`]: crate::property::Property::is_writable
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A metaclass or enum with the same type id or name is already registered.
    AlreadyDeclared { name: String },
    /// No metaclass is registered under the given name or type.
    ClassNotFound { name: String },
    /// No enum is registered under the given name or type.
    EnumNotFound { name: String },
    /// The metaclass has no property with the given name.
    PropertyNotFound { class: String, name: String },
    /// The metaclass has no function with the given name.
    FunctionNotFound { class: String, name: String },
    /// The enum declares no value with the given name.
    EnumValueNotFound { name: String, value: String },
    /// An index-based access was out of bounds.
    OutOfRange { index: usize, size: usize },
    /// An operation was attempted on the `nothing` object handle.
    NullObject,
    /// The property cannot be read.
    ForbiddenRead { property: String },
    /// The property (or the object holder) cannot be written.
    ForbiddenWrite { property: String },
    /// A value of one kind could not be converted to the requested kind.
    BadType {
        provided: ValueKind,
        expected: ValueKind,
    },
    /// A positional call argument could not be converted to the declared
    /// parameter kind.
    BadArgument {
        function: String,
        index: usize,
        provided: ValueKind,
        expected: ValueKind,
    },
    /// A call supplied fewer arguments than the function declares.
    NotEnoughArguments {
        function: String,
        provided: usize,
        expected: usize,
    },
    /// A pointer adjustment was requested between unrelated metaclasses.
    ClassUnrelated { from: String, to: String },
    /// The same base metaclass was attached twice.
    TypeAmbiguity { name: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyDeclared { name } => {
                write!(f, "`{name}` has already been declared")
            }
            Self::ClassNotFound { name } => {
                write!(f, "no metaclass declared for `{name}`")
            }
            Self::EnumNotFound { name } => {
                write!(f, "no enum declared for `{name}`")
            }
            Self::PropertyNotFound { class, name } => {
                write!(f, "metaclass `{class}` has no property `{name}`")
            }
            Self::FunctionNotFound { class, name } => {
                write!(f, "metaclass `{class}` has no function `{name}`")
            }
            Self::EnumValueNotFound { name, value } => {
                write!(f, "enum `{name}` has no value `{value}`")
            }
            Self::OutOfRange { index, size } => {
                write!(f, "index {index} is out of range (size {size})")
            }
            Self::NullObject => {
                write!(f, "operation attempted on the nothing object")
            }
            Self::ForbiddenRead { property } => {
                write!(f, "property `{property}` is not readable")
            }
            Self::ForbiddenWrite { property } => {
                write!(f, "property `{property}` is not writable")
            }
            Self::BadType { provided, expected } => {
                write!(f, "value of kind `{provided}` cannot convert to `{expected}`")
            }
            Self::BadArgument {
                function,
                index,
                provided,
                expected,
            } => {
                write!(
                    f,
                    "argument {index} of `{function}`: kind `{provided}` cannot convert to `{expected}`"
                )
            }
            Self::NotEnoughArguments {
                function,
                provided,
                expected,
            } => {
                write!(
                    f,
                    "`{function}` expects {expected} arguments, {provided} supplied"
                )
            }
            Self::ClassUnrelated { from, to } => {
                write!(f, "metaclasses `{from}` and `{to}` are unrelated")
            }
            Self::TypeAmbiguity { name } => {
                write!(f, "base metaclass `{name}` attached twice")
            }
        }
    }
}

impl error::Error for Error {}
