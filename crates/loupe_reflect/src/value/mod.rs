//! The erased value container and its conversion machinery.

use core::any::TypeId;
use core::cmp::Ordering;
use core::fmt;
use core::ptr::NonNull;

use crate::enums::EnumValue;
use crate::error::{Error, Result};
use crate::object::UserObject;

mod args;
pub mod convert;
mod kind;
mod mapper;

pub use args::Args;
pub use kind::{RefKind, ValueKind};
pub use mapper::{FromValue, ToValue};

// -----------------------------------------------------------------------------
// Value

/// A variant container able to carry any exposed value.
///
/// A `Value` either owns its payload (scalars, strings, enum values, user
/// objects holding a copy) or refers to data living elsewhere (a
/// [`ValueRef`], or a user object bound by reference).
///
/// Conversion to a concrete type goes through [`Value::to`], which applies
/// the cross-kind coercion rules of the [`convert`] module and reports
/// [`Error::BadType`] when no rule applies.
///
/// # Examples
///
/// ```
/// use loupe_reflect::value::{Value, ValueKind};
///
/// let value = Value::from(42);
/// assert_eq!(value.kind(), ValueKind::Integer);
/// assert_eq!(value.to::<String>().unwrap(), "42");
/// assert_eq!(value.to::<f64>().unwrap(), 42.0);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    None,
    Bool(bool),
    Integer(i64),
    /// Distinguished from [`Value::Integer`] to keep the full 64-bit range
    /// explicit at the API surface; both carry an `i64` payload.
    Long(i64),
    Real(f64),
    String(String),
    Enum(EnumValue),
    Reference(ValueRef),
    User(UserObject),
}

impl Value {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Integer(_) => ValueKind::Integer,
            Self::Long(_) => ValueKind::LongInteger,
            Self::Real(_) => ValueKind::Real,
            Self::String(_) => ValueKind::String,
            Self::Enum(_) => ValueKind::Enum,
            Self::Reference(_) => ValueKind::Reference,
            Self::User(_) => ValueKind::User,
        }
    }

    /// Returns `true` if this is the empty value.
    #[inline]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Converts this value to the concrete type `T`.
    ///
    /// # Errors
    ///
    /// [`Error::BadType`] if no conversion rule maps this value's kind to
    /// `T`, or the payload is out of range for `T`.
    #[inline]
    pub fn to<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Returns `true` if [`Value::to`] would succeed for `T`.
    #[inline]
    pub fn can_convert<T: FromValue>(&self) -> bool {
        T::can_convert(self)
    }
}

impl<T: ToValue> From<T> for Value {
    #[inline]
    fn from(value: T) -> Self {
        value.to_value()
    }
}

impl PartialOrd for Value {
    /// Orders same-kind values by payload; values of different kinds fall
    /// back to the kind tag order of [`ValueKind`].
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.partial_cmp(b),
            (Self::Long(a), Self::Long(b)) => a.partial_cmp(b),
            (Self::Real(a), Self::Real(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => a.partial_cmp(b),
            (Self::Enum(a), Self::Enum(b)) => a.partial_cmp(b),
            (Self::Reference(a), Self::Reference(b)) => a.partial_cmp(b),
            (Self::User(a), Self::User(b)) => a.partial_cmp(b),
            _ => self.kind().partial_cmp(&other.kind()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::Integer(v) | Self::Long(v) => fmt::Display::fmt(v, f),
            Self::Real(v) => fmt::Display::fmt(v, f),
            Self::String(v) => f.write_str(v),
            Self::Enum(v) => fmt::Display::fmt(&v.value(), f),
            Self::Reference(v) => write!(f, "{:p}", v.ptr),
            Self::User(_) => f.write_str("[object]"),
        }
    }
}

// -----------------------------------------------------------------------------
// ValueRef

/// A type-tagged raw pointer to a value of an unregistered type.
///
/// Pointers to scalar data cross the erasure boundary as references instead
/// of copies. Creating a `ValueRef` is safe; dereferencing one requires the
/// caller to vouch for the pointee's liveness through the `unsafe` access
/// methods.
#[derive(Copy, Clone, Debug)]
pub struct ValueRef {
    ptr: NonNull<u8>,
    id: TypeId,
    writable: bool,
}

impl ValueRef {
    /// Wraps a mutable pointer. Returns `None` for a null pointer.
    pub fn new<T: 'static>(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr.cast::<u8>()).map(|ptr| Self {
            ptr,
            id: TypeId::of::<T>(),
            writable: true,
        })
    }

    /// Wraps a const pointer. Returns `None` for a null pointer.
    pub fn new_const<T: 'static>(ptr: *const T) -> Option<Self> {
        NonNull::new(ptr.cast_mut().cast::<u8>()).map(|ptr| Self {
            ptr,
            id: TypeId::of::<T>(),
            writable: false,
        })
    }

    /// The [`TypeId`] of the pointee.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns `true` if the reference permits writes through it.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Recovers the pointer as `*const T`.
    ///
    /// # Errors
    ///
    /// [`Error::BadType`] if the pointee is not a `T`.
    pub fn as_ptr<T: 'static>(&self) -> Result<*const T> {
        if self.id == TypeId::of::<T>() {
            Ok(self.ptr.as_ptr().cast_const().cast::<T>())
        } else {
            Err(Error::BadType {
                provided: ValueKind::Reference,
                expected: ValueKind::Reference,
            })
        }
    }

    /// Recovers the pointer as `*mut T`.
    ///
    /// # Errors
    ///
    /// [`Error::BadType`] if the pointee is not a `T`;
    /// [`Error::ForbiddenWrite`] if the reference was built from a const
    /// pointer.
    pub fn as_mut_ptr<T: 'static>(&self) -> Result<*mut T> {
        if !self.writable {
            return Err(Error::ForbiddenWrite {
                property: String::from("<reference>"),
            });
        }
        self.as_ptr::<T>().map(<*const T>::cast_mut)
    }

    /// Borrows the pointee.
    ///
    /// # Safety
    ///
    /// The pointee must be live and not mutably aliased for the duration of
    /// the returned borrow.
    pub unsafe fn deref<T: 'static>(&self) -> Result<&T> {
        self.as_ptr::<T>().map(|ptr| unsafe { &*ptr })
    }
}

impl PartialEq for ValueRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.id == other.id
    }
}

impl PartialOrd for ValueRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.ptr.as_ptr().partial_cmp(&other.ptr.as_ptr())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Value, ValueKind, ValueRef};

    #[test]
    fn kind_tags() {
        assert_eq!(Value::None.kind(), ValueKind::None);
        assert_eq!(Value::from(true).kind(), ValueKind::Boolean);
        assert_eq!(Value::from(3_i32).kind(), ValueKind::Integer);
        assert_eq!(Value::from(3_i64).kind(), ValueKind::LongInteger);
        assert_eq!(Value::from(1.5).kind(), ValueKind::Real);
        assert_eq!(Value::from("hi").kind(), ValueKind::String);
    }

    #[test]
    fn same_kind_ordering() {
        assert!(Value::from(1) < Value::from(2));
        assert!(Value::from("a") < Value::from("b"));
    }

    #[test]
    fn cross_kind_ordering_uses_kind_tag() {
        // Boolean sorts before Integer regardless of payload.
        assert!(Value::from(true) < Value::from(0));
        assert!(Value::None < Value::from(false));
    }

    #[test]
    fn cross_kind_equality_is_false() {
        assert_ne!(Value::from(2_i32), Value::from(2_i64));
        assert_ne!(Value::from(1), Value::from(1.0));
    }

    #[test]
    fn reference_round_trip() {
        let mut x = 7_i32;
        let value = Value::from(&raw mut x);
        assert_eq!(value.kind(), ValueKind::Reference);

        let back = value.to::<*mut i32>().unwrap();
        unsafe { *back = 8 };
        assert_eq!(x, 8);
    }

    #[test]
    fn null_pointer_becomes_nothing() {
        let value = Value::from(core::ptr::null_mut::<i32>());
        assert!(value.is_nothing());
    }

    #[test]
    fn const_reference_rejects_writes() {
        let x = 7_i32;
        let reference = ValueRef::new_const(&raw const x).unwrap();
        assert!(!reference.is_writable());
        assert!(reference.as_mut_ptr::<i32>().is_err());
        assert_eq!(unsafe { reference.deref::<i32>() }.unwrap(), &7);
    }
}
