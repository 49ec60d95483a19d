//! Mapping between native types and the erased [`Value`] container.
//!
//! Every exposed type implements [`ToValue`] (native → erased, infallible)
//! and usually [`FromValue`] (erased → native, fallible). The built-in
//! scalar implementations live here; user classes and enums get theirs from
//! the [`reflect_class!`] and [`reflect_enum!`] macros.
//!
//! [`reflect_class!`]: crate::reflect_class
//! [`reflect_enum!`]: crate::reflect_enum

use crate::error::{Error, Result};
use crate::value::convert;
use crate::value::{RefKind, Value, ValueKind, ValueRef};

// -----------------------------------------------------------------------------
// ToValue

/// Conversion of a native value into an erased [`Value`].
///
/// `KIND` is the kind tag every instance maps to; `REF_KIND` records how the
/// type refers to its data and drives accessor selection during class
/// declaration.
pub trait ToValue {
    /// The kind tag of the produced [`Value`].
    const KIND: ValueKind;

    /// How this type refers to its data.
    const REF_KIND: RefKind = RefKind::Instance;

    /// Converts by copy. Never fails.
    fn to_value(&self) -> Value;

    /// Converts by reference, producing a [`Value`] that aliases `self`.
    ///
    /// Scalar types have nothing to alias and fall back to a copy.
    ///
    /// # Safety
    ///
    /// The returned [`Value`] must not outlive `self`, and `self` must not
    /// be moved or mutated while the value is alive.
    #[inline]
    unsafe fn to_value_ref(&self) -> Value {
        self.to_value()
    }

    /// Converts by mutable reference.
    ///
    /// # Safety
    ///
    /// Same as [`ToValue::to_value_ref`]; additionally the returned value is
    /// the only access path to `self` while it is alive.
    #[inline]
    unsafe fn to_value_mut(&mut self) -> Value {
        unsafe { self.to_value_ref() }
    }
}

// -----------------------------------------------------------------------------
// FromValue

/// Fallible conversion of an erased [`Value`] back into a native type.
pub trait FromValue: Sized {
    /// The kind tag this type expects; reported as `expected` in
    /// [`Error::BadType`].
    const KIND: ValueKind;

    /// Whether a property of this type accepts assignment.
    ///
    /// `false` for internal-reference binders, which can be read but never
    /// replaced through the erasure layer.
    const WRITABLE: bool = true;

    /// Converts, applying the cross-kind coercion rules.
    ///
    /// # Errors
    ///
    /// [`Error::BadType`] if the value's kind has no conversion path to
    /// `Self` or its payload is out of range.
    fn from_value(value: &Value) -> Result<Self>;

    /// Reports whether [`FromValue::from_value`] would succeed.
    ///
    /// Never fails; any error collapses to `false`.
    #[inline]
    fn can_convert(value: &Value) -> bool {
        Self::from_value(value).is_ok()
    }
}

#[inline]
fn mismatch<T: FromValue>(value: &Value) -> Error {
    Error::BadType {
        provided: value.kind(),
        expected: T::KIND,
    }
}

// -----------------------------------------------------------------------------
// Unit

impl ToValue for () {
    const KIND: ValueKind = ValueKind::None;

    #[inline]
    fn to_value(&self) -> Value {
        Value::None
    }
}

impl FromValue for () {
    const KIND: ValueKind = ValueKind::None;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::None => Ok(()),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

// -----------------------------------------------------------------------------
// Booleans

impl ToValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    #[inline]
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Integer(n) | Value::Long(n) => Ok(convert::integer_to_bool(*n)),
            Value::Real(r) => Ok(convert::real_to_bool(*r)),
            Value::String(s) => convert::parse_bool(s).ok_or_else(|| mismatch::<Self>(value)),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

// -----------------------------------------------------------------------------
// Integers

fn widen_integer<T: FromValue>(value: &Value) -> Result<i64> {
    match value {
        Value::Bool(v) => Ok(convert::bool_to_integer(*v)),
        Value::Integer(n) | Value::Long(n) => Ok(*n),
        Value::Real(r) => Ok(convert::real_to_integer(*r)),
        Value::String(s) => convert::parse_integer(s).ok_or_else(|| mismatch::<T>(value)),
        Value::Enum(e) => Ok(e.value()),
        _ => Err(mismatch::<T>(value)),
    }
}

macro_rules! impl_integer_mapper {
    ($kind:ident, $variant:ident => $($ty:ty),+ $(,)?) => {$(
        impl ToValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            #[inline]
            fn to_value(&self) -> Value {
                Value::$variant(*self as i64)
            }
        }

        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn from_value(value: &Value) -> Result<Self> {
                let wide = widen_integer::<Self>(value)?;
                <$ty>::try_from(wide).map_err(|_| mismatch::<Self>(value))
            }
        }
    )+};
}

impl_integer_mapper!(Integer, Integer => i8, i16, i32, u8, u16, u32);
// 64-bit-range integrals travel as LongInteger.
impl_integer_mapper!(LongInteger, Long => i64, isize);

// The erased container carries a signed 64-bit payload, so unsigned
// values above `i64::MAX` saturate on the way in.
macro_rules! impl_unsigned_long_mapper {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToValue for $ty {
            const KIND: ValueKind = ValueKind::LongInteger;

            #[inline]
            fn to_value(&self) -> Value {
                Value::Long(i64::try_from(*self).unwrap_or(i64::MAX))
            }
        }

        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::LongInteger;

            fn from_value(value: &Value) -> Result<Self> {
                let wide = widen_integer::<Self>(value)?;
                <$ty>::try_from(wide).map_err(|_| mismatch::<Self>(value))
            }
        }
    )+};
}

impl_unsigned_long_mapper!(u64, usize);

// -----------------------------------------------------------------------------
// Reals

macro_rules! impl_real_mapper {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToValue for $ty {
            const KIND: ValueKind = ValueKind::Real;

            #[inline]
            fn to_value(&self) -> Value {
                Value::Real(*self as f64)
            }
        }

        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::Real;

            fn from_value(value: &Value) -> Result<Self> {
                let wide: f64 = match value {
                    Value::Bool(v) => convert::bool_to_integer(*v) as f64,
                    Value::Integer(n) | Value::Long(n) => *n as f64,
                    Value::Real(r) => *r,
                    Value::String(s) => {
                        convert::parse_real(s).ok_or_else(|| mismatch::<Self>(value))?
                    }
                    Value::Enum(e) => e.value() as f64,
                    _ => return Err(mismatch::<Self>(value)),
                };
                Ok(wide as $ty)
            }
        }
    )+};
}

impl_real_mapper!(f32, f64);

// -----------------------------------------------------------------------------
// Strings

impl ToValue for String {
    const KIND: ValueKind = ValueKind::String;

    #[inline]
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for &'static str {
    const KIND: ValueKind = ValueKind::String;

    #[inline]
    fn to_value(&self) -> Value {
        Value::String((*self).to_owned())
    }
}

// No `FromValue` for `&str`: handing out a borrow of a temporary erased
// value is unsound, so conversion out always yields an owned `String`.
impl FromValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v.to_string()),
            Value::Integer(n) | Value::Long(n) => Ok(n.to_string()),
            Value::Real(r) => Ok(r.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::Enum(e) => e.name(),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl ToValue for char {
    const KIND: ValueKind = ValueKind::String;

    #[inline]
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl FromValue for char {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(mismatch::<Self>(value)),
                }
            }
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

// -----------------------------------------------------------------------------
// References to unregistered scalars

macro_rules! impl_reference_mapper {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToValue for *mut $ty {
            const KIND: ValueKind = ValueKind::Reference;
            const REF_KIND: RefKind = RefKind::Pointer;

            fn to_value(&self) -> Value {
                match ValueRef::new(*self) {
                    Some(reference) => Value::Reference(reference),
                    None => Value::None,
                }
            }
        }

        impl FromValue for *mut $ty {
            const KIND: ValueKind = ValueKind::Reference;

            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::Reference(reference) => reference.as_mut_ptr::<$ty>(),
                    Value::None => Ok(core::ptr::null_mut()),
                    _ => Err(mismatch::<Self>(value)),
                }
            }
        }

        impl ToValue for *const $ty {
            const KIND: ValueKind = ValueKind::Reference;
            const REF_KIND: RefKind = RefKind::Pointer;

            fn to_value(&self) -> Value {
                match ValueRef::new_const(*self) {
                    Some(reference) => Value::Reference(reference),
                    None => Value::None,
                }
            }
        }

        impl FromValue for *const $ty {
            const KIND: ValueKind = ValueKind::Reference;

            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::Reference(reference) => reference.as_ptr::<$ty>(),
                    Value::None => Ok(core::ptr::null()),
                    _ => Err(mismatch::<Self>(value)),
                }
            }
        }
    )+};
}

impl_reference_mapper!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, isize, usize);

// -----------------------------------------------------------------------------
// Identity mappings

impl ToValue for crate::object::UserObject {
    const KIND: ValueKind = ValueKind::User;

    #[inline]
    fn to_value(&self) -> Value {
        Value::User(self.clone())
    }
}

impl FromValue for crate::object::UserObject {
    const KIND: ValueKind = ValueKind::User;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::User(object) => Ok(object.clone()),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl ToValue for crate::enums::EnumValue {
    const KIND: ValueKind = ValueKind::Enum;

    #[inline]
    fn to_value(&self) -> Value {
        Value::Enum(self.clone())
    }
}

impl FromValue for crate::enums::EnumValue {
    const KIND: ValueKind = ValueKind::Enum;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Enum(handle) => Ok(handle.clone()),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl ToValue for ValueRef {
    const KIND: ValueKind = ValueKind::Reference;
    const REF_KIND: RefKind = RefKind::Pointer;

    #[inline]
    fn to_value(&self) -> Value {
        Value::Reference(*self)
    }
}

impl FromValue for ValueRef {
    const KIND: ValueKind = ValueKind::Reference;

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Reference(reference) => Ok(*reference),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

// -----------------------------------------------------------------------------
// User class mapping

/// Generates the erasure trait implementations for a reflectable struct.
///
/// The type must be `Clone + 'static`. Implements [`ToValue`], [`FromValue`]
/// and [`UserType`] for the type itself, plus smart-pointer mappings for
/// `Box<T>` so boxed sub-objects bind as internal references.
///
/// Invoking the macro does not register a metaclass; declaration stays
/// explicit through [`Class::declare`].
///
/// # Examples
///
/// ```
/// use loupe_reflect::reflect_class;
///
/// #[derive(Clone)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// reflect_class!(Point);
/// ```
///
/// [`ToValue`]: crate::value::ToValue
/// [`FromValue`]: crate::value::FromValue
/// [`UserType`]: crate::object::UserType
/// [`Class::declare`]: crate::class::Class::declare
#[macro_export]
macro_rules! reflect_class {
    ($ty:ty) => {
        impl $crate::value::ToValue for $ty {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::User;

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::User($crate::object::UserObject::new(
                    ::core::clone::Clone::clone(self),
                ))
            }

            unsafe fn to_value_ref(&self) -> $crate::value::Value {
                $crate::value::Value::User(unsafe { $crate::object::UserObject::from_ref(self) })
            }

            unsafe fn to_value_mut(&mut self) -> $crate::value::Value {
                $crate::value::Value::User(unsafe { $crate::object::UserObject::from_mut(self) })
            }
        }

        impl $crate::value::FromValue for $ty {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::User;

            fn from_value(value: &$crate::value::Value) -> $crate::error::Result<Self> {
                match value {
                    $crate::value::Value::User(object) => object.get::<$ty>(),
                    other => Err($crate::error::Error::BadType {
                        provided: other.kind(),
                        expected: $crate::value::ValueKind::User,
                    }),
                }
            }
        }

        impl $crate::object::UserType for $ty {}

        impl $crate::value::ToValue for ::std::boxed::Box<$ty> {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::User;
            const REF_KIND: $crate::value::RefKind = $crate::value::RefKind::SmartPointer;

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::User($crate::object::UserObject::new(
                    ::core::clone::Clone::clone(&**self),
                ))
            }

            unsafe fn to_value_ref(&self) -> $crate::value::Value {
                $crate::value::Value::User(unsafe { $crate::object::UserObject::from_ref(&**self) })
            }

            unsafe fn to_value_mut(&mut self) -> $crate::value::Value {
                $crate::value::Value::User(unsafe {
                    $crate::object::UserObject::from_mut(&mut **self)
                })
            }
        }

        impl $crate::value::FromValue for ::std::boxed::Box<$ty> {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::User;
            // Owned sub-object pointers are never replaced through the
            // erasure layer.
            const WRITABLE: bool = false;

            fn from_value(value: &$crate::value::Value) -> $crate::error::Result<Self> {
                value.to::<$ty>().map(::std::boxed::Box::new)
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Enum mapping

/// Generates the erasure trait implementations for a unit-only enum.
///
/// The enum must be `Copy + 'static` with variants convertible via `as i64`.
/// Conversion from a string tries the declared value names of the registered
/// [`Enum`] first (when one is registered), then falls back to parsing the
/// string as a number; either way the result must name a listed variant, and
/// a string matching neither is a type mismatch.
///
/// # Examples
///
/// ```
/// use loupe_reflect::reflect_enum;
///
/// #[derive(Copy, Clone, PartialEq, Debug)]
/// enum Color {
///     Red = 0,
///     Green = 1,
///     Blue = 2,
/// }
///
/// reflect_enum!(Color { Red, Green, Blue });
/// ```
///
/// [`Enum`]: crate::enums::Enum
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ty { $($variant:ident),+ $(,)? }) => {
        impl $crate::value::ToValue for $ty {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::Enum;

            fn to_value(&self) -> $crate::value::Value {
                $crate::value::Value::Enum($crate::enums::EnumValue::new::<$ty>(*self as i64))
            }
        }

        impl $crate::value::FromValue for $ty {
            const KIND: $crate::value::ValueKind = $crate::value::ValueKind::Enum;

            fn from_value(value: &$crate::value::Value) -> $crate::error::Result<Self> {
                let number: i64 = match value {
                    $crate::value::Value::Enum(handle) => {
                        if handle.type_id() == ::core::any::TypeId::of::<$ty>() {
                            handle.value()
                        } else {
                            return Err($crate::error::Error::BadType {
                                provided: $crate::value::ValueKind::Enum,
                                expected: $crate::value::ValueKind::Enum,
                            });
                        }
                    }
                    $crate::value::Value::Integer(n) | $crate::value::Value::Long(n) => *n,
                    $crate::value::Value::String(text) => {
                        let named = $crate::enums::Enum::try_by_type::<$ty>()
                            .and_then(|declared| declared.value(text).ok());
                        match named.or_else(|| $crate::value::convert::parse_integer(text)) {
                            Some(number) => number,
                            None => {
                                return Err($crate::error::Error::BadType {
                                    provided: $crate::value::ValueKind::String,
                                    expected: $crate::value::ValueKind::Enum,
                                });
                            }
                        }
                    }
                    other => {
                        return Err($crate::error::Error::BadType {
                            provided: other.kind(),
                            expected: $crate::value::ValueKind::Enum,
                        });
                    }
                };
                match number {
                    $(n if n == <$ty>::$variant as i64 => Ok(<$ty>::$variant),)+
                    _ => Err($crate::error::Error::BadType {
                        provided: value.kind(),
                        expected: $crate::value::ValueKind::Enum,
                    }),
                }
            }
        }

        impl $crate::enums::EnumType for $ty {}
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widening_and_narrowing() {
        let value = Value::from(300_i32);
        assert_eq!(value.to::<i64>().unwrap(), 300);
        assert_eq!(value.to::<u16>().unwrap(), 300);
        // 300 does not fit in a u8.
        assert!(value.to::<u8>().is_err());
        assert!(value.can_convert::<i16>());
        assert!(!value.can_convert::<u8>());
    }

    #[test]
    fn negative_rejects_unsigned() {
        let value = Value::from(-1);
        assert_eq!(value.to::<i8>().unwrap(), -1);
        assert!(value.to::<u32>().is_err());
    }

    #[test]
    fn unsigned_long_saturates_instead_of_wrapping() {
        assert_eq!(Value::from(u64::MAX), Value::Long(i64::MAX));
        assert_eq!(Value::from(7_u64), Value::Long(7));
        assert_eq!(Value::from(7_u64).to::<u64>().unwrap(), 7);
        assert!(Value::from(-1_i64).to::<u64>().is_err());
    }

    #[test]
    fn string_to_number() {
        let value = Value::from("2.5");
        assert_eq!(value.to::<f64>().unwrap(), 2.5);
        assert_eq!(value.to::<i32>().unwrap(), 2);

        assert!(Value::from("nope").to::<i32>().is_err());
    }

    #[test]
    fn number_to_string() {
        assert_eq!(Value::from(42).to::<String>().unwrap(), "42");
        assert_eq!(Value::from(true).to::<String>().unwrap(), "true");
    }

    #[test]
    fn bool_coercions() {
        assert!(Value::from(1).to::<bool>().unwrap());
        assert!(!Value::from(0).to::<bool>().unwrap());
        assert!(Value::from("true").to::<bool>().unwrap());
        assert!(Value::from("0").to::<bool>().is_ok_and(|b| !b));
        assert!(Value::from("maybe").to::<bool>().is_err());
    }

    #[test]
    fn bad_type_reports_both_kinds() {
        let error = Value::None.to::<i32>().unwrap_err();
        assert_eq!(
            error,
            Error::BadType {
                provided: ValueKind::None,
                expected: ValueKind::Integer,
            }
        );
    }

    #[test]
    fn char_round_trip() {
        let value = Value::from('x');
        assert_eq!(value.kind(), ValueKind::String);
        assert_eq!(value.to::<char>().unwrap(), 'x');
        assert!(Value::from("xy").to::<char>().is_err());
    }
}
