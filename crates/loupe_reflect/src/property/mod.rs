//! The property abstraction: named, typed member access through erased
//! handles.

use crate::error::{Error, Result};
use crate::object::{UserObject, UserType};
use crate::value::{FromValue, ToValue, Value, ValueKind};

mod array;
mod simple;

pub use array::{ArrayAdapter, ArrayView};

use array::ArrayProperty;
use simple::{GetSetProperty, RefProperty};

pub(crate) use array::ArrayAccessor;

// -----------------------------------------------------------------------------
// AccessKind

/// The access policy a property resolved to when it was built.
///
/// Selected from the accessor's exposed type: enums before user types, and
/// array-shaped members before user types, so a container of registered
/// elements binds structurally instead of as one nested object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Scalar copy-in/copy-out binding.
    Simple,
    /// Scalar binding validated against a registered enum.
    Enum,
    /// Array-like binding with per-element structural access.
    Container,
    /// Nested reflectable object.
    User,
}

// -----------------------------------------------------------------------------
// Accessor

/// The erased get/set contract a property dispatches to.
pub(crate) trait Accessor: Send + Sync + 'static {
    fn get(&self, object: &UserObject) -> Result<Value>;
    fn set(&self, object: &UserObject, value: &Value) -> Result<()>;
    /// Like `get`, but yields a writable alias when the binding can
    /// produce one. Copying accessors fall back to a plain read; the
    /// caller has already checked that the handle allows writes.
    fn get_writable(&self, object: &UserObject) -> Result<Value> {
        self.get(object)
    }
    fn as_array(&self) -> Option<&dyn ArrayAccessor> {
        None
    }
}

// -----------------------------------------------------------------------------
// Property

/// A named, typed member of a metaclass.
///
/// Carries the member's value kind, its resolved [`AccessKind`] and
/// readable/writable flags over an erased accessor. All access goes through
/// a [`UserObject`]; the `nothing` handle is rejected up front.
pub struct Property {
    name: String,
    kind: ValueKind,
    access: AccessKind,
    readable: bool,
    writable: bool,
    accessor: Box<dyn Accessor>,
}

impl Property {
    /// The property name, unique within its metaclass.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of the exposed value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The access policy this property was built with.
    #[inline]
    pub fn access_kind(&self) -> AccessKind {
        self.access
    }

    /// Returns `true` if [`Property::get`] is allowed.
    #[inline]
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Returns `true` if [`Property::set`] can succeed on a writable
    /// handle.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Reads the member from `object`.
    ///
    /// Container properties have no value form and read as [`Value::None`];
    /// their elements are accessed through [`Property::array_view`].
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle; [`Error::ForbiddenRead`]
    /// for a non-readable property; conversion errors from the accessor.
    pub fn get(&self, object: &UserObject) -> Result<Value> {
        if object.is_nothing() {
            return Err(Error::NullObject);
        }
        if !self.readable {
            return Err(Error::ForbiddenRead {
                property: self.name.clone(),
            });
        }
        if self.access == AccessKind::Container {
            return Ok(Value::None);
        }
        self.accessor.get(object)
    }

    /// Reads the member for serialization purposes.
    ///
    /// Identical to [`Property::get`]; kept separate so archive walkers
    /// have a single hook for value normalization.
    #[inline]
    pub fn get_for_serialization(&self, object: &UserObject) -> Result<Value> {
        self.get(object)
    }

    /// Reads the member for deserialization purposes.
    ///
    /// Reference bindings on a writable handle yield a writable alias
    /// instead of the read-only one [`Property::get`] produces, so a
    /// loader can fill a nested object in place before storing it back.
    /// Copying bindings read as usual; the loader's follow-up
    /// [`Property::set`] covers them.
    ///
    /// # Errors
    ///
    /// Same as [`Property::get`].
    pub fn get_for_deserialization(&self, object: &UserObject) -> Result<Value> {
        if object.is_nothing() {
            return Err(Error::NullObject);
        }
        if !self.readable {
            return Err(Error::ForbiddenRead {
                property: self.name.clone(),
            });
        }
        if self.access == AccessKind::Container {
            return Ok(Value::None);
        }
        if self.writable && object.is_writable() {
            self.accessor.get_writable(object)
        } else {
            self.accessor.get(object)
        }
    }

    /// Writes the member on `object`, converting `value` first.
    ///
    /// Conversion happens before any mutation, so a failed set leaves the
    /// instance untouched.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle; [`Error::ForbiddenWrite`]
    /// for a non-writable property or a const-reference holder;
    /// [`Error::BadType`] when `value` cannot convert to the member type.
    pub fn set(&self, object: &UserObject, value: &Value) -> Result<()> {
        if object.is_nothing() {
            return Err(Error::NullObject);
        }
        object.ensure_writable(&self.name)?;
        if !self.writable {
            return Err(Error::ForbiddenWrite {
                property: self.name.clone(),
            });
        }
        if self.access == AccessKind::Container {
            return Err(Error::BadType {
                provided: value.kind(),
                expected: ValueKind::Array,
            });
        }
        self.accessor.set(object, value)
    }

    /// Opens structural element access on a container property.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle; [`Error::BadType`] if
    /// the property is not a container.
    pub fn array_view<'a>(&'a self, object: &'a UserObject) -> Result<ArrayView<'a>> {
        if object.is_nothing() {
            return Err(Error::NullObject);
        }
        match self.accessor.as_array() {
            Some(accessor) => Ok(ArrayView::new(self, accessor, object)),
            None => Err(Error::BadType {
                provided: self.kind,
                expected: ValueKind::Array,
            }),
        }
    }

    // -- factories -----------------------------------------------------------

    /// A read-only property over a copying getter.
    pub fn read_only<T, V, G>(name: impl Into<String>, get: G) -> Self
    where
        T: UserType,
        V: ToValue + FromValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: <V as ToValue>::KIND,
            access: access_kind_of(<V as ToValue>::KIND),
            readable: true,
            writable: false,
            accessor: Box::new(GetSetProperty::<T, V>::new(get, None)),
        }
    }

    /// A read-write property over a copying getter/setter pair.
    pub fn read_write<T, V, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        T: UserType,
        V: ToValue + FromValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: <V as ToValue>::KIND,
            access: access_kind_of(<V as ToValue>::KIND),
            readable: true,
            writable: <V as FromValue>::WRITABLE,
            accessor: Box::new(GetSetProperty::<T, V>::new(get, Some(Box::new(set)))),
        }
    }

    /// A property bound to a field through live references.
    ///
    /// Reads of user-kind members yield an internal reference into the
    /// instance instead of a copy; writes assign through the mutable
    /// reference. Internal-reference member types (`Box`ed sub-objects)
    /// bind read-only.
    pub fn by_ref<T, V, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: UserType,
        V: ToValue + FromValue + 'static,
        G: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: <V as ToValue>::KIND,
            access: access_kind_of(<V as ToValue>::KIND),
            readable: true,
            writable: <V as FromValue>::WRITABLE,
            accessor: Box::new(RefProperty::<T, V>::new(get, get_mut)),
        }
    }

    /// A container property over an array-like field.
    pub fn array<T, A, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: UserType,
        A: ArrayAdapter,
        G: for<'a> Fn(&'a T) -> &'a A + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut A + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: ValueKind::Array,
            access: AccessKind::Container,
            readable: true,
            writable: true,
            accessor: Box::new(ArrayProperty::<T, A>::new(get, get_mut)),
        }
    }
}

/// Resolves the access policy from a member's value kind. Enums and arrays
/// are matched before the generic user-type case.
fn access_kind_of(kind: ValueKind) -> AccessKind {
    match kind {
        ValueKind::Enum => AccessKind::Enum,
        ValueKind::Array => AccessKind::Container,
        ValueKind::User => AccessKind::User,
        _ => AccessKind::Simple,
    }
}

impl core::fmt::Debug for Property {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("access", &self.access)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{AccessKind, Property};
    use crate::error::Error;
    use crate::object::UserObject;
    use crate::value::{Value, ValueKind};

    #[derive(Clone, Debug, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
    }
    crate::reflect_class!(Point);

    fn x_property() -> Property {
        Property::read_write("x", |p: &Point| p.x, |p: &mut Point, x| p.x = x)
    }

    #[test]
    fn get_and_set_by_copy() {
        let property = x_property();
        assert_eq!(property.kind(), ValueKind::Real);
        assert_eq!(property.access_kind(), AccessKind::Simple);
        assert!(property.is_readable());
        assert!(property.is_writable());

        let mut point = Point { x: 1.0, y: 2.0 };
        let object = unsafe { UserObject::from_mut(&mut point) };
        assert_eq!(property.get(&object).unwrap(), Value::Real(1.0));

        property.set(&object, &Value::from(3)).unwrap();
        drop(object);
        assert_eq!(point.x, 3.0);
    }

    #[test]
    fn ref_binding_assigns_through_the_field() {
        let property = Property::by_ref("y", |p: &Point| &p.y, |p: &mut Point| &mut p.y);

        let mut point = Point { x: 0.0, y: 5.0 };
        let object = unsafe { UserObject::from_mut(&mut point) };
        assert_eq!(property.get(&object).unwrap(), Value::Real(5.0));
        property.set(&object, &Value::from("6.5")).unwrap();
        drop(object);
        assert_eq!(point.y, 6.5);
    }

    #[test]
    fn read_only_rejects_writes() {
        let property = Property::read_only("x", |p: &Point| p.x);
        assert!(!property.is_writable());

        let mut point = Point { x: 1.0, y: 2.0 };
        let object = unsafe { UserObject::from_mut(&mut point) };
        assert!(matches!(
            property.set(&object, &Value::from(9)),
            Err(Error::ForbiddenWrite { .. })
        ));
    }

    #[test]
    fn const_holder_rejects_writes() {
        let property = x_property();
        let point = Point { x: 1.0, y: 2.0 };
        let object = unsafe { UserObject::from_ref(&point) };
        assert!(matches!(
            property.set(&object, &Value::from(9)),
            Err(Error::ForbiddenWrite { .. })
        ));
        // Reading stays allowed.
        assert_eq!(property.get(&object).unwrap(), Value::Real(1.0));
    }

    #[test]
    fn nothing_handle_is_rejected() {
        let property = x_property();
        let object = UserObject::nothing();
        assert_eq!(property.get(&object).unwrap_err(), Error::NullObject);
        assert_eq!(
            property.set(&object, &Value::from(1)).unwrap_err(),
            Error::NullObject
        );
    }

    #[test]
    fn failed_conversion_leaves_instance_untouched() {
        let property = x_property();
        let mut point = Point { x: 1.0, y: 2.0 };
        let object = unsafe { UserObject::from_mut(&mut point) };
        assert!(matches!(
            property.set(&object, &Value::from("not a number")),
            Err(Error::BadType { .. })
        ));
        drop(object);
        assert_eq!(point.x, 1.0);
    }

    #[test]
    fn nested_object_reads_as_internal_reference() {
        #[derive(Clone, Debug, PartialEq)]
        struct Line {
            start: Point,
        }
        crate::reflect_class!(Line);

        let property = Property::by_ref(
            "start",
            |l: &Line| &l.start,
            |l: &mut Line| &mut l.start,
        );
        assert_eq!(property.access_kind(), AccessKind::User);

        let mut line = Line {
            start: Point { x: 1.0, y: 2.0 },
        };
        let object = unsafe { UserObject::from_mut(&mut line) };
        let value = property.get(&object).unwrap();
        // The nested value aliases the instance rather than copying it.
        let nested = value.to::<UserObject>().unwrap();
        assert_eq!(nested.pointer().unwrap(), object.pointer().unwrap());
        assert_eq!(nested.get::<Point>().unwrap(), Point { x: 1.0, y: 2.0 });
    }

    #[test]
    fn deserialization_alias_of_ref_member_is_writable() {
        #[derive(Clone, Debug, PartialEq)]
        struct Segment {
            end: Point,
        }
        crate::reflect_class!(Segment);

        let end = Property::by_ref("end", |s: &Segment| &s.end, |s: &mut Segment| &mut s.end);

        let mut segment = Segment {
            end: Point { x: 0.0, y: 0.0 },
        };
        let object = unsafe { UserObject::from_mut(&mut segment) };
        let value = end.get_for_deserialization(&object).unwrap();
        let nested = value.to::<UserObject>().unwrap();
        // A plain `get` would hand back a read-only alias here.
        x_property().set(&nested, &Value::from(4)).unwrap();
        drop(nested);
        drop(value);
        drop(object);
        assert_eq!(segment.end.x, 4.0);
    }
}
