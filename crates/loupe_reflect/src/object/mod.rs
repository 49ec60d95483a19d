//! The type-erased object handle.

use core::any::{Any, TypeId, type_name};
use core::cmp::Ordering;
use core::fmt;
use core::ptr::NonNull;
use std::sync::{Arc, OnceLock};

use crate::class::Class;
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// UserType

/// Marker for struct types exposed through the erasure layer.
///
/// Implemented by the [`reflect_class!`] macro; not meant to be implemented
/// by hand. `Clone` is required because erased values cross the boundary by
/// copy unless explicitly bound by reference.
///
/// [`reflect_class!`]: crate::reflect_class
pub trait UserType: Any + Clone {}

// -----------------------------------------------------------------------------
// UserObject

/// A type-erased handle to an instance of a reflectable type.
///
/// The handle either owns a copy of the instance or references one living
/// elsewhere; clones share the same underlying holder. A distinct `nothing`
/// state exists and is reported by every accessor as [`Error::NullObject`].
///
/// The instance's metaclass is resolved lazily on first metadata access and
/// cached, so handles can be created before (or without) declaring the
/// class.
///
/// Lifetime is caller-managed: dropping a handle built over an external
/// reference never touches the instance, and instances produced by
/// [`ObjectFactory`] stay alive until explicitly destroyed.
///
/// [`ObjectFactory`]: crate::runtime::ObjectFactory
#[derive(Clone)]
pub struct UserObject {
    inner: Option<Arc<Inner>>,
    /// Keep-alive for internal references: the holder of the instance this
    /// handle points into, when the handle was produced by a member read.
    parent: Option<Arc<Inner>>,
}

struct Inner {
    id: TypeId,
    type_name: &'static str,
    class: OnceLock<Arc<Class>>,
    holder: Holder,
}

enum Holder {
    /// Owns a heap copy, dropped with the last handle.
    Owned {
        data: NonNull<u8>,
        drop: unsafe fn(NonNull<u8>),
    },
    /// References a mutable instance owned elsewhere.
    Ref(NonNull<u8>),
    /// References a const instance owned elsewhere.
    ConstRef(NonNull<u8>),
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Holder::Owned { data, drop } = self.holder {
            // SAFETY: `data` came from `Box::leak` in `UserObject::new` and
            // is dropped exactly once, by the last handle.
            unsafe { drop(data) };
        }
    }
}

unsafe fn drop_boxed<T>(data: NonNull<u8>) {
    // SAFETY: per caller, `data` is the leaked `Box<T>` allocation.
    drop(unsafe { Box::from_raw(data.as_ptr().cast::<T>()) });
}

impl UserObject {
    /// The empty handle.
    #[inline]
    pub const fn nothing() -> Self {
        Self {
            inner: None,
            parent: None,
        }
    }

    /// Wraps a copy of `value`; the copy lives as long as the last clone of
    /// the handle.
    pub fn new<T: UserType>(value: T) -> Self {
        let data = NonNull::from(Box::leak(Box::new(value))).cast::<u8>();
        Self::with_holder::<T>(Holder::Owned {
            data,
            drop: drop_boxed::<T>,
        })
    }

    /// Wraps `value` by const reference, without copying.
    ///
    /// # Safety
    ///
    /// `value` must outlive the handle and every clone of it, and must not
    /// be moved or mutated elsewhere while any of them is used.
    pub unsafe fn from_ref<T: UserType>(value: &T) -> Self {
        Self::with_holder::<T>(Holder::ConstRef(NonNull::from(value).cast::<u8>()))
    }

    /// Wraps `value` by mutable reference, without copying.
    ///
    /// # Safety
    ///
    /// Same contract as [`UserObject::from_ref`]; additionally the handles
    /// are the only access path to `value` while any of them is used.
    pub unsafe fn from_mut<T: UserType>(value: &mut T) -> Self {
        Self::with_holder::<T>(Holder::Ref(NonNull::from(value).cast::<u8>()))
    }

    fn with_holder<T: UserType>(holder: Holder) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                class: OnceLock::new(),
                holder,
            })),
            parent: None,
        }
    }

    /// Wraps the instance behind `pointer`, whose type is described by
    /// `class`.
    ///
    /// The handle references the instance without owning it.
    ///
    /// # Safety
    ///
    /// `pointer` must address a live, mutable instance of exactly the type
    /// `class` describes, outliving the handle and all clones.
    pub unsafe fn from_pointer(class: Arc<Class>, pointer: NonNull<u8>) -> Self {
        let resolved = OnceLock::new();
        let id = class.type_id();
        let name = class.static_type_name();
        let _ = resolved.set(class);
        Self {
            inner: Some(Arc::new(Inner {
                id,
                type_name: name,
                class: resolved,
                holder: Holder::Ref(pointer),
            })),
            parent: None,
        }
    }

    /// Records `parent` as the owner of the instance this handle aliases,
    /// keeping an owned parent alive while this handle (or a clone) exists.
    pub(crate) fn adopt(&mut self, parent: &UserObject) {
        self.parent = parent.inner.clone().or_else(|| parent.parent.clone());
    }

    /// Returns `true` if this is the empty handle.
    #[inline]
    pub fn is_nothing(&self) -> bool {
        self.inner.is_none()
    }

    /// The [`TypeId`] of the held instance, or `None` for the empty handle.
    pub fn type_id(&self) -> Option<TypeId> {
        self.inner.as_ref().map(|inner| inner.id)
    }

    /// Resolves the metaclass of the held instance, caching the result.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle; [`Error::ClassNotFound`]
    /// if the instance's type was never declared.
    pub fn class(&self) -> Result<Arc<Class>> {
        let inner = self.inner()?;
        if let Some(class) = inner.class.get() {
            return Ok(Arc::clone(class));
        }
        let class = Class::try_by_id(inner.id).ok_or_else(|| Error::ClassNotFound {
            name: inner.type_name.to_owned(),
        })?;
        Ok(Arc::clone(inner.class.get_or_init(|| class)))
    }

    /// The address of the held instance.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle.
    pub fn pointer(&self) -> Result<NonNull<u8>> {
        Ok(self.inner()?.data())
    }

    /// Returns `true` if the held instance may be mutated through this
    /// handle. Const-reference holders and the empty handle report `false`.
    pub fn is_writable(&self) -> bool {
        match &self.inner {
            Some(inner) => !matches!(inner.holder, Holder::ConstRef(_)),
            None => false,
        }
    }

    /// Copies the held instance out as a `T`.
    ///
    /// The handle may hold a `T` or an instance of a class derived from it;
    /// the pointer is adjusted through the metaclass base offsets.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle; [`Error::ClassUnrelated`]
    /// or [`Error::ClassNotFound`] when the held type does not relate to
    /// `T`.
    pub fn get<T: UserType>(&self) -> Result<T> {
        let pointer = self.pointer_as::<T>()?;
        // SAFETY: construction guaranteed a live instance and `pointer_as`
        // adjusted the address to a valid `T`.
        Ok(unsafe { pointer.as_ref() }.clone())
    }

    /// Resolves the address of the held instance viewed as a `T`, applying
    /// base-class offsets when the held type derives from `T`.
    pub(crate) fn pointer_as<T: UserType>(&self) -> Result<NonNull<T>> {
        let inner = self.inner()?;
        let pointer = inner.data();
        if inner.id == TypeId::of::<T>() {
            return Ok(pointer.cast::<T>());
        }
        let target = Class::by_type::<T>()?;
        let class = self.class()?;
        class
            .apply_offset(pointer, &target)
            .map(NonNull::cast::<T>)
    }

    pub(crate) fn ensure_writable(&self, property: &str) -> Result<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(Error::ForbiddenWrite {
                property: property.to_owned(),
            })
        }
    }

    fn inner(&self) -> Result<&Inner> {
        self.inner.as_deref().ok_or(Error::NullObject)
    }
}

impl Inner {
    fn data(&self) -> NonNull<u8> {
        match self.holder {
            Holder::Owned { data, .. } => data,
            Holder::Ref(pointer) | Holder::ConstRef(pointer) => pointer,
        }
    }
}

impl Default for UserObject {
    #[inline]
    fn default() -> Self {
        Self::nothing()
    }
}

impl PartialEq for UserObject {
    /// Handles are equal when they refer to the same instance of the same
    /// type; two empty handles are equal.
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => a.id == b.id && a.data() == b.data(),
            (None, None) => true,
            _ => false,
        }
    }
}

impl PartialOrd for UserObject {
    /// Orders by instance address; the empty handle sorts first.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let address =
            |inner: &Option<Arc<Inner>>| inner.as_ref().map(|i| i.data().as_ptr() as usize);
        address(&self.inner).partial_cmp(&address(&other.inner))
    }
}

impl fmt::Debug for UserObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("UserObject")
                .field("type", &inner.type_name)
                .field("data", &inner.data())
                .finish(),
            None => f.write_str("UserObject(nothing)"),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::UserObject;
    use crate::error::Error;

    #[derive(Clone, Debug, PartialEq)]
    struct Sample {
        n: i32,
    }
    crate::reflect_class!(Sample);

    #[test]
    fn nothing_reports_null_object() {
        let object = UserObject::nothing();
        assert!(object.is_nothing());
        assert!(!object.is_writable());
        assert_eq!(object.pointer().unwrap_err(), Error::NullObject);
        assert_eq!(object.get::<Sample>().unwrap_err(), Error::NullObject);
    }

    #[test]
    fn owned_copy_round_trip() {
        let object = UserObject::new(Sample { n: 5 });
        assert!(!object.is_nothing());
        assert!(object.is_writable());
        // Exact-type extraction works without any declared metaclass.
        assert_eq!(object.get::<Sample>().unwrap(), Sample { n: 5 });
    }

    #[test]
    fn clones_share_the_holder() {
        let object = UserObject::new(Sample { n: 1 });
        let other = object.clone();
        assert_eq!(object, other);
        assert_eq!(object.pointer().unwrap(), other.pointer().unwrap());
    }

    #[test]
    fn const_reference_is_read_only() {
        let sample = Sample { n: 3 };
        let object = unsafe { UserObject::from_ref(&sample) };
        assert!(!object.is_writable());
        assert!(object.ensure_writable("n").is_err());
        assert_eq!(object.get::<Sample>().unwrap(), Sample { n: 3 });
    }

    #[test]
    fn mutable_reference_sees_source() {
        let mut sample = Sample { n: 3 };
        let object = unsafe { UserObject::from_mut(&mut sample) };
        assert!(object.is_writable());
        assert_eq!(object.get::<Sample>().unwrap().n, 3);
        drop(object);
        sample.n = 4;
    }

    #[test]
    fn distinct_instances_compare_unequal() {
        let a = UserObject::new(Sample { n: 1 });
        let b = UserObject::new(Sample { n: 1 });
        assert_ne!(a, b);
        assert_eq!(UserObject::nothing(), UserObject::nothing());
    }
}
