//! Structural access to array-like members.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::object::{UserObject, UserType};
use crate::property::{Accessor, Property};
use crate::value::{FromValue, ToValue, Value, ValueKind};

// -----------------------------------------------------------------------------
// ArrayAdapter

/// The container contract array properties bind to.
///
/// Implemented for `Vec`, `VecDeque` and fixed-size arrays; consumers can
/// implement it for custom collections. Fixed-size containers report
/// `DYNAMIC = false`, turning insert/remove/resize into no-ops.
pub trait ArrayAdapter: 'static {
    /// The exposed element type.
    type Element: ToValue + FromValue + 'static;

    /// Whether insert/remove/resize change the container size.
    const DYNAMIC: bool;

    fn size(&self) -> usize;
    fn element(&self, index: usize) -> Option<&Self::Element>;
    fn element_mut(&mut self, index: usize) -> Option<&mut Self::Element>;
    fn insert(&mut self, index: usize, element: Self::Element);
    fn remove(&mut self, index: usize);
    fn resize(&mut self, new_size: usize);
}

impl<E: ToValue + FromValue + Default + 'static> ArrayAdapter for Vec<E> {
    type Element = E;
    const DYNAMIC: bool = true;

    fn size(&self) -> usize {
        self.len()
    }

    fn element(&self, index: usize) -> Option<&E> {
        self.get(index)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut E> {
        self.get_mut(index)
    }

    fn insert(&mut self, index: usize, element: E) {
        Vec::insert(self, index, element);
    }

    fn remove(&mut self, index: usize) {
        Vec::remove(self, index);
    }

    fn resize(&mut self, new_size: usize) {
        self.resize_with(new_size, E::default);
    }
}

impl<E: ToValue + FromValue + Default + 'static> ArrayAdapter for VecDeque<E> {
    type Element = E;
    const DYNAMIC: bool = true;

    fn size(&self) -> usize {
        self.len()
    }

    fn element(&self, index: usize) -> Option<&E> {
        self.get(index)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut E> {
        self.get_mut(index)
    }

    fn insert(&mut self, index: usize, element: E) {
        VecDeque::insert(self, index, element);
    }

    fn remove(&mut self, index: usize) {
        VecDeque::remove(self, index);
    }

    fn resize(&mut self, new_size: usize) {
        VecDeque::resize_with(self, new_size, E::default);
    }
}

impl<E: ToValue + FromValue + 'static, const N: usize> ArrayAdapter for [E; N] {
    type Element = E;
    const DYNAMIC: bool = false;

    fn size(&self) -> usize {
        N
    }

    fn element(&self, index: usize) -> Option<&E> {
        self.get(index)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut E> {
        self.get_mut(index)
    }

    // Fixed-size storage: size-changing operations are no-ops.
    fn insert(&mut self, _index: usize, _element: E) {}

    fn remove(&mut self, _index: usize) {}

    fn resize(&mut self, _new_size: usize) {}
}

// -----------------------------------------------------------------------------
// ArrayAccessor

/// The erased element-access contract behind a container property.
pub(crate) trait ArrayAccessor: Send + Sync {
    fn element_kind(&self) -> ValueKind;
    fn dynamic(&self) -> bool;
    fn size(&self, object: &UserObject) -> Result<usize>;
    fn element(&self, object: &UserObject, index: usize) -> Result<Value>;
    fn set_element(&self, object: &UserObject, index: usize, value: &Value) -> Result<()>;
    fn insert_element(&self, object: &UserObject, index: usize, value: &Value) -> Result<()>;
    fn remove_element(&self, object: &UserObject, index: usize) -> Result<()>;
    fn resize(&self, object: &UserObject, new_size: usize) -> Result<()>;
}

// -----------------------------------------------------------------------------
// ArrayProperty

pub(crate) struct ArrayProperty<T, A> {
    getter: Box<dyn for<'a> Fn(&'a T) -> &'a A + Send + Sync>,
    getter_mut: Box<dyn for<'a> Fn(&'a mut T) -> &'a mut A + Send + Sync>,
}

impl<T, A> ArrayProperty<T, A> {
    pub(crate) fn new(
        getter: impl for<'a> Fn(&'a T) -> &'a A + Send + Sync + 'static,
        getter_mut: impl for<'a> Fn(&'a mut T) -> &'a mut A + Send + Sync + 'static,
    ) -> Self {
        Self {
            getter: Box::new(getter),
            getter_mut: Box::new(getter_mut),
        }
    }

    fn with_container<R>(
        &self,
        object: &UserObject,
        read: impl FnOnce(&A) -> Result<R>,
    ) -> Result<R>
    where
        T: UserType,
    {
        let pointer = object.pointer_as::<T>()?;
        // SAFETY: live instance per the handle contract.
        read((self.getter)(unsafe { pointer.as_ref() }))
    }

    fn with_container_mut<R>(
        &self,
        object: &UserObject,
        mutate: impl FnOnce(&mut A) -> Result<R>,
    ) -> Result<R>
    where
        T: UserType,
    {
        let mut pointer = object.pointer_as::<T>()?;
        // SAFETY: live instance; holder writability checked by the caller.
        mutate((self.getter_mut)(unsafe { pointer.as_mut() }))
    }
}

impl<T, A> Accessor for ArrayProperty<T, A>
where
    T: UserType,
    A: ArrayAdapter,
{
    fn get(&self, _object: &UserObject) -> Result<Value> {
        // Containers have no value form.
        Ok(Value::None)
    }

    fn set(&self, _object: &UserObject, value: &Value) -> Result<()> {
        Err(Error::BadType {
            provided: value.kind(),
            expected: ValueKind::Array,
        })
    }

    fn as_array(&self) -> Option<&dyn ArrayAccessor> {
        Some(self)
    }
}

impl<T, A> ArrayAccessor for ArrayProperty<T, A>
where
    T: UserType,
    A: ArrayAdapter,
{
    fn element_kind(&self) -> ValueKind {
        <A::Element as ToValue>::KIND
    }

    fn dynamic(&self) -> bool {
        A::DYNAMIC
    }

    fn size(&self, object: &UserObject) -> Result<usize> {
        self.with_container(object, |container| Ok(container.size()))
    }

    fn element(&self, object: &UserObject, index: usize) -> Result<Value> {
        self.with_container(object, |container| {
            container
                .element(index)
                .map(ToValue::to_value)
                .ok_or(Error::OutOfRange {
                    index,
                    size: container.size(),
                })
        })
    }

    fn set_element(&self, object: &UserObject, index: usize, value: &Value) -> Result<()> {
        let converted = A::Element::from_value(value)?;
        self.with_container_mut(object, |container| {
            let size = container.size();
            match container.element_mut(index) {
                Some(slot) => {
                    *slot = converted;
                    Ok(())
                }
                None => Err(Error::OutOfRange { index, size }),
            }
        })
    }

    fn insert_element(&self, object: &UserObject, index: usize, value: &Value) -> Result<()> {
        let converted = A::Element::from_value(value)?;
        self.with_container_mut(object, |container| {
            if index > container.size() {
                return Err(Error::OutOfRange {
                    index,
                    size: container.size(),
                });
            }
            container.insert(index, converted);
            Ok(())
        })
    }

    fn remove_element(&self, object: &UserObject, index: usize) -> Result<()> {
        self.with_container_mut(object, |container| {
            if index >= container.size() {
                return Err(Error::OutOfRange {
                    index,
                    size: container.size(),
                });
            }
            container.remove(index);
            Ok(())
        })
    }

    fn resize(&self, object: &UserObject, new_size: usize) -> Result<()> {
        self.with_container_mut(object, |container| {
            container.resize(new_size);
            Ok(())
        })
    }
}

// -----------------------------------------------------------------------------
// ArrayView

/// Structural element access on one container property of one object.
///
/// Obtained through [`Property::array_view`]; borrows both the property and
/// the object for its lifetime.
///
/// # Examples
///
/// ```
/// use loupe_reflect::object::UserObject;
/// use loupe_reflect::property::Property;
/// use loupe_reflect::value::Value;
///
/// #[derive(Clone)]
/// struct Tags {
///     names: Vec<String>,
/// }
/// loupe_reflect::reflect_class!(Tags);
///
/// let property = Property::array("names", |t: &Tags| &t.names, |t: &mut Tags| &mut t.names);
/// let mut tags = Tags { names: vec!["a".into()] };
/// let object = unsafe { UserObject::from_mut(&mut tags) };
///
/// let view = property.array_view(&object).unwrap();
/// view.insert(1, &Value::from("b")).unwrap();
/// assert_eq!(view.size().unwrap(), 2);
/// ```
pub struct ArrayView<'a> {
    property: &'a Property,
    accessor: &'a dyn ArrayAccessor,
    object: &'a UserObject,
}

impl<'a> ArrayView<'a> {
    pub(crate) fn new(
        property: &'a Property,
        accessor: &'a dyn ArrayAccessor,
        object: &'a UserObject,
    ) -> Self {
        Self {
            property,
            accessor,
            object,
        }
    }

    /// The kind of the container's elements.
    #[inline]
    pub fn element_kind(&self) -> ValueKind {
        self.accessor.element_kind()
    }

    /// Whether insert/remove/resize change the container size.
    #[inline]
    pub fn dynamic(&self) -> bool {
        self.accessor.dynamic()
    }

    /// The current number of elements.
    pub fn size(&self) -> Result<usize> {
        self.accessor.size(self.object)
    }

    /// Reads the element at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index` is past the last element.
    pub fn get(&self, index: usize) -> Result<Value> {
        self.accessor.element(self.object, index)
    }

    /// Overwrites the element at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::ForbiddenWrite`] on a const holder; [`Error::OutOfRange`]
    /// or [`Error::BadType`] from index and conversion checks.
    pub fn set(&self, index: usize, value: &Value) -> Result<()> {
        self.object.ensure_writable(self.property.name())?;
        self.accessor.set_element(self.object, index, value)
    }

    /// Inserts an element before `index`. A no-op on fixed-size containers.
    pub fn insert(&self, index: usize, value: &Value) -> Result<()> {
        self.object.ensure_writable(self.property.name())?;
        self.accessor.insert_element(self.object, index, value)
    }

    /// Removes the element at `index`. A no-op on fixed-size containers.
    pub fn remove(&self, index: usize) -> Result<()> {
        self.object.ensure_writable(self.property.name())?;
        self.accessor.remove_element(self.object, index)
    }

    /// Resizes a dynamic container, filling new slots with default
    /// elements. A no-op on fixed-size containers.
    pub fn resize(&self, new_size: usize) -> Result<()> {
        self.object.ensure_writable(self.property.name())?;
        self.accessor.resize(self.object, new_size)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Mesh {
        weights: Vec<f64>,
        corners: [i32; 3],
    }
    crate::reflect_class!(Mesh);

    fn mesh() -> Mesh {
        Mesh {
            weights: vec![1.0, 2.0],
            corners: [7, 8, 9],
        }
    }

    fn weights_property() -> Property {
        Property::array("weights", |m: &Mesh| &m.weights, |m: &mut Mesh| {
            &mut m.weights
        })
    }

    fn corners_property() -> Property {
        Property::array("corners", |m: &Mesh| &m.corners, |m: &mut Mesh| {
            &mut m.corners
        })
    }

    #[test]
    fn dynamic_container_supports_all_operations() {
        let property = weights_property();
        let mut mesh = mesh();
        let object = unsafe { UserObject::from_mut(&mut mesh) };
        let view = property.array_view(&object).unwrap();

        assert!(view.dynamic());
        assert_eq!(view.element_kind(), ValueKind::Real);
        assert_eq!(view.size().unwrap(), 2);
        assert_eq!(view.get(1).unwrap(), Value::Real(2.0));

        view.set(0, &Value::from(9)).unwrap();
        view.insert(2, &Value::from(3.0)).unwrap();
        view.remove(1).unwrap();
        view.resize(4).unwrap();

        drop(view);
        drop(object);
        assert_eq!(mesh.weights, vec![9.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn fixed_container_ignores_size_changes() {
        let property = corners_property();
        let mut mesh = mesh();
        let object = unsafe { UserObject::from_mut(&mut mesh) };
        let view = property.array_view(&object).unwrap();

        assert!(!view.dynamic());
        assert_eq!(view.size().unwrap(), 3);

        view.insert(0, &Value::from(1)).unwrap();
        view.remove(0).unwrap();
        view.resize(10).unwrap();
        assert_eq!(view.size().unwrap(), 3);

        view.set(2, &Value::from(42)).unwrap();
        drop(view);
        drop(object);
        assert_eq!(mesh.corners, [7, 8, 42]);
    }

    #[test]
    fn out_of_range_reports_size() {
        let property = weights_property();
        let mut mesh = mesh();
        let object = unsafe { UserObject::from_mut(&mut mesh) };
        let view = property.array_view(&object).unwrap();

        assert_eq!(
            view.get(5).unwrap_err(),
            Error::OutOfRange { index: 5, size: 2 }
        );
        assert!(view.set(5, &Value::from(0)).is_err());
        assert!(view.remove(5).is_err());
    }

    #[test]
    fn const_holder_allows_reads_only() {
        let property = weights_property();
        let mesh = mesh();
        let object = unsafe { UserObject::from_ref(&mesh) };
        let view = property.array_view(&object).unwrap();

        assert_eq!(view.size().unwrap(), 2);
        assert!(matches!(
            view.set(0, &Value::from(1)),
            Err(Error::ForbiddenWrite { .. })
        ));
        assert!(view.insert(0, &Value::from(1)).is_err());
    }

    #[test]
    fn non_container_property_has_no_view() {
        #[derive(Clone)]
        struct Plain {
            n: i32,
        }
        crate::reflect_class!(Plain);

        let property = Property::read_only("n", |p: &Plain| p.n);
        let mut plain = Plain { n: 1 };
        let object = unsafe { UserObject::from_mut(&mut plain) };
        assert!(matches!(
            property.array_view(&object),
            Err(Error::BadType { .. })
        ));
    }
}
