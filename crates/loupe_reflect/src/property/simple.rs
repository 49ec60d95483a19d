//! Scalar and nested-object property accessors.

use crate::error::Result;
use crate::object::{UserObject, UserType};
use crate::property::Accessor;
use crate::value::{FromValue, ToValue, Value};

// -----------------------------------------------------------------------------
// GetSetProperty

/// Copy-in/copy-out binding over a getter and an optional setter.
pub(crate) struct GetSetProperty<T, V> {
    getter: Box<dyn Fn(&T) -> V + Send + Sync>,
    setter: Option<Box<dyn Fn(&mut T, V) + Send + Sync>>,
}

impl<T, V> GetSetProperty<T, V> {
    pub(crate) fn new(
        getter: impl Fn(&T) -> V + Send + Sync + 'static,
        setter: Option<Box<dyn Fn(&mut T, V) + Send + Sync>>,
    ) -> Self {
        Self {
            getter: Box::new(getter),
            setter,
        }
    }
}

impl<T, V> Accessor for GetSetProperty<T, V>
where
    T: UserType,
    V: ToValue + FromValue + 'static,
{
    fn get(&self, object: &UserObject) -> Result<Value> {
        let pointer = object.pointer_as::<T>()?;
        // SAFETY: the handle's construction contract guarantees a live
        // instance for as long as the handle is used.
        let instance = unsafe { pointer.as_ref() };
        Ok((self.getter)(instance).to_value())
    }

    fn set(&self, object: &UserObject, value: &Value) -> Result<()> {
        // Convert before touching the instance.
        let converted = V::from_value(value)?;
        let mut pointer = object.pointer_as::<T>()?;
        match &self.setter {
            Some(setter) => {
                // SAFETY: live instance per the handle contract; writability
                // of the holder was checked by `Property::set`.
                setter(unsafe { pointer.as_mut() }, converted);
                Ok(())
            }
            // `Property::set` gates on the writable flag, which is only
            // raised when a setter exists.
            None => unreachable!("set dispatched to a getter-only property"),
        }
    }
}

// -----------------------------------------------------------------------------
// RefProperty

/// Field-like binding through live references.
///
/// Reads of user-kind members produce internal references that alias the
/// instance; the parent handle is adopted into the produced value so an
/// owned instance cannot be dropped while the reference is reachable.
pub(crate) struct RefProperty<T, V> {
    getter: Box<dyn for<'a> Fn(&'a T) -> &'a V + Send + Sync>,
    getter_mut: Box<dyn for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync>,
}

impl<T, V> RefProperty<T, V> {
    pub(crate) fn new(
        getter: impl for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
        getter_mut: impl for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync + 'static,
    ) -> Self {
        Self {
            getter: Box::new(getter),
            getter_mut: Box::new(getter_mut),
        }
    }
}

impl<T, V> Accessor for RefProperty<T, V>
where
    T: UserType,
    V: ToValue + FromValue + 'static,
{
    fn get(&self, object: &UserObject) -> Result<Value> {
        let pointer = object.pointer_as::<T>()?;
        // SAFETY: live instance per the handle contract.
        let field = (self.getter)(unsafe { pointer.as_ref() });
        // SAFETY: the produced value aliases the instance; adopting the
        // parent below keeps an owned instance alive, and referencing
        // holders already demand source liveness from their creator.
        let mut value = unsafe { field.to_value_ref() };
        if let Value::User(nested) = &mut value {
            nested.adopt(object);
        }
        Ok(value)
    }

    fn set(&self, object: &UserObject, value: &Value) -> Result<()> {
        let converted = V::from_value(value)?;
        let mut pointer = object.pointer_as::<T>()?;
        // SAFETY: live instance; holder writability checked by the caller.
        *(self.getter_mut)(unsafe { pointer.as_mut() }) = converted;
        Ok(())
    }

    fn get_writable(&self, object: &UserObject) -> Result<Value> {
        let mut pointer = object.pointer_as::<T>()?;
        // SAFETY: live instance per the handle contract; the caller
        // checked that the handle allows writes.
        let field = (self.getter_mut)(unsafe { pointer.as_mut() });
        // SAFETY: same aliasing contract as `get`; adopting the parent
        // keeps an owned instance alive while the alias is reachable.
        let mut value = unsafe { field.to_value_mut() };
        if let Value::User(nested) = &mut value {
            nested.adopt(object);
        }
        Ok(value)
    }
}
