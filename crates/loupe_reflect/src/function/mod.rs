//! The function abstraction: erased invocation of methods and free
//! functions.

use crate::error::{Error, Result};
use crate::object::{UserObject, UserType};
use crate::value::{Args, FromValue, ToValue, Value, ValueKind};

// -----------------------------------------------------------------------------
// ReturnPolicy

/// Ownership policy applied to a function's return value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReturnPolicy {
    /// The result is converted by copy.
    Copy,
    /// The result aliases the called instance; the produced value keeps the
    /// instance alive but never owns it.
    InternalRef,
}

// -----------------------------------------------------------------------------
// Callable

/// The erased invocation contract a function dispatches to.
///
/// `object` is `None` for static calls; method wrappers reject that with
/// [`Error::NullObject`]. Public only because the wrapper traits name it;
/// not part of the supported surface.
#[doc(hidden)]
pub trait Callable: Send + Sync + 'static {
    fn call(&self, name: &str, object: Option<&UserObject>, args: &Args) -> Result<Value>;
}

struct FnCallable<F>(F);

impl<F> Callable for FnCallable<F>
where
    F: Fn(&str, Option<&UserObject>, &Args) -> Result<Value> + Send + Sync + 'static,
{
    fn call(&self, name: &str, object: Option<&UserObject>, args: &Args) -> Result<Value> {
        (self.0)(name, object, args)
    }
}

// -----------------------------------------------------------------------------
// Function

/// A named, callable member of a metaclass.
///
/// Records the parameter kinds, return kind and return policy of the
/// wrapped native callable. Invocation converts each argument to its
/// declared parameter type, calls, and converts the result back into a
/// [`Value`].
///
/// Surplus arguments are ignored; missing ones raise
/// [`Error::NotEnoughArguments`], and an inconvertible one raises
/// [`Error::BadArgument`] carrying its position.
pub struct Function {
    name: String,
    return_kind: ValueKind,
    return_policy: ReturnPolicy,
    param_kinds: Vec<ValueKind>,
    callable: Box<dyn Callable>,
}

impl Function {
    /// The function name, unique within its metaclass.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of the returned value.
    #[inline]
    pub fn return_kind(&self) -> ValueKind {
        self.return_kind
    }

    /// The ownership policy of the returned value.
    #[inline]
    pub fn return_policy(&self) -> ReturnPolicy {
        self.return_policy
    }

    /// The number of declared parameters.
    #[inline]
    pub fn param_count(&self) -> usize {
        self.param_kinds.len()
    }

    /// The kind of the parameter at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index` is past the last parameter.
    pub fn param_kind(&self, index: usize) -> Result<ValueKind> {
        self.param_kinds
            .get(index)
            .copied()
            .ok_or(Error::OutOfRange {
                index,
                size: self.param_kinds.len(),
            })
    }

    /// Invokes the function on `object`.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle, plus any argument or
    /// conversion error from the wrapped callable.
    pub fn call(&self, object: &UserObject, args: &Args) -> Result<Value> {
        if object.is_nothing() {
            return Err(Error::NullObject);
        }
        self.callable.call(&self.name, Some(object), args)
    }

    /// Invokes the function without an instance.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] if the wrapped callable is a method.
    pub fn call_static(&self, args: &Args) -> Result<Value> {
        self.callable.call(&self.name, None, args)
    }

    // -- factories -----------------------------------------------------------

    /// Wraps a method of `T`.
    pub fn method<T, Marker, F>(name: impl Into<String>, function: F) -> Self
    where
        F: Method<T, Marker>,
    {
        Self {
            name: name.into(),
            return_kind: F::return_kind(),
            return_policy: ReturnPolicy::Copy,
            param_kinds: F::param_kinds(),
            callable: function.into_callable(),
        }
    }

    /// Wraps a callable requiring no instance.
    pub fn static_fn<Marker, F>(name: impl Into<String>, function: F) -> Self
    where
        F: StaticFunction<Marker>,
    {
        Self {
            name: name.into(),
            return_kind: F::return_kind(),
            return_policy: ReturnPolicy::Copy,
            param_kinds: F::param_kinds(),
            callable: function.into_callable(),
        }
    }

    /// Wraps a zero-argument accessor returning a reference into the
    /// instance, called with [`ReturnPolicy::InternalRef`].
    pub fn ref_method<T, V, F>(name: impl Into<String>, function: F) -> Self
    where
        T: UserType,
        V: ToValue + FromValue + 'static,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            return_kind: <V as ToValue>::KIND,
            return_policy: ReturnPolicy::InternalRef,
            param_kinds: Vec::new(),
            callable: Box::new(FnCallable(
                move |_name: &str, object: Option<&UserObject>, _args: &Args| {
                    let object = object.ok_or(Error::NullObject)?;
                    let pointer = object.pointer_as::<T>()?;
                    // SAFETY: live instance per the handle contract.
                    let field = function(unsafe { pointer.as_ref() });
                    // SAFETY: the produced value aliases the instance and
                    // adopts the holder below, matching the internal
                    // reference contract.
                    let mut value = unsafe { field.to_value_ref() };
                    if let Value::User(nested) = &mut value {
                        nested.adopt(object);
                    }
                    Ok(value)
                },
            )),
        }
    }
}

impl core::fmt::Debug for Function {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.param_kinds)
            .field("returns", &self.return_kind)
            .field("policy", &self.return_policy)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Argument conversion

fn convert_arg<A: FromValue>(function: &str, args: &Args, index: usize) -> Result<A> {
    let value = args.get(index).ok_or_else(|| Error::NotEnoughArguments {
        function: function.to_owned(),
        provided: args.len(),
        expected: index + 1,
    })?;
    A::from_value(value).map_err(|error| match error {
        Error::BadType { provided, expected } => Error::BadArgument {
            function: function.to_owned(),
            index,
            provided,
            expected,
        },
        other => other,
    })
}

fn check_arity(function: &str, args: &Args, arity: usize) -> Result<()> {
    // Surplus arguments are ignored.
    if args.len() < arity {
        return Err(Error::NotEnoughArguments {
            function: function.to_owned(),
            provided: args.len(),
            expected: arity,
        });
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Method

/// A native callable usable as a method of `T`.
///
/// Implemented for `Fn(&T, A..) -> R` and `Fn(&mut T, A..) -> R` up to five
/// parameters. The `Marker` parameter pins the signature so the two
/// receiver shapes cannot overlap.
pub trait Method<T, Marker>: Send + Sync + 'static {
    fn param_kinds() -> Vec<ValueKind>;
    fn return_kind() -> ValueKind;
    fn into_callable(self) -> Box<dyn Callable>;
}

/// A native callable requiring no instance.
pub trait StaticFunction<Marker>: Send + Sync + 'static {
    fn param_kinds() -> Vec<ValueKind>;
    fn return_kind() -> ValueKind;
    fn into_callable(self) -> Box<dyn Callable>;
}

macro_rules! impl_callables {
    ($($param:ident : $index:tt),*) => {
        impl<Fun, T, R, $($param),*> Method<T, fn(&T, $($param),*) -> R> for Fun
        where
            Fun: Fn(&T, $($param),*) -> R + Send + Sync + 'static,
            T: UserType,
            R: ToValue + 'static,
            $($param: FromValue + 'static,)*
        {
            fn param_kinds() -> Vec<ValueKind> {
                vec![$(<$param as FromValue>::KIND),*]
            }

            fn return_kind() -> ValueKind {
                <R as ToValue>::KIND
            }

            fn into_callable(self) -> Box<dyn Callable> {
                let arity = [$($index,)* 0_usize].len() - 1;
                Box::new(FnCallable(
                    move |name: &str, object: Option<&UserObject>, args: &Args| {
                        let object = object.ok_or(Error::NullObject)?;
                        check_arity(name, args, arity)?;
                        let pointer = object.pointer_as::<T>()?;
                        // SAFETY: live instance per the handle contract.
                        let instance = unsafe { pointer.as_ref() };
                        let result =
                            (self)(instance, $(convert_arg::<$param>(name, args, $index)?),*);
                        Ok(result.to_value())
                    },
                ))
            }
        }

        impl<Fun, T, R, $($param),*> Method<T, fn(&mut T, $($param),*) -> R> for Fun
        where
            Fun: Fn(&mut T, $($param),*) -> R + Send + Sync + 'static,
            T: UserType,
            R: ToValue + 'static,
            $($param: FromValue + 'static,)*
        {
            fn param_kinds() -> Vec<ValueKind> {
                vec![$(<$param as FromValue>::KIND),*]
            }

            fn return_kind() -> ValueKind {
                <R as ToValue>::KIND
            }

            fn into_callable(self) -> Box<dyn Callable> {
                let arity = [$($index,)* 0_usize].len() - 1;
                Box::new(FnCallable(
                    move |name: &str, object: Option<&UserObject>, args: &Args| {
                        let object = object.ok_or(Error::NullObject)?;
                        check_arity(name, args, arity)?;
                        object.ensure_writable(name)?;
                        let mut pointer = object.pointer_as::<T>()?;
                        // SAFETY: live instance; const holders rejected above.
                        let instance = unsafe { pointer.as_mut() };
                        let result =
                            (self)(instance, $(convert_arg::<$param>(name, args, $index)?),*);
                        Ok(result.to_value())
                    },
                ))
            }
        }

        impl<Fun, R, $($param),*> StaticFunction<fn($($param),*) -> R> for Fun
        where
            Fun: Fn($($param),*) -> R + Send + Sync + 'static,
            R: ToValue + 'static,
            $($param: FromValue + 'static,)*
        {
            fn param_kinds() -> Vec<ValueKind> {
                vec![$(<$param as FromValue>::KIND),*]
            }

            fn return_kind() -> ValueKind {
                <R as ToValue>::KIND
            }

            fn into_callable(self) -> Box<dyn Callable> {
                let arity = [$($index,)* 0_usize].len() - 1;
                Box::new(FnCallable(
                    move |name: &str, _object: Option<&UserObject>, args: &Args| {
                        check_arity(name, args, arity)?;
                        let result = (self)($(convert_arg::<$param>(name, args, $index)?),*);
                        Ok(result.to_value())
                    },
                ))
            }
        }
    };
}

impl_callables!();
impl_callables!(A0: 0);
impl_callables!(A0: 0, A1: 1);
impl_callables!(A0: 0, A1: 1, A2: 2);
impl_callables!(A0: 0, A1: 1, A2: 2, A3: 3);
impl_callables!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Function, ReturnPolicy};
    use crate::args;
    use crate::error::Error;
    use crate::object::UserObject;
    use crate::value::{Args, Value, ValueKind};

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        count: i32,
    }
    crate::reflect_class!(Counter);

    impl Counter {
        fn add(&self, amount: i32) -> i32 {
            self.count + amount
        }

        fn bump(&mut self) {
            self.count += 1;
        }
    }

    #[test]
    fn method_call_converts_arguments_and_result() {
        let function = Function::method("add", Counter::add);
        assert_eq!(function.param_count(), 1);
        assert_eq!(function.param_kind(0).unwrap(), ValueKind::Integer);
        assert_eq!(function.return_kind(), ValueKind::Integer);
        assert_eq!(function.return_policy(), ReturnPolicy::Copy);

        let object = UserObject::new(Counter { count: 2 });
        assert_eq!(
            function.call(&object, &args![3]).unwrap(),
            Value::Integer(5)
        );
        // String-to-integer coercion applies to arguments too.
        assert_eq!(
            function.call(&object, &args!["3"]).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn missing_arguments_are_reported() {
        let function = Function::method("add", Counter::add);
        let object = UserObject::new(Counter { count: 2 });
        assert_eq!(
            function.call(&object, &Args::empty()).unwrap_err(),
            Error::NotEnoughArguments {
                function: "add".to_owned(),
                provided: 0,
                expected: 1,
            }
        );
    }

    #[test]
    fn bad_argument_carries_its_position() {
        let function = Function::method("add", Counter::add);
        let object = UserObject::new(Counter { count: 2 });
        assert_eq!(
            function.call(&object, &args!["nope"]).unwrap_err(),
            Error::BadArgument {
                function: "add".to_owned(),
                index: 0,
                provided: ValueKind::String,
                expected: ValueKind::Integer,
            }
        );
    }

    #[test]
    fn surplus_arguments_are_ignored() {
        let function = Function::method("add", Counter::add);
        let object = UserObject::new(Counter { count: 2 });
        assert_eq!(
            function.call(&object, &args![3, 99, "extra"]).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn mutating_method_requires_writable_holder() {
        let function = Function::method("bump", Counter::bump);
        assert_eq!(function.return_kind(), ValueKind::None);

        let object = UserObject::new(Counter { count: 0 });
        function.call(&object, &Args::empty()).unwrap();
        assert_eq!(object.get::<Counter>().unwrap().count, 1);

        let frozen = Counter { count: 0 };
        let object = unsafe { UserObject::from_ref(&frozen) };
        assert!(matches!(
            function.call(&object, &Args::empty()),
            Err(Error::ForbiddenWrite { .. })
        ));
    }

    #[test]
    fn static_function_needs_no_instance() {
        let function = Function::static_fn("add", |a: i32, b: i32| a + b);
        assert_eq!(
            function.call_static(&args![2, 3]).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn method_rejects_static_invocation_and_nothing() {
        let function = Function::method("add", Counter::add);
        assert_eq!(
            function.call_static(&args![1]).unwrap_err(),
            Error::NullObject
        );
        assert_eq!(
            function
                .call(&UserObject::nothing(), &args![1])
                .unwrap_err(),
            Error::NullObject
        );
    }

    #[test]
    fn ref_method_returns_internal_reference() {
        #[derive(Clone, Debug, PartialEq)]
        struct Holder {
            value: Counter,
        }
        crate::reflect_class!(Holder);

        let function = Function::ref_method("value", |h: &Holder| &h.value);
        assert_eq!(function.return_policy(), ReturnPolicy::InternalRef);

        let object = UserObject::new(Holder {
            value: Counter { count: 9 },
        });
        let result = function.call(&object, &Args::empty()).unwrap();
        let nested = result.to::<UserObject>().unwrap();
        assert_eq!(nested.get::<Counter>().unwrap().count, 9);
    }
}
