//! Constructor descriptors and their erased creation thunks.

use core::ptr::NonNull;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::object::UserType;
use crate::value::{Args, FromValue, ValueKind};

/// Label used when reporting argument errors from a constructor.
const CONSTRUCTOR: &str = "<constructor>";

// -----------------------------------------------------------------------------
// Constructor

/// An erased constructor: declared parameter kinds plus creation thunks.
///
/// A constructor matches an argument list when the arity is exactly its own
/// and every argument converts to the corresponding parameter type.
/// Matching never fails hard; unmatched lists simply report `false` and the
/// factory tries the next constructor in declaration order.
pub struct Constructor {
    param_kinds: Vec<ValueKind>,
    matcher: Box<dyn Fn(&Args) -> bool + Send + Sync>,
    create: Box<dyn Fn(&Args) -> Result<NonNull<u8>> + Send + Sync>,
    create_at: Box<dyn Fn(&Args, NonNull<u8>) -> Result<()> + Send + Sync>,
}

impl Constructor {
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

    /// Reports whether the argument list satisfies this signature.
    #[inline]
    pub fn matches(&self, args: &Args) -> bool {
        (self.matcher)(args)
    }

    /// Creates a heap instance, returning its erased pointer.
    ///
    /// The allocation is owned by the caller and must eventually be released
    /// through the metaclass destructor thunk.
    pub(crate) fn create(&self, args: &Args) -> Result<NonNull<u8>> {
        (self.create)(args)
    }

    /// Creates an instance in caller-provided storage at `pointer`.
    pub(crate) fn create_at(&self, args: &Args, pointer: NonNull<u8>) -> Result<()> {
        (self.create_at)(args, pointer)
    }
}

// -----------------------------------------------------------------------------
// ClassConstructor

/// A native callable usable as a constructor for `T`.
///
/// Implemented for `Fn(A0, .., An) -> T` up to five parameters, each
/// parameter being a convertible exposed type. The `Marker` parameter pins
/// the callable's signature so unrelated `Fn` implementations cannot
/// overlap.
pub trait ClassConstructor<T, Marker>: Send + Sync + 'static {
    fn into_constructor(self) -> Constructor;
}

fn convert_arg<A: FromValue>(args: &Args, index: usize) -> Result<A> {
    let value = args.get(index).ok_or_else(|| Error::NotEnoughArguments {
        function: CONSTRUCTOR.to_owned(),
        provided: args.len(),
        expected: index + 1,
    })?;
    A::from_value(value).map_err(|error| match error {
        Error::BadType { provided, expected } => Error::BadArgument {
            function: CONSTRUCTOR.to_owned(),
            index,
            provided,
            expected,
        },
        other => other,
    })
}

macro_rules! impl_class_constructor {
    ($($param:ident : $index:tt),*) => {
        impl<Fun, T, $($param),*> ClassConstructor<T, fn($($param),*) -> T> for Fun
        where
            Fun: Fn($($param),*) -> T + Send + Sync + 'static,
            T: UserType,
            $($param: FromValue + 'static,)*
        {
            fn into_constructor(self) -> Constructor {
                let arity = [$($index,)* 0_usize].len() - 1;
                let function = Arc::new(self);
                let create_fn = Arc::clone(&function);
                let create_at_fn = function;
                Constructor {
                    param_kinds: vec![$(<$param as FromValue>::KIND),*],
                    matcher: Box::new(move |args: &Args| {
                        args.len() == arity
                            $(&& args.get($index).is_some_and(<$param>::can_convert))*
                    }),
                    create: Box::new(move |args: &Args| {
                        let value = (*create_fn)($(convert_arg::<$param>(args, $index)?),*);
                        Ok(NonNull::from(Box::leak(Box::new(value))).cast::<u8>())
                    }),
                    create_at: Box::new(move |args: &Args, pointer: NonNull<u8>| {
                        let value = (*create_at_fn)($(convert_arg::<$param>(args, $index)?),*);
                        // SAFETY: `create_at` is only reached through the
                        // factory's unsafe placement API, whose caller
                        // guarantees valid, writable storage for a `T`.
                        unsafe { pointer.cast::<T>().as_ptr().write(value) };
                        Ok(())
                    }),
                }
            }
        }
    };
}

impl_class_constructor!();
impl_class_constructor!(A0: 0);
impl_class_constructor!(A0: 0, A1: 1);
impl_class_constructor!(A0: 0, A1: 1, A2: 2);
impl_class_constructor!(A0: 0, A1: 1, A2: 2, A3: 3);
impl_class_constructor!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::ClassConstructor;
    use crate::args;
    use crate::value::{Args, ValueKind};

    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        a: i32,
        b: i32,
    }
    crate::reflect_class!(Pair);

    #[test]
    fn matching_requires_exact_arity_and_convertibility() {
        let ctor = (|a: i32, b: i32| Pair { a, b }).into_constructor();
        assert_eq!(ctor.param_count(), 2);
        assert_eq!(ctor.param_kind(0).unwrap(), ValueKind::Integer);

        assert!(ctor.matches(&args![1, 2]));
        // String-to-integer conversion makes this match too.
        assert!(ctor.matches(&args![1, "2"]));
        assert!(!ctor.matches(&args![1]));
        assert!(!ctor.matches(&args![1, 2, 3]));
        assert!(!ctor.matches(&args![1, "two"]));
    }

    #[test]
    fn create_builds_the_instance() {
        let ctor = (|a: i32, b: i32| Pair { a, b }).into_constructor();
        let pointer = ctor.create(&args![4, 5]).unwrap();
        let boxed = unsafe { Box::from_raw(pointer.cast::<Pair>().as_ptr()) };
        assert_eq!(*boxed, Pair { a: 4, b: 5 });
    }

    #[test]
    fn zero_arity_constructor() {
        let ctor = (|| Pair { a: 0, b: 0 }).into_constructor();
        assert!(ctor.matches(&Args::empty()));
        assert!(!ctor.matches(&args![1]));
    }
}
