//! Runtime helpers: constructing, destroying and calling through
//! metaclasses.

use core::ptr::NonNull;
use std::sync::Arc;

use crate::class::Class;
use crate::error::Result;
use crate::function::Function;
use crate::object::UserObject;
use crate::value::{Args, Value};

// -----------------------------------------------------------------------------
// ObjectFactory

/// Creates and destroys instances of one metaclass through its declared
/// constructors.
///
/// Construction tries the constructors in declaration order and uses the
/// first whose signature matches; when none matches, the `nothing` handle
/// is returned instead of an error. Created instances are owned by the
/// caller and must be released with [`ObjectFactory::destroy`].
///
/// # Examples
///
/// ```
/// use loupe_reflect::class::Class;
/// use loupe_reflect::runtime::ObjectFactory;
///
/// #[derive(Clone)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
/// loupe_reflect::reflect_class!(Point);
///
/// let class = Class::declare_named::<Point>("Point")
///     .unwrap()
///     .property("x", |p: &Point| p.x)
///     .constructor(|x: f64, y: f64| Point { x, y })
///     .register()
///     .unwrap();
///
/// let factory = ObjectFactory::new(class);
/// let object = factory.create((1.0, 2.0));
/// assert!(!object.is_nothing());
///
/// // No constructor takes a single string.
/// assert!(factory.create(("nope",)).is_nothing());
///
/// unsafe { factory.destroy(object).unwrap() };
/// ```
pub struct ObjectFactory {
    class: Arc<Class>,
}

impl ObjectFactory {
    /// A factory over the given metaclass.
    #[inline]
    pub fn new(class: Arc<Class>) -> Self {
        Self { class }
    }

    /// The metaclass this factory constructs.
    #[inline]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Creates a heap instance from an argument list.
    ///
    /// Returns the `nothing` handle when no constructor matches or the
    /// creation itself fails.
    pub fn construct(&self, args: &Args) -> UserObject {
        for constructor in self.class.constructors() {
            if constructor.matches(args) {
                return match constructor.create(args) {
                    // SAFETY: the constructor produced a live heap instance
                    // of the factory's type.
                    Ok(pointer) => unsafe {
                        UserObject::from_pointer(Arc::clone(&self.class), pointer)
                    },
                    Err(_) => UserObject::nothing(),
                };
            }
        }
        UserObject::nothing()
    }

    /// Convenience form of [`ObjectFactory::construct`] taking anything
    /// convertible to an argument list, typically a tuple.
    #[inline]
    pub fn create(&self, args: impl Into<Args>) -> UserObject {
        self.construct(&args.into())
    }

    /// Creates an instance in caller-provided storage.
    ///
    /// Returns the `nothing` handle when no constructor matches; on match,
    /// the returned handle wraps `pointer`.
    ///
    /// # Safety
    ///
    /// `pointer` must be valid, suitably aligned storage for an instance of
    /// the factory's type, unused by anything else, and must outlive the
    /// returned handle. The caller releases the instance with
    /// [`ObjectFactory::destruct`], never with `destroy`.
    pub unsafe fn construct_at(&self, pointer: NonNull<u8>, args: &Args) -> UserObject {
        for constructor in self.class.constructors() {
            if constructor.matches(args) {
                return match constructor.create_at(args, pointer) {
                    // SAFETY: storage validity per this function's contract.
                    Ok(()) => unsafe {
                        UserObject::from_pointer(Arc::clone(&self.class), pointer)
                    },
                    Err(_) => UserObject::nothing(),
                };
            }
        }
        UserObject::nothing()
    }

    /// Destroys a heap instance created by [`ObjectFactory::construct`],
    /// releasing its allocation.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle.
    ///
    /// # Safety
    ///
    /// `object` (and every clone of it) must wrap a live instance produced
    /// by this factory's `construct`/`create` and must not be used
    /// afterwards.
    ///
    /// [`Error::NullObject`]: crate::error::Error::NullObject
    pub unsafe fn destroy(&self, object: UserObject) -> Result<()> {
        let pointer = object.pointer()?;
        // SAFETY: forwarded caller contract.
        unsafe { self.class.destruct(pointer, true) };
        Ok(())
    }

    /// Runs the destructor on an instance in caller-provided storage,
    /// without deallocating.
    ///
    /// # Errors
    ///
    /// [`Error::NullObject`] for the empty handle.
    ///
    /// # Safety
    ///
    /// Same contract as [`ObjectFactory::destroy`], for handles produced by
    /// [`ObjectFactory::construct_at`].
    ///
    /// [`Error::NullObject`]: crate::error::Error::NullObject
    pub unsafe fn destruct(&self, object: UserObject) -> Result<()> {
        let pointer = object.pointer()?;
        // SAFETY: forwarded caller contract.
        unsafe { self.class.destruct(pointer, false) };
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ObjectCaller

/// Binds one function for repeated invocation on changing objects.
pub struct ObjectCaller {
    function: Arc<Function>,
}

impl ObjectCaller {
    #[inline]
    pub fn new(function: Arc<Function>) -> Self {
        Self { function }
    }

    /// The bound function.
    #[inline]
    pub fn function(&self) -> &Arc<Function> {
        &self.function
    }

    /// Invokes the bound function on `object`.
    #[inline]
    pub fn call(&self, object: &UserObject, args: &Args) -> Result<Value> {
        self.function.call(object, args)
    }
}

/// Invokes a function on an object. Free-function form of
/// [`Function::call`].
#[inline]
pub fn call(function: &Function, object: &UserObject, args: &Args) -> Result<Value> {
    function.call(object, args)
}

/// Invokes a function without an instance. Free-function form of
/// [`Function::call_static`].
#[inline]
pub fn call_static(function: &Function, args: &Args) -> Result<Value> {
    function.call_static(args)
}

// -----------------------------------------------------------------------------
// Tests
