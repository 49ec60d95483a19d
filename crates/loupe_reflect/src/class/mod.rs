//! Metaclasses: the per-type metadata records of the registry.

use core::any::{TypeId, type_name};
use core::fmt;
use core::ptr::NonNull;
use std::sync::Arc;

use loupe_utils::Dictionary;

use crate::error::{Error, Result};
use crate::function::Function;
use crate::object::{UserObject, UserType};
use crate::property::Property;
use crate::registry;

mod builder;
mod constructor;

pub use builder::{ClassBuilder, ExternalMapper};
pub use constructor::{ClassConstructor, Constructor};

// -----------------------------------------------------------------------------
// Class

/// The metadata of a reflectable type: its members, bases and constructors.
///
/// A `Class` is immutable once registered; it is populated exclusively
/// through [`ClassBuilder`] during declaration. Property and function tables
/// are name-sorted dictionaries, so index-based enumeration yields members
/// in name order and name lookup is O(log n).
///
/// # Examples
///
/// ```
/// use loupe_reflect::class::Class;
/// use loupe_reflect::reflect_class;
///
/// #[derive(Clone)]
/// struct Point {
///     x: f64,
///     y: f64,
/// }
/// reflect_class!(Point);
///
/// let class = Class::declare_named::<Point>("Point")
///     .unwrap()
///     .property_rw("x", |p: &Point| p.x, |p: &mut Point, x| p.x = x)
///     .property_rw("y", |p: &Point| p.y, |p: &mut Point, y| p.y = y)
///     .register()
///     .unwrap();
///
/// assert_eq!(class.name(), "Point");
/// assert_eq!(class.property_count(), 2);
/// ```
pub struct Class {
    id: TypeId,
    type_name: &'static str,
    name: String,
    size: usize,
    properties: Dictionary<Arc<Property>>,
    functions: Dictionary<Arc<Function>>,
    bases: Vec<BaseInfo>,
    constructors: Vec<Constructor>,
    destructor: unsafe fn(NonNull<u8>, bool),
}

/// A base-class link: the base metaclass and the fixed byte offset from a
/// derived instance pointer to the embedded base.
pub struct BaseInfo {
    class: Arc<Class>,
    offset: isize,
}

impl BaseInfo {
    /// The base metaclass.
    #[inline]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Byte offset from a derived pointer to the base sub-object.
    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }
}

impl Class {
    /// Starts declaring the type `T` under its Rust type name.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeclared`] if `T` or the name is already registered.
    pub fn declare<T: UserType>() -> Result<ClassBuilder<T>> {
        Self::declare_named::<T>(type_name::<T>())
    }

    /// Starts declaring the type `T` under an explicit name.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeclared`] if `T` or the name is already registered.
    pub fn declare_named<T: UserType>(name: impl Into<String>) -> Result<ClassBuilder<T>> {
        ClassBuilder::new(name.into())
    }

    /// Removes the metaclass of `T` from the registry, notifying observers.
    ///
    /// Outstanding `Arc<Class>` handles stay valid; the metadata is only
    /// unreachable through the registry afterwards.
    ///
    /// # Errors
    ///
    /// [`Error::ClassNotFound`] if `T` was never declared.
    pub fn undeclare<T: UserType>() -> Result<()> {
        registry::unregister_class(TypeId::of::<T>(), type_name::<T>())
    }

    /// Looks up the metaclass of `T`.
    ///
    /// # Errors
    ///
    /// [`Error::ClassNotFound`] if `T` was never declared.
    pub fn by_type<T: UserType>() -> Result<Arc<Self>> {
        Self::try_by_type::<T>().ok_or_else(|| Error::ClassNotFound {
            name: type_name::<T>().to_owned(),
        })
    }

    /// Looks up the metaclass of `T`, or `None` if undeclared.
    pub fn try_by_type<T: UserType>() -> Option<Arc<Self>> {
        Self::try_by_id(TypeId::of::<T>())
    }

    /// Looks up a metaclass by [`TypeId`], or `None` if undeclared.
    pub fn try_by_id(id: TypeId) -> Option<Arc<Self>> {
        registry::read().try_by_id(id)
    }

    /// Looks up a metaclass by its registered name.
    ///
    /// # Errors
    ///
    /// [`Error::ClassNotFound`] if no class has that name.
    pub fn by_name(name: &str) -> Result<Arc<Self>> {
        Self::try_by_name(name).ok_or_else(|| Error::ClassNotFound {
            name: name.to_owned(),
        })
    }

    /// Looks up a metaclass by name, or `None` if unknown.
    pub fn try_by_name(name: &str) -> Option<Arc<Self>> {
        registry::read().try_by_name(name)
    }

    /// The registered name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The [`TypeId`] of the described type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The instance size in bytes.
    #[inline]
    pub fn size_of(&self) -> usize {
        self.size
    }

    pub(crate) fn static_type_name(&self) -> &'static str {
        self.type_name
    }

    // -- properties ----------------------------------------------------------

    /// The number of properties, inherited ones included.
    #[inline]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if a property with the given name exists.
    #[inline]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    /// Looks up a property by name.
    ///
    /// # Errors
    ///
    /// [`Error::PropertyNotFound`] if the name is unknown.
    pub fn property(&self, name: &str) -> Result<&Arc<Property>> {
        self.properties
            .find(name)
            .ok_or_else(|| Error::PropertyNotFound {
                class: self.name.clone(),
                name: name.to_owned(),
            })
    }

    /// Looks up a property by name, or `None` if unknown.
    #[inline]
    pub fn try_property(&self, name: &str) -> Option<&Arc<Property>> {
        self.properties.find(name)
    }

    /// Returns the property at `index`, in name order.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index` is past the last property.
    pub fn property_at(&self, index: usize) -> Result<&Arc<Property>> {
        self.properties
            .at(index)
            .map(|(_, property)| property)
            .ok_or(Error::OutOfRange {
                index,
                size: self.properties.len(),
            })
    }

    /// An iterator over properties in name order.
    #[inline]
    pub fn properties(&self) -> impl ExactSizeIterator<Item = &Arc<Property>> {
        self.properties.values()
    }

    // -- functions -----------------------------------------------------------

    /// The number of functions, inherited ones included.
    #[inline]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if a function with the given name exists.
    #[inline]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Looks up a function by name.
    ///
    /// # Errors
    ///
    /// [`Error::FunctionNotFound`] if the name is unknown.
    pub fn function(&self, name: &str) -> Result<&Arc<Function>> {
        self.functions
            .find(name)
            .ok_or_else(|| Error::FunctionNotFound {
                class: self.name.clone(),
                name: name.to_owned(),
            })
    }

    /// Looks up a function by name, or `None` if unknown.
    #[inline]
    pub fn try_function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.find(name)
    }

    /// Returns the function at `index`, in name order.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index` is past the last function.
    pub fn function_at(&self, index: usize) -> Result<&Arc<Function>> {
        self.functions
            .at(index)
            .map(|(_, function)| function)
            .ok_or(Error::OutOfRange {
                index,
                size: self.functions.len(),
            })
    }

    /// An iterator over functions in name order.
    #[inline]
    pub fn functions(&self) -> impl ExactSizeIterator<Item = &Arc<Function>> {
        self.functions.values()
    }

    // -- bases and constructors ----------------------------------------------

    /// The number of direct bases.
    #[inline]
    pub fn base_count(&self) -> usize {
        self.bases.len()
    }

    /// Returns the base link at `index`, in attachment order.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index` is past the last base.
    pub fn base_at(&self, index: usize) -> Result<&BaseInfo> {
        self.bases.get(index).ok_or(Error::OutOfRange {
            index,
            size: self.bases.len(),
        })
    }

    /// An iterator over the direct base links.
    #[inline]
    pub fn bases(&self) -> impl ExactSizeIterator<Item = &BaseInfo> {
        self.bases.iter()
    }

    /// The number of declared constructors.
    #[inline]
    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }

    /// An iterator over constructors in declaration order.
    #[inline]
    pub fn constructors(&self) -> impl ExactSizeIterator<Item = &Constructor> {
        self.constructors.iter()
    }

    // -- pointer adjustment --------------------------------------------------

    /// Adjusts an instance pointer of this class to address it as `target`.
    ///
    /// Searches the base hierarchy in both directions: upcasts add the
    /// accumulated base offsets, downcasts subtract them.
    ///
    /// # Errors
    ///
    /// [`Error::ClassUnrelated`] if `target` appears nowhere in this class's
    /// ancestry (or vice versa).
    pub fn apply_offset(&self, pointer: NonNull<u8>, target: &Self) -> Result<NonNull<u8>> {
        if let Some(offset) = self.offset_to_base(target) {
            return Ok(adjusted(pointer, offset));
        }
        if let Some(offset) = target.offset_to_base(self) {
            return Ok(adjusted(pointer, -offset));
        }
        Err(Error::ClassUnrelated {
            from: self.name.clone(),
            to: target.name.clone(),
        })
    }

    /// Accumulated byte offset from this class to an ancestor, or `None` if
    /// `target` is not an ancestor.
    fn offset_to_base(&self, target: &Self) -> Option<isize> {
        if self.id == target.id {
            return Some(0);
        }
        self.bases.iter().find_map(|base| {
            base.class
                .offset_to_base(target)
                .map(|offset| base.offset + offset)
        })
    }

    // -- lifecycle -----------------------------------------------------------

    /// Wraps a raw instance pointer in an erased handle bound to this
    /// metaclass. A null pointer yields the `nothing` handle.
    ///
    /// # Safety
    ///
    /// A non-null `pointer` must address a live, mutable instance of the
    /// described type, outliving the handle and all clones of it.
    pub unsafe fn user_object_from_pointer(self: &Arc<Self>, pointer: *mut u8) -> UserObject {
        match NonNull::new(pointer) {
            // SAFETY: forwarded caller contract.
            Some(pointer) => unsafe { UserObject::from_pointer(Arc::clone(self), pointer) },
            None => UserObject::nothing(),
        }
    }

    /// Runs the destructor thunk on an instance of the described type.
    ///
    /// # Safety
    ///
    /// `pointer` must address a live instance of exactly this type, not
    /// accessed afterwards. With `deallocate` the instance must additionally
    /// be a `Box` allocation of the type, as produced by a constructor.
    pub(crate) unsafe fn destruct(&self, pointer: NonNull<u8>, deallocate: bool) {
        // SAFETY: forwarded caller contract.
        unsafe { (self.destructor)(pointer, deallocate) };
    }

    pub(crate) fn new<T: UserType>(name: String) -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name,
            size: size_of::<T>(),
            properties: Dictionary::new(),
            functions: Dictionary::new(),
            bases: Vec::new(),
            constructors: Vec::new(),
            destructor: destructor_thunk::<T>,
        }
    }
}

#[inline]
fn adjusted(pointer: NonNull<u8>, offset: isize) -> NonNull<u8> {
    // Offsets stay within one allocation, so the result is never null.
    NonNull::new(pointer.as_ptr().wrapping_offset(offset)).unwrap_or(pointer)
}

unsafe fn destructor_thunk<T>(pointer: NonNull<u8>, deallocate: bool) {
    let pointer = pointer.cast::<T>().as_ptr();
    if deallocate {
        // SAFETY: per caller, a live boxed instance dropped exactly once.
        drop(unsafe { Box::from_raw(pointer) });
    } else {
        // SAFETY: per caller, a live instance not accessed afterwards.
        unsafe { core::ptr::drop_in_place(pointer) };
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("properties", &self.properties.len())
            .field("functions", &self.functions.len())
            .field("bases", &self.bases.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
