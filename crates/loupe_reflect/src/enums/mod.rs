//! Metadata for registered enums.
//!
//! An [`Enum`] records the name↔number pairs a native enum declares, so
//! erased code can validate and round-trip enum values by name. Enums live
//! in their own process-wide registry, separate from metaclasses.

use core::any::{TypeId, type_name};
use core::cmp::Ordering;
use core::marker::PhantomData;
use std::sync::{Arc, OnceLock, RwLock};

use loupe_utils::TypeIdMap;
use loupe_utils::hash::HashMap;

use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// EnumType

/// Marker for native enums exposed through the erasure layer.
///
/// Implemented by the [`reflect_enum!`] macro; not meant to be implemented
/// by hand.
///
/// [`reflect_enum!`]: crate::reflect_enum
pub trait EnumType: Copy + 'static {}

// -----------------------------------------------------------------------------
// Enum

/// The metadata of a registered enum: its name and declared value pairs.
///
/// Pairs keep declaration order; lookups scan linearly, which is fine for
/// the handful of values a typical enum declares.
#[derive(Debug)]
pub struct Enum {
    id: TypeId,
    name: String,
    values: Vec<(String, i64)>,
}

impl Enum {
    /// Starts declaring the enum `E` under its Rust type name.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeclared`] if `E` or the name is already registered.
    pub fn declare<E: EnumType>() -> Result<EnumBuilder<E>> {
        Self::declare_named::<E>(type_name::<E>())
    }

    /// Starts declaring the enum `E` under an explicit name.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeclared`] if `E` or the name is already registered.
    pub fn declare_named<E: EnumType>(name: impl Into<String>) -> Result<EnumBuilder<E>> {
        EnumBuilder::new(name.into())
    }

    /// Removes the enum `E` from the registry.
    ///
    /// # Errors
    ///
    /// [`Error::EnumNotFound`] if `E` was never declared.
    pub fn undeclare<E: EnumType>() -> Result<()> {
        manager_write().remove(TypeId::of::<E>(), type_name::<E>())
    }

    /// Looks up the metadata of the enum `E`.
    ///
    /// # Errors
    ///
    /// [`Error::EnumNotFound`] if `E` was never declared.
    pub fn by_type<E: EnumType>() -> Result<Arc<Self>> {
        Self::try_by_type::<E>().ok_or_else(|| Error::EnumNotFound {
            name: type_name::<E>().to_owned(),
        })
    }

    /// Looks up the metadata of the enum `E`, or `None` if undeclared.
    pub fn try_by_type<E: EnumType>() -> Option<Arc<Self>> {
        manager_read().by_id(TypeId::of::<E>())
    }

    /// Looks up an enum by its registered name.
    ///
    /// # Errors
    ///
    /// [`Error::EnumNotFound`] if no enum has that name.
    pub fn by_name(name: &str) -> Result<Arc<Self>> {
        Self::try_by_name(name).ok_or_else(|| Error::EnumNotFound {
            name: name.to_owned(),
        })
    }

    /// Looks up an enum by name, or `None` if unknown.
    pub fn try_by_name(name: &str) -> Option<Arc<Self>> {
        manager_read().by_name(name)
    }

    /// The registered name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The [`TypeId`] of the native enum.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The number of declared value pairs.
    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Returns the pair at `index`, in declaration order.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `index` is past the last pair.
    pub fn pair_at(&self, index: usize) -> Result<(&str, i64)> {
        self.values
            .get(index)
            .map(|(name, number)| (name.as_str(), *number))
            .ok_or(Error::OutOfRange {
                index,
                size: self.values.len(),
            })
    }

    /// Returns `true` if a value with the given name is declared.
    pub fn has_name(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    /// Returns `true` if the given number is a declared value.
    pub fn has_value(&self, number: i64) -> bool {
        self.values.iter().any(|(_, n)| *n == number)
    }

    /// Returns the number declared under `name`.
    ///
    /// # Errors
    ///
    /// [`Error::EnumValueNotFound`] if no value has that name.
    pub fn value(&self, name: &str) -> Result<i64> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, number)| *number)
            .ok_or_else(|| Error::EnumValueNotFound {
                name: self.name.clone(),
                value: name.to_owned(),
            })
    }

    /// Returns the name declared for `number`.
    ///
    /// # Errors
    ///
    /// [`Error::EnumValueNotFound`] if the number is not a declared value.
    pub fn name_of(&self, number: i64) -> Result<&str> {
        self.values
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| Error::EnumValueNotFound {
                name: self.name.clone(),
                value: number.to_string(),
            })
    }
}

impl PartialEq for Enum {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// -----------------------------------------------------------------------------
// EnumBuilder

/// Declares the value pairs of an enum, then registers it.
///
/// # Examples
///
/// ```
/// use loupe_reflect::enums::Enum;
/// use loupe_reflect::reflect_enum;
///
/// #[derive(Copy, Clone)]
/// enum Mode {
///     Off = 0,
///     On = 1,
/// }
/// reflect_enum!(Mode { Off, On });
///
/// let declared = Enum::declare_named::<Mode>("Mode")
///     .unwrap()
///     .value("Off", Mode::Off as i64)
///     .value("On", Mode::On as i64)
///     .register()
///     .unwrap();
///
/// assert_eq!(declared.value("On").unwrap(), 1);
/// ```
pub struct EnumBuilder<E> {
    declaration: Enum,
    _marker: PhantomData<fn() -> E>,
}

impl<E: EnumType> EnumBuilder<E> {
    fn new(name: String) -> Result<Self> {
        manager_read().check_free(TypeId::of::<E>(), &name)?;
        Ok(Self {
            declaration: Enum {
                id: TypeId::of::<E>(),
                name,
                values: Vec::new(),
            },
            _marker: PhantomData,
        })
    }

    /// Declares a name↔number pair. A duplicate name replaces the old pair.
    pub fn value(mut self, name: impl Into<String>, number: i64) -> Self {
        let name = name.into();
        let values = &mut self.declaration.values;
        match values.iter_mut().find(|(n, _)| *n == name) {
            Some(pair) => pair.1 = number,
            None => values.push((name, number)),
        }
        self
    }

    /// Inserts the finished declaration into the registry.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeclared`] if the enum or its name was registered
    /// concurrently since the builder was created.
    pub fn register(self) -> Result<Arc<Enum>> {
        manager_write().insert(self.declaration)
    }
}

// -----------------------------------------------------------------------------
// EnumValue

/// An erased enum value: a number tagged with its native enum type.
///
/// The declaration is resolved lazily against the registry, so a handle can
/// be built before its enum is declared; name lookups fail until then.
#[derive(Copy, Clone, Debug)]
pub struct EnumValue {
    id: TypeId,
    value: i64,
}

impl EnumValue {
    /// Wraps a number as a value of the enum `E`.
    pub fn new<E: EnumType>(value: i64) -> Self {
        Self {
            id: TypeId::of::<E>(),
            value,
        }
    }

    /// The numeric value.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// The [`TypeId`] of the native enum.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Resolves the enum metadata this value belongs to.
    ///
    /// # Errors
    ///
    /// [`Error::EnumNotFound`] if the enum is not (or no longer) declared.
    pub fn declaration(&self) -> Result<Arc<Enum>> {
        manager_read()
            .by_id(self.id)
            .ok_or_else(|| Error::EnumNotFound {
                name: String::from("<unresolved>"),
            })
    }

    /// Resolves the declared name of this value.
    ///
    /// # Errors
    ///
    /// [`Error::EnumNotFound`] if the enum is undeclared;
    /// [`Error::EnumValueNotFound`] if the number is not a declared value.
    pub fn name(&self) -> Result<String> {
        self.declaration()
            .and_then(|declared| declared.name_of(self.value).map(str::to_owned))
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.value == other.value
    }
}

impl PartialOrd for EnumValue {
    /// Values of different enums are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.id == other.id).then(|| self.value.cmp(&other.value))
    }
}

// -----------------------------------------------------------------------------
// EnumManager

/// The process-wide enum registry, keyed by type id and by name.
#[derive(Default)]
struct EnumManager {
    enums: TypeIdMap<Arc<Enum>>,
    names: HashMap<String, TypeId>,
}

impl EnumManager {
    fn check_free(&self, id: TypeId, name: &str) -> Result<()> {
        if self.enums.contains(&id) || self.names.contains_key(name) {
            return Err(Error::AlreadyDeclared {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, declaration: Enum) -> Result<Arc<Enum>> {
        self.check_free(declaration.id, &declaration.name)?;
        let declaration = Arc::new(declaration);
        self.names
            .insert(declaration.name.clone(), declaration.id);
        self.enums.insert(declaration.id, Arc::clone(&declaration));
        Ok(declaration)
    }

    fn remove(&mut self, id: TypeId, name: &str) -> Result<()> {
        let removed = self.enums.remove(&id).ok_or_else(|| Error::EnumNotFound {
            name: name.to_owned(),
        })?;
        self.names.remove(removed.name());
        Ok(())
    }

    fn by_id(&self, id: TypeId) -> Option<Arc<Enum>> {
        self.enums.get(&id).cloned()
    }

    fn by_name(&self, name: &str) -> Option<Arc<Enum>> {
        self.names.get(name).and_then(|id| self.by_id(*id))
    }
}

fn manager() -> &'static RwLock<EnumManager> {
    static MANAGER: OnceLock<RwLock<EnumManager>> = OnceLock::new();
    MANAGER.get_or_init(RwLock::default)
}

fn manager_read() -> std::sync::RwLockReadGuard<'static, EnumManager> {
    match manager().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn manager_write() -> std::sync::RwLockWriteGuard<'static, EnumManager> {
    match manager().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// -----------------------------------------------------------------------------
// Tests
