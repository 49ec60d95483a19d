//! The process-wide metaclass registry.

use core::any::TypeId;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use loupe_utils::TypeIdMap;
use loupe_utils::hash::HashMap;

use crate::class::Class;
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// ClassObserver

/// Callback interface for registry mutations.
///
/// Observers are notified after a class is inserted and before a removed
/// class becomes unreachable; notification happens outside the registry
/// lock, so observers may perform lookups of their own.
pub trait ClassObserver: Send + Sync + 'static {
    fn class_added(&self, class: &Arc<Class>) {
        let _ = class;
    }

    fn class_removed(&self, class: &Arc<Class>) {
        let _ = class;
    }
}

/// Token returned by [`ClassManager::add_observer`], used to detach.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObserverId(u64);

// -----------------------------------------------------------------------------
// ClassManager

/// The singleton store of metaclasses, keyed by [`TypeId`] and by name.
///
/// Access goes through [`ClassManager::instance`], an `RwLock` shared by
/// the whole process; the convenience lookups on [`Class`] take care of the
/// locking for the common cases.
#[derive(Default)]
pub struct ClassManager {
    classes: TypeIdMap<Arc<Class>>,
    names: HashMap<String, TypeId>,
    observers: Vec<(u64, Arc<dyn ClassObserver>)>,
    next_observer: u64,
}

impl ClassManager {
    /// The process-wide registry, created on first use.
    pub fn instance() -> &'static RwLock<Self> {
        static INSTANCE: OnceLock<RwLock<ClassManager>> = OnceLock::new();
        INSTANCE.get_or_init(RwLock::default)
    }

    /// The number of registered classes.
    #[inline]
    pub fn count(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if a class with the given [`TypeId`] is registered.
    pub fn class_exists(&self, id: TypeId) -> bool {
        self.classes.contains(&id)
    }

    /// Looks up a class by [`TypeId`], or `None` if unregistered.
    pub fn try_by_id(&self, id: TypeId) -> Option<Arc<Class>> {
        self.classes.get(&id).cloned()
    }

    /// Looks up a class by name, or `None` if unknown.
    pub fn try_by_name(&self, name: &str) -> Option<Arc<Class>> {
        self.names.get(name).and_then(|id| self.try_by_id(*id))
    }

    /// An iterator over the registered classes, in no particular order.
    pub fn classes(&self) -> impl ExactSizeIterator<Item = &Arc<Class>> {
        self.classes.values()
    }

    /// Attaches an observer, returning the token that detaches it.
    pub fn add_observer(&mut self, observer: Arc<dyn ClassObserver>) -> ObserverId {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push((id, observer));
        ObserverId(id)
    }

    /// Detaches a previously attached observer. Returns `false` if the
    /// token is unknown.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id.0);
        self.observers.len() != before
    }

    pub(crate) fn check_free(&self, id: TypeId, name: &str) -> Result<()> {
        if self.classes.contains(&id) || (!name.is_empty() && self.names.contains_key(name)) {
            return Err(Error::AlreadyDeclared {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, class: Class) -> Result<Arc<Class>> {
        self.check_free(class.type_id(), class.name())?;
        let class = Arc::new(class);
        self.names
            .insert(class.name().to_owned(), class.type_id());
        self.classes.insert(class.type_id(), Arc::clone(&class));
        Ok(class)
    }

    fn remove(&mut self, id: TypeId, name: &str) -> Result<Arc<Class>> {
        let removed = self
            .classes
            .remove(&id)
            .ok_or_else(|| Error::ClassNotFound {
                name: name.to_owned(),
            })?;
        self.names.remove(removed.name());
        Ok(removed)
    }

    fn observers(&self) -> Vec<Arc<dyn ClassObserver>> {
        self.observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

// -----------------------------------------------------------------------------
// Lock helpers

pub(crate) fn read() -> RwLockReadGuard<'static, ClassManager> {
    match ClassManager::instance().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn write() -> RwLockWriteGuard<'static, ClassManager> {
    match ClassManager::instance().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Inserts a finished class and notifies observers outside the lock.
pub(crate) fn register_class(class: Class) -> Result<Arc<Class>> {
    let (class, observers) = {
        let mut manager = write();
        let class = manager.insert(class)?;
        (class, manager.observers())
    };
    for observer in observers {
        observer.class_added(&class);
    }
    Ok(class)
}

/// Removes a class and notifies observers outside the lock.
///
/// Outstanding `Arc<Class>` handles keep the metadata alive; removal only
/// makes it unreachable through the registry.
pub(crate) fn unregister_class(id: TypeId, name: &str) -> Result<()> {
    let (class, observers) = {
        let mut manager = write();
        let class = manager.remove(id, name)?;
        (class, manager.observers())
    };
    for observer in observers {
        observer.class_removed(&class);
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Automatic registration

/// A deferred declaration, collected at link time and executed by
/// [`declare_all`].
#[cfg(feature = "auto_register")]
pub struct AutoDeclare {
    pub declare: fn() -> Result<()>,
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoDeclare);

#[cfg(feature = "auto_register")]
pub use inventory;

/// Runs every declaration submitted with [`auto_declare!`].
///
/// Declarations already present in the registry are skipped, so calling
/// this more than once is harmless.
///
/// # Errors
///
/// The first error other than [`Error::AlreadyDeclared`] raised by a
/// submitted declaration.
///
/// [`auto_declare!`]: crate::auto_declare
#[cfg(feature = "auto_register")]
pub fn declare_all() -> Result<()> {
    for entry in inventory::iter::<AutoDeclare> {
        match (entry.declare)() {
            Ok(()) | Err(Error::AlreadyDeclared { .. }) => {}
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

/// Submits a declaration function to run during [`declare_all`].
///
/// # Examples
///
/// ```ignore
/// fn declare_point() -> loupe_reflect::error::Result<()> {
///     Class::declare_named::<Point>("Point")?.register()?;
///     Ok(())
/// }
///
/// loupe_reflect::auto_declare!(declare_point);
/// ```
///
/// [`declare_all`]: crate::registry::declare_all
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! auto_declare {
    ($declare:path) => {
        $crate::registry::inventory::submit! {
            $crate::registry::AutoDeclare { declare: $declare }
        }
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{ClassManager, ClassObserver};
    use crate::class::Class;
    use crate::error::Error;

    #[derive(Clone)]
    struct Watched {
        n: i32,
    }
    crate::reflect_class!(Watched);

    #[derive(Default)]
    struct CountingObserver {
        added: AtomicUsize,
        removed: AtomicUsize,
    }

    impl ClassObserver for CountingObserver {
        fn class_added(&self, _class: &Arc<Class>) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn class_removed(&self, _class: &Arc<Class>) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn declare_and_undeclare_update_both_indexes() {
        let observer = Arc::new(CountingObserver::default());
        let token = {
            let mut manager = super::write();
            manager.add_observer(Arc::clone(&observer) as Arc<dyn ClassObserver>)
        };

        let class = Class::declare_named::<Watched>("Watched")
            .unwrap()
            .property("n", |w: &Watched| w.n)
            .register()
            .unwrap();
        assert_eq!(observer.added.load(Ordering::SeqCst), 1);
        assert_eq!(Class::by_name("Watched").unwrap(), class);
        assert_eq!(Class::by_type::<Watched>().unwrap(), class);

        // Duplicate declarations fail on both keys.
        assert!(matches!(
            Class::declare_named::<Watched>("Other"),
            Err(Error::AlreadyDeclared { .. })
        ));

        Class::undeclare::<Watched>().unwrap();
        assert_eq!(observer.removed.load(Ordering::SeqCst), 1);
        assert!(Class::try_by_name("Watched").is_none());
        assert!(Class::try_by_type::<Watched>().is_none());
        // A repeat removal still names the type it was asked about.
        assert!(matches!(
            Class::undeclare::<Watched>(),
            Err(Error::ClassNotFound { name }) if name.contains("Watched")
        ));

        // The outstanding handle is unaffected by removal.
        assert_eq!(class.name(), "Watched");
        assert_eq!(class.property_count(), 1);

        let mut manager = super::write();
        assert!(manager.remove_observer(token));
        assert!(!manager.remove_observer(token));
    }

    #[test]
    fn instance_is_shared() {
        let a = ClassManager::instance() as *const _;
        let b = ClassManager::instance() as *const _;
        assert_eq!(a, b);
    }
}
