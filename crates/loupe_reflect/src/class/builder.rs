//! The declaration builder that populates a metaclass.

use core::any::TypeId;
use core::marker::PhantomData;
use std::sync::Arc;

use crate::class::{BaseInfo, Class, ClassConstructor};
use crate::error::{Error, Result};
use crate::function::{Function, Method, StaticFunction};
use crate::object::UserType;
use crate::property::{ArrayAdapter, Property};
use crate::registry;
use crate::value::{FromValue, ToValue};

// -----------------------------------------------------------------------------
// ClassBuilder

/// Populates the metaclass of `T`, then registers it atomically.
///
/// Obtained from [`Class::declare`]. The class under construction is
/// detached: nothing is visible in the registry until [`register`] runs,
/// and dropping the builder abandons the declaration without side effects.
///
/// Members use replace-on-duplicate semantics: re-declaring a property or
/// function name silently replaces the previous entry.
///
/// [`register`]: ClassBuilder::register
///
/// # Examples
///
/// ```
/// use loupe_reflect::class::Class;
///
/// #[derive(Clone)]
/// struct Circle {
///     radius: f64,
/// }
/// loupe_reflect::reflect_class!(Circle);
///
/// let class = Class::declare_named::<Circle>("Circle")
///     .unwrap()
///     .property_rw("radius", |c: &Circle| c.radius, |c: &mut Circle, r| c.radius = r)
///     .function("area", |c: &Circle| c.radius * c.radius * core::f64::consts::PI)
///     .constructor(|radius: f64| Circle { radius })
///     .register()
///     .unwrap();
///
/// assert!(class.has_property("radius"));
/// assert!(class.has_function("area"));
/// ```
pub struct ClassBuilder<T> {
    class: Class,
    _marker: PhantomData<fn() -> T>,
}

impl<T: UserType> ClassBuilder<T> {
    pub(crate) fn new(name: String) -> Result<Self> {
        // Early duplicate check; `register` re-checks under the write lock.
        registry::read().check_free(TypeId::of::<T>(), &name)?;
        Ok(Self {
            class: Class::new::<T>(name),
            _marker: PhantomData,
        })
    }

    /// Attaches `U` as a base class.
    ///
    /// `offset` is the byte offset of the embedded base inside `T`, as
    /// produced by `core::mem::offset_of!`. The base's current properties
    /// and functions are copied into this class's tables; members the base
    /// gains later are not inherited retroactively.
    ///
    /// # Errors
    ///
    /// [`Error::ClassNotFound`] if `U` is not yet declared;
    /// [`Error::TypeAmbiguity`] if `U` is already attached as a base.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use loupe_reflect::class::Class;
    /// # #[derive(Clone)]
    /// # struct Base;
    /// # loupe_reflect::reflect_class!(Base);
    /// #[derive(Clone)]
    /// struct Derived {
    ///     base: Base,
    ///     extra: i32,
    /// }
    /// loupe_reflect::reflect_class!(Derived);
    ///
    /// let class = Class::declare_named::<Derived>("Derived")
    ///     .unwrap()
    ///     .base::<Base>(core::mem::offset_of!(Derived, base))
    ///     .unwrap()
    ///     .register()
    ///     .unwrap();
    /// ```
    pub fn base<U: UserType>(mut self, offset: usize) -> Result<Self> {
        let base = Class::by_type::<U>()?;
        if self
            .class
            .bases
            .iter()
            .any(|info| info.class.type_id() == base.type_id())
        {
            return Err(Error::TypeAmbiguity {
                name: base.name().to_owned(),
            });
        }
        for (name, property) in base.properties.iter() {
            self.class.properties.insert(name, Arc::clone(property));
        }
        for (name, function) in base.functions.iter() {
            self.class.functions.insert(name, Arc::clone(function));
        }
        self.class.bases.push(BaseInfo {
            class: base,
            offset: offset as isize,
        });
        Ok(self)
    }

    // -- properties ----------------------------------------------------------

    /// Adds a read-only property over a copying getter.
    pub fn property<V, G>(self, name: &str, get: G) -> Self
    where
        V: ToValue + FromValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.add_property(Property::read_only(name, get))
    }

    /// Adds a read-write property over a copying getter/setter pair.
    pub fn property_rw<V, G, S>(self, name: &str, get: G, set: S) -> Self
    where
        V: ToValue + FromValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.add_property(Property::read_write(name, get, set))
    }

    /// Adds a field-like property bound through live references.
    pub fn property_ref<V, G, M>(self, name: &str, get: G, get_mut: M) -> Self
    where
        V: ToValue + FromValue + 'static,
        G: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut V + Send + Sync + 'static,
    {
        self.add_property(Property::by_ref(name, get, get_mut))
    }

    /// Adds a container property over an array-like field.
    pub fn array_property<A, G, M>(self, name: &str, get: G, get_mut: M) -> Self
    where
        A: ArrayAdapter,
        G: for<'a> Fn(&'a T) -> &'a A + Send + Sync + 'static,
        M: for<'a> Fn(&'a mut T) -> &'a mut A + Send + Sync + 'static,
    {
        self.add_property(Property::array(name, get, get_mut))
    }

    /// Adds an already-built property, replacing any entry with the same
    /// name.
    pub fn add_property(mut self, property: Property) -> Self {
        self.class
            .properties
            .insert(property.name().to_owned(), Arc::new(property));
        self
    }

    // -- functions -----------------------------------------------------------

    /// Adds a method of `T`.
    pub fn function<Marker, F>(self, name: &str, function: F) -> Self
    where
        F: Method<T, Marker>,
    {
        self.add_function(Function::method(name, function))
    }

    /// Adds a zero-argument accessor returning an internal reference.
    pub fn ref_function<V, F>(self, name: &str, function: F) -> Self
    where
        V: ToValue + FromValue + 'static,
        F: for<'a> Fn(&'a T) -> &'a V + Send + Sync + 'static,
    {
        self.add_function(Function::ref_method(name, function))
    }

    /// Adds a callable requiring no instance.
    pub fn static_function<Marker, F>(self, name: &str, function: F) -> Self
    where
        F: StaticFunction<Marker>,
    {
        self.add_function(Function::static_fn(name, function))
    }

    /// Adds an already-built function, replacing any entry with the same
    /// name.
    pub fn add_function(mut self, function: Function) -> Self {
        self.class
            .functions
            .insert(function.name().to_owned(), Arc::new(function));
        self
    }

    // -- constructors --------------------------------------------------------

    /// Appends a constructor. Constructors are matched in declaration
    /// order; the first whose signature accepts the arguments wins.
    pub fn constructor<Marker, F>(mut self, function: F) -> Self
    where
        F: ClassConstructor<T, Marker>,
    {
        self.class.constructors.push(function.into_constructor());
        self
    }

    // -- external mappers ----------------------------------------------------

    /// Delegates member enumeration to an external adapter.
    ///
    /// Used for wrapper-like types that expose a fixed set of synthetic
    /// members instead of native fields.
    pub fn external<M: ExternalMapper<T>>(mut self) -> Self {
        for property in M::properties() {
            self = self.add_property(property);
        }
        for function in M::functions() {
            self = self.add_function(function);
        }
        self
    }

    /// Inserts the finished metaclass into the registry and notifies
    /// observers.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeclared`] if the type or name was registered since
    /// the builder was created.
    pub fn register(self) -> Result<Arc<Class>> {
        registry::register_class(self.class)
    }
}

// -----------------------------------------------------------------------------
// ExternalMapper

/// An externally supplied member enumeration for `T`.
///
/// Implementors build their members with the [`Property`] and [`Function`]
/// factories.
pub trait ExternalMapper<T: UserType> {
    fn properties() -> Vec<Property>;

    fn functions() -> Vec<Function> {
        Vec::new()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::ExternalMapper;
    use crate::class::Class;
    use crate::error::Error;
    use crate::function::Function;
    use crate::object::UserObject;
    use crate::property::Property;
    use crate::value::Value;

    #[derive(Clone, Debug, PartialEq)]
    struct Named {
        name: String,
    }
    crate::reflect_class!(Named);

    #[derive(Clone, Debug, PartialEq)]
    struct Tagged {
        tag: i32,
    }
    crate::reflect_class!(Tagged);

    #[derive(Clone, Debug, PartialEq)]
    struct Entity {
        named: Named,
        tagged: Tagged,
        health: i32,
    }
    crate::reflect_class!(Entity);

    // Tests share one process-wide registry; `Once` makes the declaration
    // happen exactly once and blocks the other tests until it is complete.
    fn declare_hierarchy() {
        static DECLARE: std::sync::Once = std::sync::Once::new();
        DECLARE.call_once(declare_hierarchy_inner);
    }

    fn declare_hierarchy_inner() {
        Class::declare_named::<Named>("Named")
            .and_then(|builder| {
                builder
                    .property_rw(
                        "name",
                        |n: &Named| n.name.clone(),
                        |n: &mut Named, v| n.name = v,
                    )
                    .register()
            })
            .unwrap();
        Class::declare_named::<Tagged>("Tagged")
            .and_then(|builder| {
                builder
                    .property_rw("tag", |t: &Tagged| t.tag, |t: &mut Tagged, v| t.tag = v)
                    .register()
            })
            .unwrap();
        Class::declare_named::<Entity>("Entity")
            .and_then(|builder| {
                builder
                    .base::<Named>(core::mem::offset_of!(Entity, named))?
                    .base::<Tagged>(core::mem::offset_of!(Entity, tagged))?
                    .property_rw(
                        "health",
                        |e: &Entity| e.health,
                        |e: &mut Entity, v| e.health = v,
                    )
                    .register()
            })
            .unwrap();
    }

    fn entity() -> Entity {
        Entity {
            named: Named {
                name: "orc".to_owned(),
            },
            tagged: Tagged { tag: 7 },
            health: 100,
        }
    }

    #[test]
    fn bases_copy_members_and_record_offsets() {
        declare_hierarchy();
        let class = Class::by_name("Entity").unwrap();

        assert_eq!(class.base_count(), 2);
        assert_eq!(class.property_count(), 3);
        assert!(class.has_property("name"));
        assert!(class.has_property("tag"));
        assert!(class.has_property("health"));

        // Inherited properties read through the adjusted pointer.
        let mut instance = entity();
        let object = unsafe { UserObject::from_mut(&mut instance) };
        let name = class.property("name").unwrap().get(&object).unwrap();
        assert_eq!(name, Value::String("orc".to_owned()));
        let tag = class.property("tag").unwrap().get(&object).unwrap();
        assert_eq!(tag, Value::Integer(7));

        // And write through it as well.
        class
            .property("tag")
            .unwrap()
            .set(&object, &Value::from(9))
            .unwrap();
        drop(object);
        assert_eq!(instance.tagged.tag, 9);
    }

    #[test]
    fn derived_handle_converts_to_base_and_back() {
        declare_hierarchy();
        let mut instance = entity();
        let object = unsafe { UserObject::from_mut(&mut instance) };

        // Upcast: extract the embedded base by value.
        let tagged = object.get::<Tagged>().unwrap();
        assert_eq!(tagged, Tagged { tag: 7 });

        // Downcast: a handle wrapping the base sub-object recovers the
        // derived instance.
        let entity_class = Class::by_name("Entity").unwrap();
        let tagged_class = Class::by_name("Tagged").unwrap();
        let base_pointer = entity_class
            .apply_offset(object.pointer().unwrap(), &tagged_class)
            .unwrap();
        let base_object =
            unsafe { tagged_class.user_object_from_pointer(base_pointer.as_ptr()) };
        assert_eq!(base_object.get::<Entity>().unwrap().health, 100);
    }

    #[test]
    fn unrelated_classes_do_not_convert() {
        declare_hierarchy();
        let named = Class::by_name("Named").unwrap();
        let tagged = Class::by_name("Tagged").unwrap();
        let mut instance = Named {
            name: String::new(),
        };
        let object = unsafe { UserObject::from_mut(&mut instance) };
        assert!(matches!(
            named.apply_offset(object.pointer().unwrap(), &tagged),
            Err(Error::ClassUnrelated { .. })
        ));
    }

    #[test]
    fn duplicate_base_is_ambiguous() {
        declare_hierarchy();

        #[derive(Clone)]
        struct Twice {
            a: Named,
        }
        crate::reflect_class!(Twice);

        let result = Class::declare_named::<Twice>("Twice").and_then(|builder| {
            builder
                .base::<Named>(core::mem::offset_of!(Twice, a))?
                .base::<Named>(core::mem::offset_of!(Twice, a))
                .map(|_| ())
        });
        assert!(matches!(result, Err(Error::TypeAmbiguity { .. })));
    }

    #[test]
    fn duplicate_member_names_replace() {
        #[derive(Clone)]
        struct Replaced {
            n: i32,
        }
        crate::reflect_class!(Replaced);

        let class = Class::declare_named::<Replaced>("Replaced")
            .unwrap()
            .property("n", |r: &Replaced| r.n)
            .property("n", |r: &Replaced| r.n * 10)
            .register()
            .unwrap();

        assert_eq!(class.property_count(), 1);
        let object = UserObject::new(Replaced { n: 4 });
        assert_eq!(
            class.property("n").unwrap().get(&object).unwrap(),
            Value::Integer(40)
        );
        Class::undeclare::<Replaced>().unwrap();
    }

    #[test]
    fn external_mapper_contributes_members() {
        #[derive(Clone)]
        struct Wrapped {
            value: Option<i32>,
        }
        crate::reflect_class!(Wrapped);

        struct OptionMapper;

        impl ExternalMapper<Wrapped> for OptionMapper {
            fn properties() -> Vec<Property> {
                vec![
                    Property::read_only("has_value", |w: &Wrapped| w.value.is_some()),
                    Property::read_write(
                        "value",
                        |w: &Wrapped| w.value.unwrap_or_default(),
                        |w: &mut Wrapped, v| w.value = Some(v),
                    ),
                ]
            }

            fn functions() -> Vec<Function> {
                vec![Function::method("reset", |w: &mut Wrapped| {
                    w.value = None;
                })]
            }
        }

        let class = Class::declare_named::<Wrapped>("Wrapped")
            .unwrap()
            .external::<OptionMapper>()
            .register()
            .unwrap();

        let object = UserObject::new(Wrapped { value: Some(3) });
        assert_eq!(
            class.property("has_value").unwrap().get(&object).unwrap(),
            Value::Bool(true)
        );
        class
            .function("reset")
            .unwrap()
            .call(&object, &crate::value::Args::empty())
            .unwrap();
        assert_eq!(
            class.property("has_value").unwrap().get(&object).unwrap(),
            Value::Bool(false)
        );
        Class::undeclare::<Wrapped>().unwrap();
    }
}
