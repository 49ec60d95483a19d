//! Serde adapters for values and erased objects.

use serde_core::ser::{Error as _, SerializeMap, SerializeSeq};
use serde_core::{Serialize, Serializer};

use crate::object::UserObject;
use crate::property::{AccessKind, ArrayView};
use crate::value::Value;

impl Serialize for Value {
    /// Serializes the natural form of each kind: `None` as a unit, enums as
    /// their declared name (falling back to the number when the declaration
    /// is gone) and user objects through [`SerialView`].
    ///
    /// References have no serialized form and fail.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Integer(value) | Value::Long(value) => serializer.serialize_i64(*value),
            Value::Real(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Enum(value) => match value.name() {
                Ok(name) => serializer.serialize_str(&name),
                Err(_) => serializer.serialize_i64(value.value()),
            },
            Value::Reference(_) => Err(S::Error::custom(
                "raw references have no serialized form",
            )),
            Value::User(object) => SerialView::new(object).serialize(serializer),
        }
    }
}

// -----------------------------------------------------------------------------
// SerialView

/// Serializes an erased object as a map of its properties, driven by the
/// registered metaclass.
///
/// Nested objects serialize recursively; container properties serialize as
/// sequences of their elements.
///
/// # Examples
///
/// ```
/// use loupe_reflect::archive::SerialView;
/// use loupe_reflect::class::Class;
/// use loupe_reflect::object::UserObject;
///
/// #[derive(Clone)]
/// struct Size {
///     width: i32,
///     height: i32,
/// }
/// loupe_reflect::reflect_class!(Size);
///
/// Class::declare_named::<Size>("Size")
///     .unwrap()
///     .property("width", |s: &Size| s.width)
///     .property("height", |s: &Size| s.height)
///     .register()
///     .unwrap();
///
/// let size = Size { width: 640, height: 480 };
/// let object = UserObject::new(size);
/// let json = serde_json::to_string(&SerialView::new(&object)).unwrap();
/// assert_eq!(json, r#"{"height":480,"width":640}"#);
/// ```
pub struct SerialView<'a> {
    object: &'a UserObject,
}

impl<'a> SerialView<'a> {
    #[inline]
    pub fn new(object: &'a UserObject) -> Self {
        Self { object }
    }
}

impl Serialize for SerialView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let class = self.object.class().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(Some(class.property_count()))?;
        for property in class.properties() {
            if property.access_kind() == AccessKind::Container {
                let view = property.array_view(self.object).map_err(S::Error::custom)?;
                map.serialize_entry(property.name(), &Elements { view: &view })?;
            } else {
                let value = property
                    .get_for_serialization(self.object)
                    .map_err(S::Error::custom)?;
                map.serialize_entry(property.name(), &value)?;
            }
        }
        map.end()
    }
}

struct Elements<'a> {
    view: &'a ArrayView<'a>,
}

impl Serialize for Elements<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let size = self.view.size().map_err(S::Error::custom)?;
        let mut seq = serializer.serialize_seq(Some(size))?;
        for index in 0..size {
            let element = self.view.get(index).map_err(S::Error::custom)?;
            seq.serialize_element(&element)?;
        }
        seq.end()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::SerialView;
    use crate::class::Class;
    use crate::enums::{Enum, EnumValue};
    use crate::object::UserObject;
    use crate::value::Value;

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Phase {
        Solid = 0,
        Liquid = 1,
    }
    crate::reflect_enum!(Phase { Solid, Liquid });

    fn declare_phase() {
        let declared = Enum::declare_named::<Phase>("ser::Phase").and_then(|builder| {
            builder
                .value("Solid", Phase::Solid as i64)
                .value("Liquid", Phase::Liquid as i64)
                .register()
        });
        if declared.is_err() {
            // Another test already declared it.
            Enum::by_type::<Phase>().unwrap();
        }
    }

    #[test]
    fn scalar_values_serialize_to_their_natural_json() {
        assert_eq!(serde_json::to_value(Value::None).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Value::Bool(true)).unwrap(), json!(true));
        assert_eq!(serde_json::to_value(Value::Integer(-3)).unwrap(), json!(-3));
        assert_eq!(serde_json::to_value(Value::Real(0.5)).unwrap(), json!(0.5));
        assert_eq!(
            serde_json::to_value(Value::from("text")).unwrap(),
            json!("text")
        );
    }

    #[test]
    fn enum_values_serialize_by_name() {
        declare_phase();
        let value = Value::from(Phase::Liquid);
        assert_eq!(serde_json::to_value(value).unwrap(), json!("Liquid"));

        // An undeclared enum value falls back to its number.
        #[derive(Copy, Clone)]
        enum Orphan {
            Lone = 9,
        }
        impl crate::enums::EnumType for Orphan {}
        let value = Value::Enum(EnumValue::new::<Orphan>(Orphan::Lone as i64));
        assert_eq!(serde_json::to_value(value).unwrap(), json!(9));
    }

    #[test]
    fn references_refuse_to_serialize() {
        let mut shared = 5_i32;
        let value = Value::from(&raw mut shared);
        assert!(serde_json::to_value(value).is_err());
    }

    #[test]
    fn objects_serialize_as_property_maps() {
        #[derive(Clone)]
        struct Probe {
            depth: f64,
            tags: Vec<String>,
            phase: Phase,
        }
        crate::reflect_class!(Probe);

        declare_phase();
        static DECLARE: std::sync::Once = std::sync::Once::new();
        DECLARE.call_once(|| {
            Class::declare_named::<Probe>("ser::Probe")
                .unwrap()
                .property("depth", |p: &Probe| p.depth)
                .array_property("tags", |p: &Probe| &p.tags, |p: &mut Probe| &mut p.tags)
                .property("phase", |p: &Probe| p.phase)
                .register()
                .unwrap();
        });

        let probe = Probe {
            depth: 12.5,
            tags: vec![String::from("deep"), String::from("cold")],
            phase: Phase::Solid,
        };
        let object = UserObject::new(probe);
        assert_eq!(
            serde_json::to_value(SerialView::new(&object)).unwrap(),
            json!({
                "depth": 12.5,
                "phase": "Solid",
                "tags": ["deep", "cold"],
            })
        );
    }
}
