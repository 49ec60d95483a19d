//! Structured persistence: walking reflected objects in and out of
//! node-based archives.
//!
//! An archive is any tree store implementing [`ArchiveWriter`] or
//! [`ArchiveReader`]; [`save`] and [`load`] walk an object's metaclass and
//! move every property through those node contracts, recursing into nested
//! objects and container elements. The serde adapters in this module's
//! sibling ([`SerialView`]) cover the one-way case where the target is a
//! `serde` format instead of a navigable tree.
//!
//! [`SerialView`]: crate::archive::SerialView

use crate::error::Result;
use crate::object::UserObject;
use crate::property::AccessKind;
use crate::value::{Value, ValueKind};

mod ser;

pub use ser::SerialView;

/// Node name used for the elements of an array node.
const ITEM: &str = "item";

// -----------------------------------------------------------------------------
// Archive contracts

/// The write half of a node-based archive.
///
/// Nodes are lightweight copyable handles, typically indexes into an arena
/// owned by the archive. [`save`] drives this contract; implementations
/// only store what they are handed.
pub trait ArchiveWriter {
    /// Handle to one node of the tree.
    type Node: Copy;

    /// Opens a named child node under `parent`.
    fn begin_child(&mut self, parent: Self::Node, name: &str) -> Self::Node;

    /// Closes a child opened with [`ArchiveWriter::begin_child`].
    fn end_child(&mut self, parent: Self::Node, child: Self::Node);

    /// Opens a named array node under `parent`.
    fn begin_array(&mut self, parent: Self::Node, name: &str) -> Self::Node;

    /// Closes an array opened with [`ArchiveWriter::begin_array`].
    fn end_array(&mut self, parent: Self::Node, array: Self::Node);

    /// Stores a named leaf value under `node`.
    fn set_value(&mut self, node: Self::Node, name: &str, value: Value);
}

/// The read half of a node-based archive.
pub trait ArchiveReader {
    /// Handle to one node of the tree.
    type Node: Copy;

    /// Finds the named child of `node`, or `None` if the archive has no
    /// entry for it.
    fn find_child(&self, node: Self::Node, name: &str) -> Option<Self::Node>;

    /// The item nodes of an array node, in stored order.
    fn array_items(&self, node: Self::Node, name: &str) -> Vec<Self::Node>;

    /// The leaf value stored at `node`, or `None` for a non-leaf.
    fn value(&self, node: Self::Node) -> Option<Value>;
}

// -----------------------------------------------------------------------------
// Walkers

/// Writes every property of `object` under `parent`.
///
/// Nested objects become child nodes and are walked recursively; container
/// properties become array nodes with one `item` entry per element; every
/// other property is stored as a named leaf value.
///
/// # Errors
///
/// [`Error::ClassNotFound`] when the object's type was never declared, plus
/// any error raised reading a property.
///
/// [`Error::ClassNotFound`]: crate::error::Error::ClassNotFound
pub fn save<A: ArchiveWriter>(archive: &mut A, parent: A::Node, object: &UserObject) -> Result<()> {
    let class = object.class()?;
    for property in class.properties() {
        match property.access_kind() {
            AccessKind::User => {
                let nested = property.get(object)?.to::<UserObject>()?;
                let child = archive.begin_child(parent, property.name());
                save(archive, child, &nested)?;
                archive.end_child(parent, child);
            }
            AccessKind::Container => {
                let view = property.array_view(object)?;
                let array = archive.begin_array(parent, property.name());
                for index in 0..view.size()? {
                    let element = view.get(index)?;
                    if view.element_kind() == ValueKind::User {
                        let child = archive.begin_child(array, ITEM);
                        save(archive, child, &element.to::<UserObject>()?)?;
                        archive.end_child(array, child);
                    } else {
                        archive.set_value(array, ITEM, element);
                    }
                }
                archive.end_array(parent, array);
            }
            AccessKind::Simple | AccessKind::Enum => {
                let value = property.get_for_serialization(object)?;
                archive.set_value(parent, property.name(), value);
            }
        }
    }
    Ok(())
}

/// Reads every property of `object` back from the archive node `node`.
///
/// Properties without a matching archive entry are left untouched, so a
/// partial archive updates only what it stores. Array items past a
/// fixed-size container's capacity are dropped; dynamic containers grow to
/// fit the stored item count.
///
/// # Errors
///
/// [`Error::ClassNotFound`] when the object's type was never declared, plus
/// any conversion or write error raised storing a property.
///
/// [`Error::ClassNotFound`]: crate::error::Error::ClassNotFound
pub fn load<A: ArchiveReader>(archive: &A, node: A::Node, object: &UserObject) -> Result<()> {
    let class = object.class()?;
    for property in class.properties() {
        let Some(child) = archive.find_child(node, property.name()) else {
            continue;
        };
        match property.access_kind() {
            AccessKind::User => {
                // Fill the nested object through a writable alias (or a
                // copy, for copying bindings), then store it back.
                let value = property.get_for_deserialization(object)?;
                load(archive, child, &value.to::<UserObject>()?)?;
                property.set(object, &value)?;
            }
            AccessKind::Container => {
                let view = property.array_view(object)?;
                for (index, item) in archive.array_items(child, ITEM).into_iter().enumerate() {
                    if index >= view.size()? {
                        if !view.dynamic() {
                            break;
                        }
                        view.resize(index + 1)?;
                    }
                    if view.element_kind() == ValueKind::User {
                        let element = view.get(index)?;
                        load(archive, item, &element.to::<UserObject>()?)?;
                        view.set(index, &element)?;
                    } else if let Some(value) = archive.value(item) {
                        view.set(index, &value)?;
                    }
                }
            }
            AccessKind::Simple | AccessKind::Enum => {
                if let Some(value) = archive.value(child) {
                    property.set(object, &value)?;
                }
            }
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{ArchiveReader, ArchiveWriter, load, save};
    use crate::class::Class;
    use crate::object::UserObject;
    use crate::value::Value;

    // A minimal arena-backed tree archive.

    #[derive(Default)]
    struct TreeNode {
        name: String,
        value: Option<Value>,
        children: Vec<usize>,
    }

    struct TreeArchive {
        nodes: Vec<TreeNode>,
    }

    impl TreeArchive {
        fn new() -> Self {
            Self {
                nodes: vec![TreeNode::default()],
            }
        }

        fn root(&self) -> usize {
            0
        }

        fn push(&mut self, parent: usize, name: &str) -> usize {
            let index = self.nodes.len();
            self.nodes.push(TreeNode {
                name: name.to_owned(),
                value: None,
                children: Vec::new(),
            });
            self.nodes[parent].children.push(index);
            index
        }
    }

    impl ArchiveWriter for TreeArchive {
        type Node = usize;

        fn begin_child(&mut self, parent: usize, name: &str) -> usize {
            self.push(parent, name)
        }

        fn end_child(&mut self, _parent: usize, _child: usize) {}

        fn begin_array(&mut self, parent: usize, name: &str) -> usize {
            self.push(parent, name)
        }

        fn end_array(&mut self, _parent: usize, _array: usize) {}

        fn set_value(&mut self, node: usize, name: &str, value: Value) {
            let child = self.push(node, name);
            self.nodes[child].value = Some(value);
        }
    }

    impl ArchiveReader for TreeArchive {
        type Node = usize;

        fn find_child(&self, node: usize, name: &str) -> Option<usize> {
            self.nodes[node]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].name == name)
        }

        fn array_items(&self, node: usize, name: &str) -> Vec<usize> {
            self.nodes[node]
                .children
                .iter()
                .copied()
                .filter(|&child| self.nodes[child].name == name)
                .collect()
        }

        fn value(&self, node: usize) -> Option<Value> {
            self.nodes[node].value.clone()
        }
    }

    // Test fixture: a small scene-graph-like hierarchy.

    #[derive(Clone, Debug, PartialEq)]
    struct Anchor {
        x: f64,
        y: f64,
    }
    crate::reflect_class!(Anchor);

    #[derive(Clone, Debug, PartialEq)]
    struct Shape {
        label: String,
        anchor: Anchor,
        sides: Vec<i32>,
        rgba: [i32; 4],
    }
    crate::reflect_class!(Shape);

    fn declare_fixture() {
        static DECLARE: std::sync::Once = std::sync::Once::new();
        DECLARE.call_once(|| {
            Class::declare_named::<Anchor>("archive::Anchor")
                .unwrap()
                .property_rw("x", |a: &Anchor| a.x, |a: &mut Anchor, x| a.x = x)
                .property_rw("y", |a: &Anchor| a.y, |a: &mut Anchor, y| a.y = y)
                .register()
                .unwrap();
            Class::declare_named::<Shape>("archive::Shape")
                .unwrap()
                .property_rw(
                    "label",
                    |s: &Shape| s.label.clone(),
                    |s: &mut Shape, label| s.label = label,
                )
                .property_ref(
                    "anchor",
                    |s: &Shape| &s.anchor,
                    |s: &mut Shape| &mut s.anchor,
                )
                .array_property("sides", |s: &Shape| &s.sides, |s: &mut Shape| &mut s.sides)
                .array_property("rgba", |s: &Shape| &s.rgba, |s: &mut Shape| &mut s.rgba)
                .register()
                .unwrap();
        });
    }

    fn sample() -> Shape {
        Shape {
            label: String::from("hexagon"),
            anchor: Anchor { x: 1.5, y: -2.0 },
            sides: vec![6, 7, 8],
            rgba: [255, 128, 0, 255],
        }
    }

    #[test]
    fn round_trip_restores_every_property() {
        declare_fixture();

        let source = sample();
        let mut archive = TreeArchive::new();
        {
            let root = archive.root();
            let object = unsafe { UserObject::from_ref(&source) };
            save(&mut archive, root, &object).unwrap();
        }

        let mut restored = Shape {
            label: String::new(),
            anchor: Anchor { x: 0.0, y: 0.0 },
            sides: Vec::new(),
            rgba: [0; 4],
        };
        let object = unsafe { UserObject::from_mut(&mut restored) };
        load(&archive, archive.root(), &object).unwrap();
        drop(object);

        assert_eq!(restored, source);
    }

    #[test]
    fn fixed_array_drops_surplus_items() {
        declare_fixture();

        let source = sample();
        let mut archive = TreeArchive::new();
        {
            let root = archive.root();
            let object = unsafe { UserObject::from_ref(&source) };
            save(&mut archive, root, &object).unwrap();
        }
        // Append two extra items to the stored color array.
        let rgba = archive.find_child(archive.root(), "rgba").unwrap();
        archive.set_value(rgba, "item", Value::Integer(1));
        archive.set_value(rgba, "item", Value::Integer(2));

        let mut restored = sample();
        let object = unsafe { UserObject::from_mut(&mut restored) };
        load(&archive, archive.root(), &object).unwrap();
        drop(object);

        assert_eq!(restored.rgba, [255, 128, 0, 255]);
        // The dynamic container keeps growing instead.
        assert_eq!(restored.sides, vec![6, 7, 8]);
    }

    #[test]
    fn dynamic_array_grows_to_stored_size() {
        declare_fixture();

        let mut long_sided = sample();
        long_sided.sides = vec![1, 2, 3, 4, 5];
        let mut archive = TreeArchive::new();
        {
            let root = archive.root();
            let object = unsafe { UserObject::from_ref(&long_sided) };
            save(&mut archive, root, &object).unwrap();
        }

        let mut restored = sample();
        restored.sides = vec![9];
        let object = unsafe { UserObject::from_mut(&mut restored) };
        load(&archive, archive.root(), &object).unwrap();
        drop(object);

        assert_eq!(restored.sides, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn partial_archive_leaves_missing_properties_untouched() {
        declare_fixture();

        let mut archive = TreeArchive::new();
        let root = archive.root();
        archive.set_value(root, "label", Value::from("renamed"));

        let mut shape = sample();
        let object = unsafe { UserObject::from_mut(&mut shape) };
        load(&archive, root, &object).unwrap();
        drop(object);

        assert_eq!(shape.label, "renamed");
        assert_eq!(shape.anchor, Anchor { x: 1.5, y: -2.0 });
        assert_eq!(shape.sides, vec![6, 7, 8]);
    }

    #[test]
    fn nested_objects_become_child_nodes() {
        declare_fixture();

        let source = sample();
        let mut archive = TreeArchive::new();
        {
            let root = archive.root();
            let object = unsafe { UserObject::from_ref(&source) };
            save(&mut archive, root, &object).unwrap();
        }

        let anchor = archive.find_child(archive.root(), "anchor").unwrap();
        let x = archive.find_child(anchor, "x").unwrap();
        assert_eq!(archive.value(x), Some(Value::Real(1.5)));
    }
}
