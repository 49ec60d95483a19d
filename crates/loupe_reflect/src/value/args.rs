//! The ordered argument list used for calls and constructor matching.

use crate::value::{ToValue, Value};

// -----------------------------------------------------------------------------
// Args

/// An ordered, heterogeneous list of erased values.
///
/// Used both to invoke functions and to match constructor signatures.
/// Build one from a tuple of convertible values, from a `Vec<Value>`, or
/// with the [`args!`] macro.
///
/// # Examples
///
/// ```
/// use loupe_reflect::{args, value::Args};
///
/// let list = Args::from((2, "three"));
/// assert_eq!(list.len(), 2);
///
/// let same = args![2, "three"];
/// assert_eq!(same.len(), 2);
/// ```
///
/// [`args!`]: crate::args
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    /// The empty argument list.
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the list holds no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the argument at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Appends an argument.
    #[inline]
    pub fn push(&mut self, value: impl ToValue) {
        self.0.push(value.to_value());
    }

    /// An iterator over the arguments in call order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Args {
    #[inline]
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

macro_rules! impl_args_from_tuple {
    ($($name:ident : $index:tt),*) => {
        impl<$($name: ToValue),*> From<($($name,)*)> for Args {
            #[allow(unused_variables, clippy::unused_unit)]
            fn from(tuple: ($($name,)*)) -> Self {
                Self(vec![$(tuple.$index.to_value()),*])
            }
        }
    };
}

impl_args_from_tuple!();
impl_args_from_tuple!(A0: 0);
impl_args_from_tuple!(A0: 0, A1: 1);
impl_args_from_tuple!(A0: 0, A1: 1, A2: 2);
impl_args_from_tuple!(A0: 0, A1: 1, A2: 2, A3: 3);
impl_args_from_tuple!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);

/// Builds an [`Args`] list from a comma-separated list of values.
///
/// # Examples
///
/// ```
/// use loupe_reflect::args;
///
/// let list = args![1, 2.5, "three"];
/// assert_eq!(list.len(), 3);
/// ```
///
/// [`Args`]: crate::value::Args
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        $crate::value::Args::from(::std::vec![
            $($crate::value::ToValue::to_value(&$value)),*
        ])
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Args;
    use crate::value::{Value, ValueKind};

    #[test]
    fn tuple_conversion_preserves_order_and_kinds() {
        let list = Args::from((true, 2, "three"));
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0).map(Value::kind), Some(ValueKind::Boolean));
        assert_eq!(list.get(1).map(Value::kind), Some(ValueKind::Integer));
        assert_eq!(list.get(2).map(Value::kind), Some(ValueKind::String));
        assert_eq!(list.get(3), None);
    }

    #[test]
    fn empty() {
        let list = Args::empty();
        assert!(list.is_empty());
        assert_eq!(list, Args::from(()));
    }

    #[test]
    fn push_appends() {
        let mut list = Args::empty();
        list.push(1);
        list.push("two");
        assert_eq!(list.len(), 2);
    }
}
