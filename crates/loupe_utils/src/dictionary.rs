//! A name-keyed table that keeps its entries sorted by key.

use core::fmt::Debug;

// -----------------------------------------------------------------------------
// Dictionary

/// An ordered table mapping string names to values.
///
/// Entries are kept sorted by name, so lookup is O(log n) and index-based
/// enumeration yields entries in name order. Insertion replaces any existing
/// entry with the same name.
///
/// This is the storage behind metaclass member tables, where registration —
/// not lookup — dominates, and stable name-ordered enumeration matters more
/// than raw lookup speed.
///
/// # Examples
///
/// ```
/// use loupe_utils::Dictionary;
///
/// let mut dict = Dictionary::new();
/// dict.insert("y", 2);
/// dict.insert("x", 1);
///
/// assert_eq!(dict.find("x"), Some(&1));
/// assert_eq!(dict.at(0), Some(("x", &1))); // name-sorted order
/// ```
pub struct Dictionary<V> {
    entries: Vec<(String, V)>,
}

impl<V> Dictionary<V> {
    /// Creates an empty `Dictionary`.
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    fn position(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(key, _)| key.as_str().cmp(name))
    }

    /// Inserts a value under `name`, replacing any existing entry.
    ///
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        match self.position(&name) {
            Ok(index) => {
                let slot = &mut self.entries[index].1;
                Some(core::mem::replace(slot, value))
            }
            Err(index) => {
                self.entries.insert(index, (name, value));
                None
            }
        }
    }

    /// Removes the entry with the given name, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        match self.position(name) {
            Ok(index) => Some(self.entries.remove(index).1),
            Err(_) => None,
        }
    }

    /// Returns a reference to the value stored under `name`.
    pub fn find(&self, name: &str) -> Option<&V> {
        match self.position(name) {
            Ok(index) => Some(&self.entries[index].1),
            Err(_) => None,
        }
    }

    /// Returns `true` if an entry with the given name exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    /// Returns the entry at `index` in name-sorted order.
    pub fn at(&self, index: usize) -> Option<(&str, &V)> {
        self.entries
            .get(index)
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the dictionary holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An iterator over `(name, value)` pairs in name-sorted order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &V)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// An iterator over values in name-sorted order.
    #[inline]
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }
}

// -----------------------------------------------------------------------------
// Traits

impl<V> Default for Dictionary<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for Dictionary<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<V: Debug> Debug for Dictionary<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Dictionary;

    #[test]
    fn sorted_enumeration() {
        let mut dict = Dictionary::new();
        dict.insert("c", 3);
        dict.insert("a", 1);
        dict.insert("b", 2);

        let names: Vec<&str> = dict.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(dict.at(1), Some(("b", &2)));
        assert_eq!(dict.at(3), None);
    }

    #[test]
    fn insert_replaces() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.insert("x", 1), None);
        assert_eq!(dict.insert("x", 2), Some(1));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.find("x"), Some(&2));
    }

    #[test]
    fn remove() {
        let mut dict = Dictionary::new();
        dict.insert("x", 1);
        assert_eq!(dict.remove("x"), Some(1));
        assert_eq!(dict.remove("x"), None);
        assert!(dict.is_empty());
    }
}
