//! # Ordered Multi-Value Map
//!
//! Insertion-ordered multimap consumed by the object pool for name-indexed
//! record lookup. Values under one key keep their insertion order; removal
//! is by value or whole-key.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// A map from keys to insertion-ordered lists of values.
///
/// Thin adapter over `HashMap<K, Vec<V>>`: the per-key range preserves
/// insertion order, supports remove-by-value and remove-all, and empty
/// ranges are dropped from the map.
#[derive(Debug)]
pub struct MultiMap<K, V> {
    map: HashMap<K, Vec<V>>,
}

impl<K: Eq + Hash, V: PartialEq> MultiMap<K, V> {
    /// Creates an empty multimap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Returns the number of keys with at least one value.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map holds no keys.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns `true` if the key has at least one value.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Returns `true` if `value` is present under `key`.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).is_some_and(|range| range.contains(value))
    }

    /// Returns the insertion-ordered range for `key`, empty if absent.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> &[V]
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).map_or(&[], Vec::as_slice)
    }

    /// Appends `value` to the range for `key`.
    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().push(value);
    }

    /// Removes the first occurrence of `value` under `key`.
    ///
    /// Returns `false` if the key or the value was not present.
    pub fn remove<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let Some(range) = self.map.get_mut(key) else {
            return false;
        };
        let Some(index) = range.iter().position(|v| v == value) else {
            return false;
        };
        range.remove(index);
        if range.is_empty() {
            self.map.remove(key);
        }
        true
    }

    /// Removes every value under `key`.
    ///
    /// Returns `false` if the key was not present.
    pub fn remove_all<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.remove(key).is_some()
    }

    /// Removes every key and value.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Iterates over `(key, range)` pairs in unspecified key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> {
        self.map.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl<K: Eq + Hash, V: PartialEq> Default for MultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map: MultiMap<&str, u32> = MultiMap::new();
        map.insert("a", 3);
        map.insert("a", 1);
        map.insert("a", 2);

        assert_eq!(map.get("a"), &[3, 1, 2]);
    }

    #[test]
    fn test_remove_by_value() {
        let mut map: MultiMap<&str, u32> = MultiMap::new();
        map.insert("a", 1);
        map.insert("a", 2);

        assert!(map.remove("a", &1));
        assert!(!map.remove("a", &1));
        assert_eq!(map.get("a"), &[2]);

        // Removing the last value drops the key.
        assert!(map.remove("a", &2));
        assert!(!map.contains_key("a"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_all() {
        let mut map: MultiMap<&str, u32> = MultiMap::new();
        map.insert("a", 1);
        map.insert("a", 2);
        map.insert("b", 3);

        assert!(map.remove_all("a"));
        assert!(!map.remove_all("a"));
        assert_eq!(map.len(), 1);
        assert!(map.contains("b", &3));
    }

    #[test]
    fn test_missing_key_is_empty_range() {
        let map: MultiMap<&str, u32> = MultiMap::new();
        assert_eq!(map.get("missing"), &[] as &[u32]);
        assert!(!map.contains("missing", &1));
    }
}
