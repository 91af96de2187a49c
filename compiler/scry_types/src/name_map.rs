//! Insertion-ordered string map.
//!
//! A hash index over an ordered entry vector: O(1) lookup with
//! deterministic enumeration in insertion order, which keeps locals and
//! macro listings stable across runs.

use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct NameMap<V> {
    index: FxHashMap<Box<str>, usize>,
    entries: Vec<(Box<str>, V)>,
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        NameMap {
            index: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    /// Insert or replace. Replacement keeps the original insertion
    /// position.
    pub fn insert(&mut self, name: impl Into<Box<str>>, value: V) {
        let name = name.into();
        if let Some(&slot) = self.index.get(&name) {
            self.entries[slot].1 = value;
        } else {
            self.index.insert(name.clone(), self.entries.len());
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(name).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (&**name, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = NameMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        map.insert("mid", 3);
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut map = NameMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 10);
        assert_eq!(map.get("a"), Some(&10));
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(map.len(), 2);
    }
}
