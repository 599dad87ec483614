//! Key maps: which keys open which sectors

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::key::{Key, KeyRole};

/// The known keys of one sector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyPair {
    /// Key A, if found
    pub a: Option<Key>,
    /// Key B, if found
    pub b: Option<Key>,
}

impl KeyPair {
    /// Create a key pair
    pub const fn new(a: Option<Key>, b: Option<Key>) -> Self {
        Self { a, b }
    }

    /// The key for a role
    pub const fn get(&self, role: KeyRole) -> Option<Key> {
        match role {
            KeyRole::A => self.a,
            KeyRole::B => self.b,
        }
    }

    /// Set the key for a role
    pub const fn set(&mut self, role: KeyRole, key: Key) {
        match role {
            KeyRole::A => self.a = Some(key),
            KeyRole::B => self.b = Some(key),
        }
    }

    /// Whether neither key is known
    pub const fn is_empty(&self) -> bool {
        self.a.is_none() && self.b.is_none()
    }

    /// Whether both keys are known
    pub const fn is_complete(&self) -> bool {
        self.a.is_some() && self.b.is_some()
    }

    /// The preferred key for authenticating: key A if known, else key B
    pub const fn preferred(&self) -> Option<(Key, KeyRole)> {
        match (self.a, self.b) {
            (Some(a), _) => Some((a, KeyRole::A)),
            (None, Some(b)) => Some((b, KeyRole::B)),
            (None, None) => None,
        }
    }
}

/// Sector index to known keys, ordered by sector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    sectors: BTreeMap<usize, KeyPair>,
}

impl KeyMap {
    /// Create an empty key map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the keys of a sector, replacing earlier entries
    pub fn insert(&mut self, sector: usize, keys: KeyPair) {
        self.sectors.insert(sector, keys);
    }

    /// Keys of a sector
    pub fn get(&self, sector: usize) -> Option<&KeyPair> {
        self.sectors.get(&sector)
    }

    /// Whether a sector has an entry
    pub fn contains(&self, sector: usize) -> bool {
        self.sectors.contains_key(&sector)
    }

    /// Number of sectors with at least one key
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Whether no sector has a key
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.sectors.clear();
    }

    /// Entries in sector order
    pub fn iter(&self) -> btree_map::Iter<'_, usize, KeyPair> {
        self.sectors.iter()
    }

    /// Distinct keys in the map, in order of first appearance
    pub fn keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        for pair in self.sectors.values() {
            for key in [pair.a, pair.b].into_iter().flatten() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

impl<'a> IntoIterator for &'a KeyMap {
    type Item = (&'a usize, &'a KeyPair);
    type IntoIter = btree_map::Iter<'a, usize, KeyPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(usize, KeyPair)> for KeyMap {
    fn from_iter<I: IntoIterator<Item = (usize, KeyPair)>>(iter: I) -> Self {
        Self {
            sectors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair() {
        let mut pair = KeyPair::default();
        assert!(pair.is_empty());
        assert_eq!(pair.preferred(), None);

        pair.set(KeyRole::B, Key::ZERO);
        assert_eq!(pair.preferred(), Some((Key::ZERO, KeyRole::B)));

        pair.set(KeyRole::A, Key::DEFAULT);
        assert!(pair.is_complete());
        assert_eq!(pair.preferred(), Some((Key::DEFAULT, KeyRole::A)));
        assert_eq!(pair.get(KeyRole::B), Some(Key::ZERO));
    }

    #[test]
    fn test_key_map_order_and_keys() {
        let map: KeyMap = [
            (5, KeyPair::new(Some(Key::ZERO), None)),
            (1, KeyPair::new(Some(Key::DEFAULT), Some(Key::ZERO))),
        ]
        .into_iter()
        .collect();

        let sectors: Vec<_> = map.iter().map(|(sector, _)| *sector).collect();
        assert_eq!(sectors, vec![1, 5]);
        assert_eq!(map.keys(), vec![Key::DEFAULT, Key::ZERO]);
    }
}
