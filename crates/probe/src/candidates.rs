//! Ordered candidate keys for dictionary probing

use tagkit_core::Key;

/// Candidate keys in trial order
///
/// Keys that authenticate are moved to the front, so that a key reused across
/// sectors is found quickly. Some readers fail to authenticate with the
/// all-ones key after trying the all-zero key; whenever the all-zero key is a
/// candidate the all-ones key is pinned at the front and never displaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateKeys {
    keys: Vec<Key>,
    pinned: bool,
}

impl CandidateKeys {
    /// Build the list, dropping duplicates and keeping first occurrences
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        let mut ordered: Vec<Key> = Vec::new();
        for key in keys {
            if !ordered.contains(&key) {
                ordered.push(key);
            }
        }

        let pinned = ordered.contains(&Key::ZERO);
        if pinned {
            ordered.retain(|key| !key.is_default());
            ordered.insert(0, Key::DEFAULT);
        }

        Self {
            keys: ordered,
            pinned,
        }
    }

    /// Move a key that authenticated to the front, behind the pinned key
    pub fn promote(&mut self, key: &Key) {
        let front = usize::from(self.pinned);
        let position = self.keys.iter().position(|k| k == key);
        if let Some(position) = position.filter(|&p| p > front) {
            let key = self.keys.remove(position);
            self.keys.insert(front, key);
        }
    }

    /// Whether the all-ones key is pinned at the front
    pub const fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Keys in trial order
    pub fn as_slice(&self) -> &[Key] {
        &self.keys
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<Key> for CandidateKeys {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self::new(iter)
    }
}
