//! Bounded record of recently deleted keys

use std::collections::VecDeque;

/// Maximum number of keys tracked per store
pub const RECENTLY_DELETED_LIMIT: usize = 200;

/// Recently deleted keys, oldest first
///
/// When the limit is reached the oldest half is dropped in one batch, so the
/// window shrinks to `RECENTLY_DELETED_LIMIT / 2` before growing again.
#[derive(Debug)]
pub struct RecentlyDeleted<K> {
    keys: VecDeque<K>,
}

impl<K: PartialEq> RecentlyDeleted<K> {
    pub fn new() -> Self {
        Self {
            keys: VecDeque::with_capacity(RECENTLY_DELETED_LIMIT),
        }
    }

    pub fn push(&mut self, key: K) {
        if self.keys.len() >= RECENTLY_DELETED_LIMIT {
            self.keys.drain(..RECENTLY_DELETED_LIMIT / 2);
        }
        self.keys.push_back(key);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: PartialEq> Default for RecentlyDeleted<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halves_when_full() {
        let mut ring = RecentlyDeleted::new();
        for i in 0..RECENTLY_DELETED_LIMIT {
            ring.push(i);
        }
        assert_eq!(ring.len(), RECENTLY_DELETED_LIMIT);
        assert!(ring.contains(&0));

        ring.push(RECENTLY_DELETED_LIMIT);
        assert_eq!(ring.len(), RECENTLY_DELETED_LIMIT / 2 + 1);
        assert!(!ring.contains(&0));
        assert!(!ring.contains(&99));
        assert!(ring.contains(&100));
        assert!(ring.contains(&RECENTLY_DELETED_LIMIT));
    }
}
