//! Recency order of sessions that hold a message blob.

use lru::LruCache;

/// Session IDs ordered most-recently-used first.
///
/// Each ID appears at most once. Persisted as a JSON array in MRU-first order.
pub struct LruIndex {
    order: LruCache<String, ()>,
}

impl LruIndex {
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }

    /// Rebuild from a persisted MRU-first list. Duplicates keep their first position.
    pub fn from_order<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = Self::new();
        for id in ids {
            if !index.order.contains(&id) {
                index.order.push(id.clone(), ());
                index.order.demote(&id);
            }
        }
        index
    }

    /// Mark an ID as just used, inserting it if absent.
    pub fn touch(&mut self, id: &str) {
        if self.order.get(id).is_none() {
            self.order.push(id.to_string(), ());
        }
    }

    /// Insert at the least-recently-used end without disturbing others.
    pub fn push_oldest(&mut self, id: &str) {
        if !self.order.contains(id) {
            self.order.push(id.to_string(), ());
            self.order.demote(id);
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.order.pop(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.contains(id)
    }

    /// Least-recently-used ID other than `keep`.
    pub fn oldest_except(&self, keep: &str) -> Option<String> {
        self.order
            .iter()
            .rev()
            .map(|(id, _)| id)
            .find(|id| id.as_str() != keep)
            .cloned()
    }

    /// Drop every ID for which `keep` returns false. Returns how many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let dropped: Vec<String> = self
            .order
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !keep(id.as_str()))
            .cloned()
            .collect();
        for id in &dropped {
            self.order.pop(id);
        }
        dropped.len()
    }

    /// IDs in MRU-first order.
    pub fn ids(&self) -> Vec<String> {
        self.order.iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

impl Default for LruIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LruIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.order.iter().map(|(id, _)| id)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(ids: &[&str]) -> LruIndex {
        LruIndex::from_order(ids.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_from_order_keeps_mru_first() {
        let index = index(&["c", "b", "a", "b"]);
        assert_eq!(index.ids(), vec!["c", "b", "a"]);
        assert_eq!(index.oldest_except(""), Some("a".to_string()));
    }

    #[test]
    fn test_touch_moves_to_front() {
        let mut index = index(&["c", "b", "a"]);
        index.touch("a");
        index.touch("d");
        assert_eq!(index.ids(), vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn test_oldest_except_skips_protected_id() {
        let index = index(&["b", "a"]);
        assert_eq!(index.oldest_except("a"), Some("b".to_string()));
        assert_eq!(LruIndex::from_order(["a".to_string()]).oldest_except("a"), None);
    }

    #[test]
    fn test_push_oldest_and_retain() {
        let mut index = index(&["b", "a"]);
        index.push_oldest("z");
        index.push_oldest("b");
        assert_eq!(index.ids(), vec!["b", "a", "z"]);

        let dropped = index.retain(|id| id != "a");
        assert_eq!(dropped, 1);
        assert_eq!(index.ids(), vec!["b", "z"]);
        assert!(!index.contains("a"));
        assert!(index.remove("z"));
        assert!(!index.remove("z"));
    }
}
