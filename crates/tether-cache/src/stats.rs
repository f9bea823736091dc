//! Persisted cache counters.

use serde::{Deserialize, Serialize};

/// Blob totals and read counters.
///
/// `total_size` and `sessions_with_messages` track the message blobs on
/// disk; the sweep recomputes both from scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheStats {
    /// Bytes held by message blobs.
    pub total_size: u64,
    /// Number of sessions with a message blob.
    pub sessions_with_messages: u64,
    /// Last sweep, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cleanup: Option<i64>,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn record_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    /// Account for a blob replacing one of `old_size` bytes (`None` if new).
    pub fn blob_written(&mut self, old_size: Option<u64>, new_size: u64) {
        match old_size {
            Some(old) => self.total_size = self.total_size.saturating_sub(old),
            None => self.sessions_with_messages = self.sessions_with_messages.saturating_add(1),
        }
        self.total_size = self.total_size.saturating_add(new_size);
    }

    pub fn blob_removed(&mut self, size: u64) {
        self.total_size = self.total_size.saturating_sub(size);
        self.sessions_with_messages = self.sessions_with_messages.saturating_sub(1);
    }

    /// Fraction of reads served from the cache, if there were any reads.
    pub fn hit_rate(&self) -> Option<f64> {
        let reads = self.hits + self.misses;
        (reads > 0).then(|| self.hits as f64 / reads as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_accounting_never_goes_negative() {
        let mut stats = CacheStats::default();
        stats.blob_written(None, 100);
        stats.blob_written(Some(100), 40);
        assert_eq!(stats.total_size, 40);
        assert_eq!(stats.sessions_with_messages, 1);

        stats.blob_removed(40);
        stats.blob_removed(40);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.sessions_with_messages, 0);
    }

    #[test]
    fn test_hit_rate() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), None);
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), Some(0.75));
    }

    #[test]
    fn test_serialized_field_names() {
        let stats = CacheStats {
            total_size: 10,
            sessions_with_messages: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalSize"], 10);
        assert_eq!(json["sessionsWithMessages"], 1);
        assert!(json.get("lastCleanup").is_none());
    }
}
