//! In-memory TTL list guarded by a single reader/writer lock.

use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

/// A value paired with the instant after which it is stale.
#[derive(Debug, Clone, PartialEq)]
pub struct TtlEntry<T> {
    pub value: T,
    pub valid_until: Instant,
}

impl<T> TtlEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            valid_until: Instant::now() + ttl,
        }
    }

    /// An entry is expired from its `valid_until` instant onwards.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.valid_until
    }
}

/// Ordered list of values that expire after a fixed time-to-live.
///
/// All mutation takes the exclusive lock; reads take the shared lock.
/// Expired entries stay in the list until the next [`TtlList::sweep`].
pub struct TtlList<T> {
    entries: RwLock<Vec<TtlEntry<T>>>,
    ttl: Duration,
}

impl<T: PartialEq + Clone> TtlList<T> {
    /// Creates an empty list whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            ttl,
        }
    }

    /// Appends `value`. With `dedupe`, does nothing if an equal value is already stored.
    ///
    /// The duplicate check uses the same rule as [`TtlList::contains`], so an
    /// expired but not yet swept entry still counts as a duplicate.
    pub fn add(&self, value: T, dedupe: bool) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if dedupe && entries.iter().any(|e| e.value == value) {
            return;
        }
        entries.push(TtlEntry::new(value, self.ttl));
    }

    /// Returns true if an entry equal to `value` exists, expired or not.
    pub fn contains(&self, value: &T) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().any(|e| &e.value == value)
    }

    /// Removes every expired entry, keeping the rest in their original order.
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| !e.is_expired());
        before - entries.len()
    }

    /// Copy of the current entries, expired ones included.
    pub fn snapshot(&self) -> Vec<TtlEntry<T>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn entry_not_expired_right_after_insert() {
        tokio::time::pause();
        let entry = TtlEntry::new("a", TTL);
        assert!(!entry.is_expired());

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert!(!entry.is_expired());
    }

    #[tokio::test]
    async fn entry_expires_at_ttl() {
        tokio::time::pause();
        let entry = TtlEntry::new("a", TTL);
        tokio::time::advance(TTL).await;
        assert!(entry.is_expired());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.is_expired());
    }

    #[tokio::test]
    async fn add_with_dedupe_stores_once() {
        tokio::time::pause();
        let list = TtlList::new(TTL);
        list.add("m1".to_string(), true);
        list.add("m1".to_string(), true);
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn add_without_dedupe_stores_twice() {
        tokio::time::pause();
        let list = TtlList::new(TTL);
        list.add("m1".to_string(), false);
        list.add("m1".to_string(), false);
        assert_eq!(list.len(), 2);
    }

    #[tokio::test]
    async fn contains_ignores_expiry() {
        tokio::time::pause();
        let list = TtlList::new(TTL);
        list.add(7u64, true);
        tokio::time::advance(TTL * 2).await;

        assert!(list.contains(&7));
        // still a duplicate until swept
        list.add(7u64, true);
        assert_eq!(list.len(), 1);

        assert_eq!(list.sweep(), 1);
        assert!(!list.contains(&7));
        list.add(7u64, true);
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_and_keeps_order() {
        tokio::time::pause();
        let list = TtlList::new(TTL);
        list.add(1, false);
        list.add(2, false);
        tokio::time::advance(Duration::from_secs(120)).await;
        list.add(3, false);
        list.add(4, false);
        tokio::time::advance(Duration::from_secs(120)).await;
        list.add(5, false);

        // entries 1 and 2 are now 300s old
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(list.sweep(), 2);

        let values: Vec<i32> = list.snapshot().into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec![3, 4, 5]);
        assert_eq!(list.sweep(), 0);
    }

    #[tokio::test]
    async fn sweep_on_empty_list() {
        let list: TtlList<String> = TtlList::new(TTL);
        assert_eq!(list.sweep(), 0);
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_detached_copy() {
        tokio::time::pause();
        let list = TtlList::new(TTL);
        list.add("a", false);
        let snap = list.snapshot();
        list.add("b", false);
        assert_eq!(snap.len(), 1);
        assert_eq!(list.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dedupe_adds_store_once() {
        let list = Arc::new(TtlList::new(TTL));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let list = Arc::clone(&list);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    list.add(i, true);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(list.len(), 50);
    }
}
