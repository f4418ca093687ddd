use moka::future::Cache;
use std::time::Duration;

/// In-memory TTL cache layered in front of the SQLite store, for reads that
/// are hot within a cycle (e.g. the discovered-pattern list consulted by
/// every symbol's prompt assembly). Entries are evicted automatically after
/// their TTL; callers never need to invalidate by hand.
pub struct MemoryCache {
    inner: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get() {
        let cache = MemoryCache::new(100, Duration::from_secs(60));
        cache.insert("key1".to_string(), "value1".to_string()).await;
        assert_eq!(cache.get("key1").await, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn ttl_expiration() {
        let cache = MemoryCache::new(100, Duration::from_millis(50));
        cache.insert("key1".to_string(), "value1".to_string()).await;
        assert!(cache.get("key1").await.is_some());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get("key1").await.is_none());
    }
}
