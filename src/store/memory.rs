use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;

use super::{KvBackend, StoreError, StoreResult};

/// In-memory backend with the same quota semantics as the file backend.
/// Used when no data directory is configured (nothing survives a restart)
/// and throughout the tests.
#[derive(Clone)]
pub struct MemoryKvBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: usize,
}

impl MemoryKvBackend {
    /// Create an empty store with a byte budget across all keys.
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            quota_bytes,
        }
    }

    fn projected_size(entries: &HashMap<String, String>, key: &str, value: &str) -> usize {
        entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
            + key.len()
            + value.len()
    }
}

impl KvBackend for MemoryKvBackend {
    fn get(&self, key: &str) -> BoxFuture<'static, StoreResult<Option<String>>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Box::pin(async move {
            let guard = entries.lock().expect("kv map poisoned");
            Ok(guard.get(&key).cloned())
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StoreResult<()>> {
        let entries = Arc::clone(&self.entries);
        let quota = self.quota_bytes;
        let key = key.to_string();
        Box::pin(async move {
            let mut guard = entries.lock().expect("kv map poisoned");
            let attempted = Self::projected_size(&guard, &key, &value);
            if attempted > quota {
                return Err(StoreError::QuotaExceeded {
                    key,
                    attempted,
                    quota,
                });
            }
            guard.insert(key, value);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StoreResult<()>> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        Box::pin(async move {
            let mut guard = entries.lock().expect("kv map poisoned");
            guard.remove(&key);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::StoreAdapter;

    #[tokio::test]
    async fn get_set_remove_round_trip() {
        let backend = MemoryKvBackend::new(1024);
        backend.set("session", "{}".into()).await.unwrap();
        assert_eq!(backend.get("session").await.unwrap().as_deref(), Some("{}"));
        backend.remove("session").await.unwrap();
        assert_eq!(backend.get("session").await.unwrap(), None);
        // Removing an absent key is not an error.
        backend.remove("session").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_writes_over_quota() {
        let backend = MemoryKvBackend::new(16);
        let err = backend
            .set("session", "x".repeat(32))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        // Replacing an existing value only counts the new size.
        backend.set("k", "a".repeat(8)).await.unwrap();
        backend.set("k", "b".repeat(15)).await.unwrap();
    }

    #[tokio::test]
    async fn adapter_degrades_to_false_instead_of_erroring() {
        let adapter = StoreAdapter::new(Arc::new(MemoryKvBackend::new(8)));
        assert!(!adapter.set("session", "y".repeat(64)).await);
        assert_eq!(adapter.get("session").await, None);
        adapter.remove("session").await;
    }
}
