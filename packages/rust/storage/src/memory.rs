//! In-memory asset store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use svedb_shared::{Result, SvedbError};

use crate::AssetStore;

/// Asset store keeping objects in a map behind a [`RwLock`].
///
/// Counts successful puts and can be switched into a failing mode to
/// exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    fail_list: AtomicBool,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with empty objects under `keys`.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let objects = keys.into_iter().map(|k| (k.into(), Vec::new())).collect();
        Self {
            objects: RwLock::new(objects),
            ..Self::default()
        }
    }

    /// Make every subsequent `put` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `list_keys` fail.
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Number of successful puts so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SvedbError::Storage("listing disabled".into()));
        }
        Ok(self.objects.read().await.keys().cloned().collect())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(SvedbError::Storage(format!("upload of {key} rejected")));
        }
        self.objects.write().await.insert(key.to_string(), bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_list() {
        let store = MemoryAssetStore::with_keys(["BP01-002EN.png"]);
        store.put("BP01-001EN.png", vec![1, 2, 3]).await.unwrap();

        assert_eq!(
            store.list_keys().await.unwrap(),
            ["BP01-001EN.png", "BP01-002EN.png"]
        );
        assert_eq!(store.get("BP01-001EN.png").await, Some(vec![1, 2, 3]));
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn failing_modes() {
        let store = MemoryAssetStore::new();
        store.fail_puts(true);
        store.fail_list(true);

        assert!(matches!(
            store.put("x.png", vec![]).await,
            Err(SvedbError::Storage(_))
        ));
        assert!(store.list_keys().await.is_err());
        assert_eq!(store.put_count(), 0);
    }
}
