//! Memoized worker construction keyed by a composite key.
//!
//! The translation service keeps one worker per language direction,
//! constructed on first use. The check-insert sequence runs under a single
//! async mutex, so two concurrent requests for the same uncached key cannot
//! race into constructing the backend twice — the loader runs at most once
//! per key for the life of the process.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::Mutex;

use crate::worker::{Backend, Worker};
use crate::Result;

/// A keyed map of resident workers, populated lazily.
pub struct WorkerCache<K, B: Backend> {
    inner: Mutex<HashMap<K, Worker<B>>>,
}

impl<K, B> Default for WorkerCache<K, B>
where
    K: Eq + Hash,
    B: Backend,
{
    fn default() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }
}

impl<K, B> WorkerCache<K, B>
where
    K: Eq + Hash + Clone,
    B: Backend,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the worker for `key`, starting it with `load` on first use.
    ///
    /// The map lock is held across construction; concurrent callers for any
    /// key wait until the in-flight load finishes rather than loading a
    /// second copy. `load` is not called on a cache hit.
    pub async fn get_or_start<F>(&self, key: K, load: F) -> Result<Worker<B>>
    where
        F: FnOnce() -> Result<B> + Send + 'static,
    {
        let mut map = self.inner.lock().await;
        if let Some(worker) = map.get(&key) {
            return Ok(worker.clone());
        }
        let worker = Worker::start(load).await?;
        map.insert(key, worker.clone());
        Ok(worker)
    }

    /// Number of workers constructed so far.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::worker::Backend;
    use crate::Result;

    struct Echo;

    impl Backend for Echo {
        type Job = String;
        type Output = String;

        fn invoke(&mut self, job: String) -> Result<String> {
            Ok(job)
        }
    }

    #[tokio::test]
    async fn test_same_key_constructs_once() {
        let cache: WorkerCache<(String, String), Echo> = WorkerCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let key = ("en".to_string(), "ru".to_string());
            let worker = cache
                .get_or_start(key, move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Echo)
                })
                .await
                .unwrap();
            assert_eq!(worker.invoke("hi".into()).await.unwrap(), "hi");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_construct_separately() {
        let cache: WorkerCache<(String, String), Echo> = WorkerCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for key in [("en", "ru"), ("ru", "en")] {
            let calls = calls.clone();
            cache
                .get_or_start((key.0.into(), key.1.into()), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Echo)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: WorkerCache<u8, Echo> = WorkerCache::new();
        let result = cache
            .get_or_start(1, || Err(crate::Error::WeightLoad("boom".into())))
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);

        // A later attempt may succeed.
        cache.get_or_start(1, || Ok(Echo)).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }
}
