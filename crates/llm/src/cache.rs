//! Embedding cache
//!
//! Bounded in-process cache keyed by input text. Repeated queries skip the
//! network round trip; when the cache fills, the oldest entries are dropped.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use doc_agent_core::{Embedder, Result};

struct CacheInner {
    entries: HashMap<String, Vec<f32>>,
    insertion_order: VecDeque<String>,
}

/// Caching wrapper around another embedder
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<CacheInner>,
    capacity: usize,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(CacheInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Number of cached embeddings
    pub fn len(&self) -> usize {
        self.cache.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.cache.lock().entries.get(text).cloned() {
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;

        let mut cache = self.cache.lock();
        if !cache.entries.contains_key(text) {
            while cache.entries.len() >= self.capacity {
                match cache.insertion_order.pop_front() {
                    Some(oldest) => {
                        cache.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            cache.entries.insert(text.to_string(), vector.clone());
            cache.insertion_order.push_back(text.to_string());
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32])
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_inner_call() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 8);

        let first = cached.embed("hello").await.unwrap();
        let second = cached.embed("hello").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedEmbedder::new(inner.clone(), 2);

        cached.embed("a").await.unwrap();
        cached.embed("bb").await.unwrap();
        cached.embed("ccc").await.unwrap();
        assert_eq!(cached.len(), 2);

        // "a" was evicted, so this misses
        cached.embed("a").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }
}
