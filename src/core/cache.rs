use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// In-process cache for raw provider responses, shared across clones.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, Entry<V>>>>,
    ttl: Option<Duration>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Entries never expire.
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        let expired = match cache.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Instant::now()),
            None => {
                debug!("Cache MISS for key: {:?}", key);
                return None;
            }
        };
        if expired {
            debug!("Cache entry expired for key: {:?}", key);
            cache.remove(key);
            return None;
        }
        debug!("Cache HIT for key: {:?}", key);
        cache.get(key).map(|entry| entry.value.clone())
    }

    pub async fn put(&self, key: K, value: V) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, Entry { value, expires_at });
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
