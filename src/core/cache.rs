//! Result cache with per-key single-flight de-duplication.
//!
//! Completed reply bundles live in a sharded concurrent map keyed by the
//! xxh3-128 hash of the normalized input text. A second map registers one
//! [`Shared`] future per key while a computation is running, so N
//! concurrent identical requests trigger exactly one computation and all N
//! receive the same entry. Computations run on a detached task: a caller
//! that is cancelled mid-wait never aborts the computation for other
//! waiters, and the finished entry is stored regardless.
//!
//! Expiry is lazy on lookup plus a periodic sweep; capacity pressure
//! evicts the least-recently-used entry. Counters are relaxed atomics so
//! the read path takes no lock beyond its own map shard.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_128;

/// Longest prefix of the original key text kept on an entry for logs
const ORIGINAL_KEY_MAX_CHARS: usize = 100;

/// Hashes a normalized key text to its map key.
pub fn hash_key(text: &str) -> u128 {
    xxh3_128(text.as_bytes())
}

fn truncate_key(text: &str) -> String {
    text.chars().take(ORIGINAL_KEY_MAX_CHARS).collect()
}

// =============================================================================
// Public Types
// =============================================================================

/// Cache-level faults surfaced through the computation error type
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The detached computation task died before reporting a result
    #[error("cached computation was aborted before completing")]
    ComputationAborted,
}

/// How a `get_or_compute` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a completed entry
    Hit,
    /// Waited on a computation another request had already started
    Joined,
    /// This caller ran the computation
    Computed,
}

impl CacheOutcome {
    /// Whether the result existed (or was already being built) before this
    /// call. Drives the `cached` flag on `response_text`.
    pub fn was_cached(&self) -> bool {
        !matches!(self, CacheOutcome::Computed)
    }
}

/// Counter snapshot exposed through `/health` and `status`.
///
/// A joined request counts as a hit: it was served without starting a new
/// computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Completed entries currently stored
    pub entries: usize,
    /// Lookups served from a completed or in-flight computation
    pub hits: u64,
    /// Lookups that had to start a computation
    pub misses: u64,
    /// Entries stored
    pub inserts: u64,
    /// Entries removed for capacity
    pub evictions: u64,
    /// Entries removed for age
    pub expirations: u64,
}

// =============================================================================
// Internals
// =============================================================================

#[derive(Debug, Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

struct StoredEntry<V> {
    value: Arc<V>,
    /// Truncated original key text, for log output only
    original_key: String,
    created_at: Instant,
    expires_at: Instant,
    /// Milliseconds since the cache epoch, updated on every hit
    last_used_ms: AtomicU64,
}

impl<V> StoredEntry<V> {
    fn touch(&self, epoch: Instant) {
        let now_ms = Instant::now().duration_since(epoch).as_millis() as u64;
        self.last_used_ms.store(now_ms, Ordering::Relaxed);
    }
}

type SharedComputation<V, E> = Shared<BoxFuture<'static, Result<Arc<V>, E>>>;

struct CacheInner<V, E> {
    entries: DashMap<u128, StoredEntry<V>>,
    in_flight: DashMap<u128, SharedComputation<V, E>>,
    stats: StatCounters,
    capacity: usize,
    /// Reference point for last-used timestamps
    epoch: Instant,
}

impl<V, E> CacheInner<V, E>
where
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + From<CacheError> + 'static,
{
    /// Returns the live entry for `key`, removing it first if expired.
    fn lookup_ready(&self, key: u128) -> Option<Arc<V>> {
        let now = Instant::now();
        {
            let entry = self.entries.get(&key)?;
            if now < entry.expires_at {
                entry.touch(self.epoch);
                return Some(entry.value.clone());
            }
        }
        // Expired; the guard re-checks so a racing re-insert survives.
        if let Some((_, gone)) = self.entries.remove_if(&key, |_, e| e.expires_at <= now) {
            self.stats.expirations.fetch_add(1, Ordering::Relaxed);
            debug!(key = %gone.original_key, "cache entry expired");
        }
        None
    }

    /// Stores a completed entry, evicting the LRU entry at capacity.
    fn store(&self, key: u128, original_key: String, value: Arc<V>, ttl: Duration) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        let now = Instant::now();
        let entry = StoredEntry {
            value,
            original_key,
            created_at: now,
            expires_at: now + ttl,
            last_used_ms: AtomicU64::new(now.duration_since(self.epoch).as_millis() as u64),
        };
        self.entries.insert(key, entry);
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes the least-recently-used entry. Linear scan; the capacity
    /// bound keeps it small.
    fn evict_lru(&self) {
        let mut oldest: Option<(u128, u64)> = None;
        for entry in self.entries.iter() {
            let used = entry.last_used_ms.load(Ordering::Relaxed);
            if oldest.is_none_or(|(_, best)| used < best) {
                oldest = Some((*entry.key(), used));
            }
        }

        if let Some((key, _)) = oldest {
            if let Some((_, gone)) = self.entries.remove(&key) {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %gone.original_key,
                    age_secs = gone.created_at.elapsed().as_secs(),
                    "evicted least-recently-used cache entry"
                );
            }
        }
    }

    /// Registers the computation for `key` on a detached task and returns
    /// the shared handle waiters await.
    fn register<F>(
        self: &Arc<Self>,
        key: u128,
        key_text: &str,
        ttl: Duration,
        compute: F,
    ) -> SharedComputation<V, E>
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let weak: Weak<CacheInner<V, E>> = Arc::downgrade(self);
        let original_key = truncate_key(key_text);

        tokio::spawn(async move {
            let result = compute.await.map(Arc::new);
            if let Some(inner) = weak.upgrade() {
                // Store before deregistering so a racing lookup never
                // misses a completed result.
                if let Ok(value) = &result {
                    inner.store(key, original_key, value.clone(), ttl);
                }
                inner.in_flight.remove(&key);
            }
            let _ = tx.send(result);
        });

        rx.map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(E::from(CacheError::ComputationAborted)),
        })
        .boxed()
        .shared()
    }
}

// =============================================================================
// Cache Handle
// =============================================================================

/// Handle to the result cache; clones share the same store.
pub struct ResultCache<V, E> {
    inner: Arc<CacheInner<V, E>>,
}

impl<V, E> Clone for ResultCache<V, E> {
    fn clone(&self) -> Self {
        ResultCache {
            inner: self.inner.clone(),
        }
    }
}

impl<V, E> ResultCache<V, E>
where
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + From<CacheError> + 'static,
{
    /// Creates a cache bounded to `capacity` completed entries.
    pub fn new(capacity: usize) -> Self {
        ResultCache {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                in_flight: DashMap::new(),
                stats: StatCounters::default(),
                capacity: capacity.max(1),
                epoch: Instant::now(),
            }),
        }
    }

    /// Looks up a completed entry. Never waits on an in-flight
    /// computation.
    pub fn lookup(&self, key_text: &str) -> Option<Arc<V>> {
        let found = self.inner.lookup_ready(hash_key(key_text));
        match found {
            Some(value) => {
                self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns the entry for `key_text`, computing it at most once across
    /// concurrent callers.
    ///
    /// The first caller for an absent key becomes the leader and runs
    /// `compute` (on a detached task, stored under `ttl` on success);
    /// concurrent callers for the same key join the leader's computation
    /// and receive the same value. The outcome labels which role this
    /// caller played.
    pub async fn get_or_compute<F>(
        &self,
        key_text: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<(Arc<V>, CacheOutcome), E>
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = hash_key(key_text);

        // Fast path: a live completed entry.
        if let Some(value) = self.inner.lookup_ready(key) {
            self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((value, CacheOutcome::Hit));
        }

        enum Role<V, E> {
            Ready(Arc<V>),
            Wait(SharedComputation<V, E>, CacheOutcome),
        }

        let role = match self.inner.in_flight.entry(key) {
            Entry::Occupied(occupied) => Role::Wait(occupied.get().clone(), CacheOutcome::Joined),
            Entry::Vacant(vacant) => {
                // The computation may have completed between the fast path
                // and taking the shard lock.
                if let Some(value) = self.inner.lookup_ready(key) {
                    Role::Ready(value)
                } else {
                    let shared = self.inner.register(key, key_text, ttl, compute);
                    vacant.insert(shared.clone());
                    Role::Wait(shared, CacheOutcome::Computed)
                }
            }
        };

        match role {
            Role::Ready(value) => {
                self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                Ok((value, CacheOutcome::Hit))
            }
            Role::Wait(shared, outcome) => {
                match outcome {
                    CacheOutcome::Joined => {
                        self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {
                        self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
                    }
                }
                let value = shared.await?;
                Ok((value, outcome))
            }
        }
    }

    /// Removes every expired entry; returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before.saturating_sub(self.inner.entries.len());
        if removed > 0 {
            self.inner
                .stats
                .expirations
                .fetch_add(removed as u64, Ordering::Relaxed);
            info!(removed, remaining = self.inner.entries.len(), "cache sweep");
        }
        removed
    }

    /// Spawns the periodic sweep task. It holds only a weak handle, so it
    /// exits once the cache is dropped.
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(inner) = weak.upgrade() else { break };
                let cache = ResultCache { inner };
                cache.sweep_expired();
            }
        })
    }

    /// Current counter snapshot
    pub fn stats(&self) -> CacheStats {
        let stats = &self.inner.stats;
        CacheStats {
            entries: self.inner.entries.len(),
            hits: stats.hits.load(Ordering::Relaxed),
            misses: stats.misses.load(Ordering::Relaxed),
            inserts: stats.inserts.load(Ordering::Relaxed),
            evictions: stats.evictions.load(Ordering::Relaxed),
            expirations: stats.expirations.load(Ordering::Relaxed),
        }
    }

    /// Completed entries currently stored
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether the cache holds no completed entries
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
