//! # Timeout Registry
//!
//! Maps keys to values that expire automatically.
//!
//! Flow for request/response correlation:
//! 1. Caller registers a value under a fresh key with `add()`
//! 2. Reply listener calls `get_and_remove()` with the echoed key
//! 3. If no reply arrives before the deadline, the sweep evicts the entry
//!    and fires its [`TimeoutAction`]
//!
//! Steps 2 and 3 are mutually exclusive per key.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::action::TimeoutAction;
use crate::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TIMEOUT};

/// When an entry stops being live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Expires once the clock reaches this instant.
    At(Instant),
    /// Exempt from eviction; removed only explicitly.
    Never,
}

impl Deadline {
    /// Deadline `timeout` from now. Saturates to `Never` on overflow.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Instant::now()
            .checked_add(timeout)
            .map_or(Self::Never, Self::At)
    }

    /// Whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Self::At(at) => now >= *at,
            Self::Never => false,
        }
    }
}

struct Entry<V> {
    value: V,
    expire_at: Deadline,
    created_at: Instant,
}

/// Counters for registry activity.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Entries inserted (including overwrites)
    pub total_inserted: AtomicU64,
    /// Entries removed explicitly
    pub total_removed: AtomicU64,
    /// Entries handed out by `get_and_remove`
    pub total_completed: AtomicU64,
    /// Entries evicted by deadline (timeout action fired)
    pub total_expired: AtomicU64,
}

struct Shared<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    default_timeout: Duration,
    stats: RegistryStats,
}

impl<K: Eq + Hash, V: TimeoutAction> Shared<K, V> {
    /// Remove every expired entry, then fire the actions without the lock.
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<V> = {
            let mut entries = self.entries.lock();
            if !entries.values().any(|e| e.expire_at.is_expired(now)) {
                return 0;
            }

            let mut expired = Vec::new();
            let drained = std::mem::take(&mut *entries);
            for (key, entry) in drained {
                if entry.expire_at.is_expired(now) {
                    debug!(
                        age_ms = now.duration_since(entry.created_at).as_millis() as u64,
                        "Evicting expired registry entry"
                    );
                    expired.push(entry.value);
                } else {
                    entries.insert(key, entry);
                }
            }
            expired
        };

        let count = expired.len();
        self.stats
            .total_expired
            .fetch_add(count as u64, Ordering::Relaxed);
        for value in expired {
            value.on_timeout();
        }
        count
    }

    fn expire_one(&self, value: V) {
        self.stats.total_expired.fetch_add(1, Ordering::Relaxed);
        value.on_timeout();
    }
}

/// Thread-safe key/value store with per-entry expiry.
///
/// Constructed inside a tokio runtime, the registry spawns its own sweep
/// task that runs every sweep interval until the registry is dropped.
/// Constructed outside a runtime, no task is spawned and expired entries
/// are only reclaimed lazily or through [`sweep_expired`](Self::sweep_expired).
pub struct TimeoutRegistry<K, V> {
    shared: Arc<Shared<K, V>>,
    sweeper: Option<JoinHandle<()>>,
}

impl<K, V> TimeoutRegistry<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: TimeoutAction + 'static,
{
    /// Registry with the default timeout (30s) and sweep interval (1s).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_SWEEP_INTERVAL)
    }

    /// Registry with a custom default timeout.
    #[must_use]
    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self::with_config(default_timeout, DEFAULT_SWEEP_INTERVAL)
    }

    /// Registry with a custom default timeout and sweep interval.
    #[must_use]
    pub fn with_config(default_timeout: Duration, sweep_interval: Duration) -> Self {
        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            default_timeout,
            stats: RegistryStats::default(),
        });

        let sweeper = match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(sweep_task(Arc::downgrade(&shared), sweep_interval))),
            Err(_) => {
                warn!("No tokio runtime; timeout registry runs without a sweep task");
                None
            }
        };

        Self { shared, sweeper }
    }
}

impl<K, V> TimeoutRegistry<K, V>
where
    K: Eq + Hash,
    V: TimeoutAction,
{
    /// Insert or overwrite `key`. A zero `timeout` uses the default.
    pub fn add(&self, key: K, value: V, timeout: Duration) -> bool {
        let timeout = if timeout.is_zero() {
            self.shared.default_timeout
        } else {
            timeout
        };
        self.insert(key, value, Deadline::after(timeout))
    }

    /// Insert or overwrite `key` with an entry that never expires.
    pub fn add_infinite(&self, key: K, value: V) -> bool {
        self.insert(key, value, Deadline::Never)
    }

    fn insert(&self, key: K, value: V, expire_at: Deadline) -> bool {
        let entry = Entry {
            value,
            expire_at,
            created_at: Instant::now(),
        };
        // An overwritten value is dropped without its timeout action.
        let _previous = self.shared.entries.lock().insert(key, entry);
        self.shared
            .stats
            .total_inserted
            .fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Remove `key` without firing its timeout action.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.shared.entries.lock().remove(key).is_some();
        if removed {
            self.shared
                .stats
                .total_removed
                .fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Atomically take a live entry out of the registry.
    ///
    /// Returns `None` if the key is absent, or if it had expired: in that
    /// case the entry is evicted here and its timeout action fires.
    pub fn get_and_remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.shared.entries.lock().remove(key)?;
        if entry.expire_at.is_expired(Instant::now()) {
            self.shared.expire_one(entry.value);
            return None;
        }
        self.shared
            .stats
            .total_completed
            .fetch_add(1, Ordering::Relaxed);
        Some(entry.value)
    }

    /// Whether `key` holds a live entry. Expired entries are evicted.
    pub fn exists<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let stale = {
            let mut entries = self.shared.entries.lock();
            match entries.get(key) {
                None => return false,
                Some(entry) if !entry.expire_at.is_expired(Instant::now()) => return true,
                Some(_) => entries.remove(key),
            }
        };
        if let Some(entry) = stale {
            self.shared.expire_one(entry.value);
        }
        false
    }

    /// Reset the deadline of `key` to `timeout` from now.
    ///
    /// A zero `timeout` uses the default. Returns `false` if absent. An
    /// entry already past its deadline is evicted and its action fired.
    pub fn update_timeout<Q>(&self, key: &Q, timeout: Duration) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let timeout = if timeout.is_zero() {
            self.shared.default_timeout
        } else {
            timeout
        };
        let stale = {
            let mut entries = self.shared.entries.lock();
            match entries.get_mut(key) {
                None => return false,
                Some(entry) if !entry.expire_at.is_expired(Instant::now()) => {
                    entry.expire_at = Deadline::after(timeout);
                    return true;
                }
                Some(_) => {}
            }
            entries.remove(key)
        };
        if let Some(entry) = stale {
            self.shared.expire_one(entry.value);
        }
        false
    }

    /// Drop every entry without firing timeout actions.
    pub fn clear(&self) {
        self.shared.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Whether the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.entries.lock().is_empty()
    }

    /// Run one sweep pass now. Returns the number of evicted entries.
    pub fn sweep_expired(&self) -> usize {
        self.shared.sweep()
    }

    /// Timeout used when `add` is given zero.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.shared.default_timeout
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> &RegistryStats {
        &self.shared.stats
    }

    /// Whether a background sweep task is attached.
    #[must_use]
    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }
}

impl<K, V> TimeoutRegistry<K, V>
where
    K: Eq + Hash,
    V: TimeoutAction + Clone,
{
    /// Copy of the value under `key` if it is live.
    ///
    /// An expired entry is evicted and its timeout action fires.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let stale = {
            let mut entries = self.shared.entries.lock();
            let entry = entries.get(key)?;
            if !entry.expire_at.is_expired(Instant::now()) {
                return Some(entry.value.clone());
            }
            entries.remove(key)
        };
        if let Some(entry) = stale {
            self.shared.expire_one(entry.value);
        }
        None
    }
}

impl<K, V> TimeoutRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: TimeoutAction + Clone,
{
    /// Point-in-time copy of every entry, for iteration without the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(K, V)> {
        self.shared
            .entries
            .lock()
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }
}

impl<K, V> Default for TimeoutRegistry<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: TimeoutAction + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for TimeoutRegistry<K, V> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

/// Background sweep loop. Exits once the registry is dropped.
async fn sweep_task<K, V>(shared: Weak<Shared<K, V>>, interval: Duration)
where
    K: Eq + Hash,
    V: TimeoutAction,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let evicted = shared.sweep();
        if evicted > 0 {
            debug!(evicted = evicted, "Swept expired registry entries");
        }
    }
}
