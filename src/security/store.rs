//! Rate-limit registry storage.
//!
//! # Responsibilities
//! - Hold one entry per bucket key: a counting window or a hard block
//! - Refresh-and-increment a window atomically
//! - Drop entries that expired more than a retention period ago
//! - Optionally cap the number of tracked keys
//!
//! # Design Decisions
//! - `RateLimiterStore` is the seam for a shared external store
//! - `InMemoryStore` is a `DashMap`; `hit` runs under the shard lock of its key
//! - Timestamps are epoch milliseconds

use std::cmp::Reverse;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

/// Counter for one bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientWindow {
    pub count: u32,
    pub window_reset_at: u64,
}

/// Hard block for one client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockEntry {
    pub blocked_until: u64,
}

/// A registry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEntry {
    Window(ClientWindow),
    Block(BlockEntry),
}

impl RegistryEntry {
    /// The timestamp the sweep compares against.
    pub fn expires_at(&self) -> u64 {
        match self {
            RegistryEntry::Window(w) => w.window_reset_at,
            RegistryEntry::Block(b) => b.blocked_until,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, RegistryEntry::Block(_))
    }
}

/// Storage backing the rate limiter.
pub trait RateLimiterStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RegistryEntry>;

    fn set(&self, key: &str, entry: RegistryEntry);

    fn remove(&self, key: &str) -> Option<RegistryEntry>;

    /// Delete every entry whose expiry is older than `now - retention`.
    /// Returns the number of entries removed.
    fn sweep(&self, now: u64, retention: Duration) -> usize;

    /// Fetch or create the window for `key`, start a fresh window when
    /// `now` is past the reset time, then count this request.
    ///
    /// Implementations must make the whole sequence atomic per key.
    fn hit(&self, key: &str, now: u64, window: Duration) -> ClientWindow;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All block entries currently held, live or not.
    fn blocks(&self) -> Vec<(String, BlockEntry)>;

    /// Evict entries until at most `max` remain, never touching `keep`.
    /// Returns the number evicted.
    fn enforce_capacity(&self, max: usize, keep: &str) -> usize;
}

/// Process-local registry.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, RegistryEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiterStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<RegistryEntry> {
        self.entries.get(key).map(|r| *r.value())
    }

    fn set(&self, key: &str, entry: RegistryEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn remove(&self, key: &str) -> Option<RegistryEntry> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    fn sweep(&self, now: u64, retention: Duration) -> usize {
        let cutoff = now.saturating_sub(duration_millis(retention));
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at() >= cutoff);
        before.saturating_sub(self.entries.len())
    }

    fn hit(&self, key: &str, now: u64, window: Duration) -> ClientWindow {
        let fresh = ClientWindow {
            count: 0,
            window_reset_at: now.saturating_add(duration_millis(window)),
        };

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RegistryEntry::Window(fresh));

        let current = match *entry.value() {
            RegistryEntry::Window(w) if now <= w.window_reset_at => w,
            _ => fresh,
        };
        let updated = ClientWindow {
            count: current.count.saturating_add(1),
            window_reset_at: current.window_reset_at,
        };
        *entry.value_mut() = RegistryEntry::Window(updated);
        updated
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn blocks(&self) -> Vec<(String, BlockEntry)> {
        self.entries
            .iter()
            .filter_map(|r| match r.value() {
                RegistryEntry::Block(b) => Some((r.key().clone(), *b)),
                RegistryEntry::Window(_) => None,
            })
            .collect()
    }

    fn enforce_capacity(&self, max: usize, keep: &str) -> usize {
        let len = self.entries.len();
        if len <= max {
            return 0;
        }

        // Windows before blocks, lowest count first, then the most recently
        // opened window. Long-lived, busy keys are the last to be forgotten.
        let mut candidates: Vec<(bool, u32, Reverse<u64>, String)> = self
            .entries
            .iter()
            .filter(|r| r.key() != keep)
            .map(|r| {
                let count = match r.value() {
                    RegistryEntry::Window(w) => w.count,
                    RegistryEntry::Block(_) => u32::MAX,
                };
                (r.value().is_block(), count, Reverse(r.value().expires_at()), r.key().clone())
            })
            .collect();
        candidates.sort_unstable();

        let excess = len - max;
        let mut evicted = 0;
        for (_, _, _, key) in candidates.into_iter().take(excess) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
