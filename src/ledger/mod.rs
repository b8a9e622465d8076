//! Replica Ledger - TTL-aware concurrent multi-map
//!
//! A [`ReplicaIndex`] maps a string key to a set of [`MembershipEntry`]
//! values. The group ledger keeps two of them: objects → peers holding the
//! object, and peers → objects the peer holds.
//!
//! ## Expiry
//!
//! Entries whose `ttl <= now` are logically expired but stay in the map until
//! a sweep runs. Sweeps are pull-based: [`ReplicaIndex::sweep_expired`] and
//! [`ReplicaIndex::keys_needing_repair`] are the only things that evict.
//!
//! ## Locking
//!
//! Each index owns one mutex over the whole map. Single-step operations are
//! atomic under it, and the sweep-then-scan of `keys_needing_repair` holds it
//! for the whole sequence so no add/remove can interleave between the two.
//!
//! Empty buckets are dropped eagerly, so an empty key and an absent key are
//! indistinguishable.

use crate::entry::{unix_now, MembershipEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

#[cfg(test)]
mod proptests;

/// Point-in-time copy of a ledger, used for export and bulk loading.
///
/// Ordered by key with entries sorted, so encoding a snapshot is
/// deterministic.
pub type LedgerSnapshot = BTreeMap<String, Vec<MembershipEntry>>;

/// The guarded state of a [`ReplicaIndex`].
///
/// Exposed to the crate so the group ledger can hold the locks of both
/// indexes at once for its combined operations.
#[derive(Debug, Default)]
pub(crate) struct Buckets {
    map: HashMap<String, HashSet<MembershipEntry>>,
}

impl Buckets {
    pub(crate) fn insert(&mut self, key: &str, entry: MembershipEntry) -> bool {
        self.map.entry(key.to_string()).or_default().insert(entry)
    }

    pub(crate) fn remove(&mut self, key: &str, entry: &MembershipEntry) -> bool {
        let Some(bucket) = self.map.get_mut(key) else {
            return false;
        };
        let removed = bucket.remove(entry);
        if bucket.is_empty() {
            self.map.remove(key);
        }
        removed
    }

    /// Drop a whole bucket, returning how many entries it held.
    pub(crate) fn remove_key(&mut self, key: &str) -> usize {
        self.map.remove(key).map_or(0, |bucket| bucket.len())
    }

    /// Keep only entries matching `keep`, across every key.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn retain_entries<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&MembershipEntry) -> bool,
    {
        let mut removed = 0;
        self.map.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|entry| keep(entry));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    fn count(&self, key: &str) -> usize {
        self.map.get(key).map_or(0, HashSet::len)
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn sweep(&mut self, now: i64) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.retain_entries(|entry| entry.is_live_at(now))
    }
}

/// Thread-safe key → entry-set ledger with lease expiry.
#[derive(Debug)]
pub struct ReplicaIndex {
    /// Label used in log output ("object", "peer", ...)
    name: &'static str,
    buckets: Mutex<Buckets>,
}

impl ReplicaIndex {
    /// Create an empty, unnamed ledger.
    pub fn new() -> Self {
        Self::named("ledger")
    }

    /// Create an empty ledger labelled `name` in log output.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    /// Acquire the ledger lock.
    ///
    /// A panic while holding the lock cannot leave the map half-updated in a
    /// way later operations would misread, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `entry` under `key`.
    ///
    /// Returns `false` only if the exact `(key, id, ttl)` triple was already
    /// present.
    pub fn add(&self, key: &str, entry: MembershipEntry) -> bool {
        trace!(ledger = self.name, key, id = %entry.id, ttl = entry.ttl, "add");
        self.lock().insert(key, entry)
    }

    /// Remove the exact `(key, entry)` pair. No-op if absent.
    pub fn remove(&self, key: &str, entry: &MembershipEntry) {
        self.lock().remove(key, entry);
    }

    /// Remove every entry under `key`.
    pub fn remove_all(&self, key: &str) {
        let removed = self.lock().remove_key(key);
        debug!(ledger = self.name, key, removed, "removed key");
    }

    /// Remove every entry whose id is `id`, under any key and with any ttl.
    pub fn remove_entries_by_id(&self, id: &str) {
        let removed = self.lock().retain_entries(|entry| entry.id != id);
        debug!(ledger = self.name, id, removed, "removed entries by id");
    }

    /// Remove every occurrence of the exact entry value, under any key.
    pub fn remove_entries_by_value(&self, value: &MembershipEntry) {
        let removed = self.lock().retain_entries(|entry| entry != value);
        debug!(ledger = self.name, id = %value.id, ttl = value.ttl, removed, "removed entries by value");
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().map.contains_key(key)
    }

    /// Exact membership test, ttl included.
    pub fn contains_entry(&self, key: &str, entry: &MembershipEntry) -> bool {
        self.lock()
            .map
            .get(key)
            .is_some_and(|bucket| bucket.contains(entry))
    }

    /// Stale-tolerant membership test: matches on id only.
    ///
    /// Expired entries that have not been swept yet still count. Repair
    /// candidate filtering relies on this to avoid false negatives during the
    /// sweep lag window.
    pub fn contains_entry_by_id(&self, key: &str, id: &str) -> bool {
        self.lock()
            .map
            .get(key)
            .is_some_and(|bucket| bucket.iter().any(|entry| entry.id == id))
    }

    /// Whether the exact entry is stored under any key.
    pub fn contains_value(&self, value: &MembershipEntry) -> bool {
        self.lock()
            .map
            .values()
            .any(|bucket| bucket.contains(value))
    }

    /// Number of entries under `key`, unswept expired entries included.
    pub fn count_replicas(&self, key: &str) -> usize {
        self.lock().count(key)
    }

    /// Copy of the entries under `key`.
    pub fn get(&self, key: &str) -> Vec<MembershipEntry> {
        self.lock()
            .map
            .get(key)
            .map(|bucket| bucket.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// First key found holding the exact entry.
    ///
    /// Key iteration order is unspecified, so with several holders any one
    /// of them may be returned.
    pub fn first_key_with(&self, value: &MembershipEntry) -> Option<String> {
        self.lock()
            .map
            .iter()
            .find(|(_, bucket)| bucket.contains(value))
            .map(|(key, _)| key.clone())
    }

    /// Sweep at the current time, then list every key with fewer than
    /// `required` entries.
    pub fn keys_needing_repair(&self, required: usize) -> Vec<String> {
        self.keys_needing_repair_at(required, unix_now())
    }

    /// [`keys_needing_repair`](Self::keys_needing_repair) against an explicit
    /// clock value. Sweep and scan run under a single lock hold.
    pub fn keys_needing_repair_at(&self, required: usize, now: i64) -> Vec<String> {
        let mut buckets = self.lock();
        let swept = buckets.sweep(now);
        if swept > 0 {
            debug!(ledger = self.name, swept, "expired entries swept");
        }

        buckets
            .map
            .iter()
            .filter(|(_, bucket)| bucket.len() < required)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove every entry with `ttl <= now`.
    ///
    /// Returns `true` iff at least one entry was removed. An empty ledger
    /// returns `false` without scanning.
    pub fn sweep_expired(&self, now: i64) -> bool {
        let swept = self.lock().sweep(now);
        if swept > 0 {
            debug!(ledger = self.name, swept, now, "expired entries swept");
        }
        swept > 0
    }

    /// Point-in-time copy of the whole ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock()
            .map
            .iter()
            .map(|(key, bucket)| {
                let mut entries: Vec<_> = bucket.iter().cloned().collect();
                entries.sort();
                (key.clone(), entries)
            })
            .collect()
    }

    /// Merge every entry of `snapshot` into the ledger. Existing contents are
    /// kept.
    ///
    /// Returns how many entries were new.
    pub fn bulk_load(&self, snapshot: LedgerSnapshot) -> usize {
        let mut buckets = self.lock();
        let mut added = 0;
        for (key, entries) in snapshot {
            for entry in entries {
                if buckets.insert(&key, entry) {
                    added += 1;
                }
            }
        }
        debug!(ledger = self.name, added, "bulk loaded");
        added
    }

    pub fn keys(&self) -> HashSet<String> {
        self.lock().map.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<MembershipEntry> {
        self.lock().map.values().flatten().cloned().collect()
    }

    /// Total number of entries across all keys.
    pub fn len(&self) -> usize {
        self.lock().map.values().map(HashSet::len).sum()
    }

    pub fn key_count(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().map.clear();
    }
}

impl Default for ReplicaIndex {
    fn default() -> Self {
        Self::new()
    }
}
