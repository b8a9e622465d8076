//! Group Ledger - dual object ↔ peer replica view
//!
//! The super-peer of a storage group tracks every placement twice:
//!
//! - **object ledger**: object id → one entry per peer holding it
//! - **peer ledger**: peer id → one entry per object it holds
//!
//! Both entries of one placement carry the same lease.
//!
//! ## Consistency
//!
//! The single-sided calls (`add_object_placement`, `add_peer_placement`, the
//! matching removals) touch one ledger each. Callers issuing them must make
//! the mirrored call themselves, and a reader may observe one side before the
//! other.
//!
//! The combined calls ([`GroupIndex::place`], [`GroupIndex::unplace`],
//! [`GroupIndex::remove_peer`], [`GroupIndex::remove_object`]) hold both
//! ledger locks at once, always object ledger first, then peer ledger.
//!
//! Expiry sweeps run per ledger and are not atomic across the two, so a stale
//! placement can briefly vanish from one side before the other.

use crate::entry::{unix_now, MembershipEntry};
use crate::ledger::{LedgerSnapshot, ReplicaIndex};
use crate::snapshot::JoinSnapshot;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Entry counts of both ledgers at one moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// Objects with at least one recorded holder
    pub objects: usize,
    /// Peers with at least one recorded object
    pub peers: usize,
    /// Entries in the object ledger
    pub object_placements: usize,
    /// Entries in the peer ledger
    pub peer_placements: usize,
}

/// Replica placement index of one storage group.
#[derive(Debug)]
pub struct GroupIndex {
    object_index: ReplicaIndex,
    peer_index: ReplicaIndex,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self {
            object_index: ReplicaIndex::named("object"),
            peer_index: ReplicaIndex::named("peer"),
        }
    }

    /// The object → peers ledger.
    pub fn object_index(&self) -> &ReplicaIndex {
        &self.object_index
    }

    /// The peer → objects ledger.
    pub fn peer_index(&self) -> &ReplicaIndex {
        &self.peer_index
    }

    // === Repair ===

    /// Number of recorded holders of `object_id`.
    pub fn count_replicas(&self, object_id: &str) -> usize {
        self.object_index.count_replicas(object_id)
    }

    /// Objects below the replication factor, with how many copies each is
    /// missing.
    ///
    /// Sweeps expired placements from both ledgers first.
    pub fn objects_needing_repair(&self, required: usize) -> HashMap<String, usize> {
        self.objects_needing_repair_at(required, unix_now())
    }

    /// [`objects_needing_repair`](Self::objects_needing_repair) against an
    /// explicit clock value.
    pub fn objects_needing_repair_at(&self, required: usize, now: i64) -> HashMap<String, usize> {
        self.clean_expired_objects_at(now);

        let deficits: HashMap<String, usize> = self
            .object_index
            .keys_needing_repair_at(required, now)
            .into_iter()
            .filter_map(|object_id| {
                // Recount: the object may have gained holders since the scan
                let count = self.count_replicas(&object_id);
                let deficit = required.saturating_sub(count);
                (deficit > 0).then_some((object_id, deficit))
            })
            .collect();

        debug!(required, objects = deficits.len(), "repair scan complete");
        deficits
    }

    /// Candidates recorded as holding `object_id`, in candidate order.
    ///
    /// Uses the stale-tolerant check: a holder whose lease expired but has not
    /// been swept still counts. Treat the result as "last known to store".
    pub fn peers_storing_object<'a, I>(&self, candidates: I, object_id: &str) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates
            .into_iter()
            .filter(|peer_id| self.peer_holds_object(peer_id, object_id))
            .cloned()
            .collect()
    }

    /// Candidates not recorded as holding `object_id`, in candidate order.
    ///
    /// These are the peers a repair may ask to take a copy.
    pub fn peers_not_storing_object<'a, I>(&self, candidates: I, object_id: &str) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates
            .into_iter()
            .filter(|peer_id| !self.peer_holds_object(peer_id, object_id))
            .cloned()
            .collect()
    }

    /// Stale-tolerant check that `peer_id` holds `object_id`, ignoring ttl.
    pub fn peer_holds_object(&self, peer_id: &str, object_id: &str) -> bool {
        self.peer_index.contains_entry_by_id(peer_id, object_id)
    }

    // === Adding ===

    /// Record `peer_entry` as a holder of `object_id` (object ledger only).
    pub fn add_object_placement(&self, object_id: &str, peer_entry: MembershipEntry) -> bool {
        self.object_index.add(object_id, peer_entry)
    }

    /// Record `object_entry` as held by `peer_id` (peer ledger only).
    pub fn add_peer_placement(&self, peer_id: &str, object_entry: MembershipEntry) -> bool {
        self.peer_index.add(peer_id, object_entry)
    }

    /// Record that `peer_id` holds `object_id` until `ttl`, on both ledgers
    /// atomically.
    ///
    /// Returns `true` only if both ledgers changed.
    pub fn place(&self, object_id: &str, peer_id: &str, ttl: i64) -> bool {
        let mut objects = self.object_index.lock();
        let mut peers = self.peer_index.lock();

        let object_added = objects.insert(object_id, MembershipEntry::new(peer_id, ttl));
        let peer_added = peers.insert(peer_id, MembershipEntry::new(object_id, ttl));

        debug!(object_id, peer_id, ttl, object_added, peer_added, "placement recorded");
        object_added && peer_added
    }

    /// Remove the placement `(object_id, peer_id, ttl)` from both ledgers
    /// atomically. No-op for sides where it is absent.
    pub fn unplace(&self, object_id: &str, peer_id: &str, ttl: i64) {
        let mut objects = self.object_index.lock();
        let mut peers = self.peer_index.lock();

        objects.remove(object_id, &MembershipEntry::new(peer_id, ttl));
        peers.remove(peer_id, &MembershipEntry::new(object_id, ttl));
    }

    /// Load both ledgers from snapshots supplied by an existing group member.
    ///
    /// Merges into current contents. The two snapshots are not checked
    /// against each other.
    pub fn bulk_populate(&self, object_snapshot: LedgerSnapshot, peer_snapshot: LedgerSnapshot) {
        let objects = self.object_index.bulk_load(object_snapshot);
        let peers = self.peer_index.bulk_load(peer_snapshot);
        info!(objects, peers, "group ledger populated");
    }

    /// [`bulk_populate`](Self::bulk_populate) from a join snapshot.
    pub fn bootstrap(&self, snapshot: JoinSnapshot) {
        let (object_snapshot, peer_snapshot) = snapshot.into_ledgers();
        self.bulk_populate(object_snapshot, peer_snapshot);
    }

    // === Membership ===

    pub fn object_index_contains_key(&self, object_id: &str) -> bool {
        self.object_index.contains_key(object_id)
    }

    pub fn peer_index_contains_key(&self, peer_id: &str) -> bool {
        self.peer_index.contains_key(peer_id)
    }

    pub fn object_index_contains_entry(&self, object_id: &str, peer_entry: &MembershipEntry) -> bool {
        self.object_index.contains_entry(object_id, peer_entry)
    }

    pub fn peer_index_contains_entry(&self, peer_id: &str, object_entry: &MembershipEntry) -> bool {
        self.peer_index.contains_entry(peer_id, object_entry)
    }

    // === Removing ===

    pub fn remove_object_placement(&self, object_id: &str, peer_entry: &MembershipEntry) {
        self.object_index.remove(object_id, peer_entry);
    }

    pub fn remove_peer_placement(&self, peer_id: &str, object_entry: &MembershipEntry) {
        self.peer_index.remove(peer_id, object_entry);
    }

    /// Purge a departed peer: its own bucket in the peer ledger and every
    /// object-ledger entry naming it, whatever the lease.
    pub fn remove_peer(&self, peer_id: &str) {
        let mut objects = self.object_index.lock();
        let mut peers = self.peer_index.lock();

        let held = peers.remove_key(peer_id);
        let claims = objects.retain_entries(|entry| entry.id != peer_id);
        info!(peer_id, held, claims, "peer removed from group ledger");
    }

    /// Purge an object: its bucket in the object ledger and every peer-ledger
    /// entry naming it, whatever the lease.
    pub fn remove_object(&self, object_id: &str) {
        let mut objects = self.object_index.lock();
        let mut peers = self.peer_index.lock();

        let holders = objects.remove_key(object_id);
        let claims = peers.retain_entries(|entry| entry.id != object_id);
        info!(object_id, holders, claims, "object removed from group ledger");
    }

    /// Sweep expired placements from both ledgers at the current time.
    ///
    /// Returns `true` only if **both** ledgers removed something.
    pub fn clean_expired_objects(&self) -> bool {
        self.clean_expired_objects_at(unix_now())
    }

    /// [`clean_expired_objects`](Self::clean_expired_objects) against an
    /// explicit clock value. The peer ledger is swept first, then the object
    /// ledger; the two sweeps are separate critical sections.
    pub fn clean_expired_objects_at(&self, now: i64) -> bool {
        let peers_cleaned = self.peer_index.sweep_expired(now);
        let objects_cleaned = self.object_index.sweep_expired(now);
        peers_cleaned && objects_cleaned
    }

    pub fn clear_all(&self) {
        self.peer_index.clear();
        self.object_index.clear();
        info!("group ledger cleared");
    }

    // === Viewing ===

    /// Every object with at least one recorded holder.
    pub fn all_objects(&self) -> HashSet<String> {
        self.object_index.keys()
    }

    pub fn object_snapshot(&self) -> LedgerSnapshot {
        self.object_index.snapshot()
    }

    pub fn peer_snapshot(&self) -> LedgerSnapshot {
        self.peer_index.snapshot()
    }

    /// Both ledgers in wire form, for a joining peer.
    pub fn export(&self) -> JoinSnapshot {
        JoinSnapshot::from_ledgers(self.object_snapshot(), self.peer_snapshot())
    }

    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            objects: self.object_index.key_count(),
            peers: self.peer_index.key_count(),
            object_placements: self.object_index.len(),
            peer_placements: self.peer_index.len(),
        }
    }
}

impl Default for GroupIndex {
    fn default() -> Self {
        Self::new()
    }
}
