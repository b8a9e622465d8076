//! Property-based tests for the replica ledger
//!
//! Tests for:
//! - Counting: distinct adds are all counted, duplicates are not
//! - Expiry: sweeps remove exactly the expired entries and are idempotent
//! - Removal: purging an id leaves no trace of it under any key
//! - Snapshots: export then bulk load reproduces the ledger

use super::{LedgerSnapshot, ReplicaIndex};
use crate::entry::MembershipEntry;
use proptest::prelude::*;
use std::collections::HashSet;

const NOW: i64 = 1_700_000_000;

fn placements() -> impl Strategy<Value = Vec<(String, String, i64)>> {
    prop::collection::vec(
        ("obj[0-4]", "peer[0-9]", (NOW - 50)..(NOW + 50)),
        0..64,
    )
}

proptest! {
    /// Property: n distinct live entries under one key count as n replicas
    #[test]
    fn distinct_adds_are_all_counted(n in 0usize..50) {
        let ledger = ReplicaIndex::new();
        for i in 0..n {
            let added = ledger.add("obj", MembershipEntry::new(format!("peer{}", i), NOW + 100));
            prop_assert!(added);
        }

        prop_assert_eq!(ledger.count_replicas("obj"), n);
    }

    /// Property: re-adding an existing triple never changes the ledger
    #[test]
    fn duplicate_add_changes_nothing(items in placements()) {
        let ledger = ReplicaIndex::new();
        for (key, id, ttl) in &items {
            ledger.add(key, MembershipEntry::new(id.clone(), *ttl));
        }
        let before = ledger.snapshot();

        for (key, id, ttl) in &items {
            prop_assert!(!ledger.add(key, MembershipEntry::new(id.clone(), *ttl)));
        }

        prop_assert_eq!(ledger.snapshot(), before);
    }

    /// Property: a sweep at `now` removes exactly the entries with ttl <= now
    #[test]
    fn sweep_removes_exactly_expired(items in placements()) {
        let ledger = ReplicaIndex::new();
        for (key, id, ttl) in &items {
            ledger.add(key, MembershipEntry::new(id.clone(), *ttl));
        }
        let had_expired = ledger.values().iter().any(|e| e.is_expired_at(NOW));

        prop_assert_eq!(ledger.sweep_expired(NOW), had_expired);

        let remaining = ledger.values();
        prop_assert!(remaining.iter().all(|e| e.is_live_at(NOW)));

        let expected: HashSet<_> = items
            .iter()
            .filter(|(_, _, ttl)| *ttl > NOW)
            .map(|(key, id, ttl)| (key.clone(), id.clone(), *ttl))
            .collect();
        let actual: HashSet<_> = ledger
            .snapshot()
            .into_iter()
            .flat_map(|(key, entries)| {
                entries.into_iter().map(move |e| (key.clone(), e.id, e.ttl))
            })
            .collect();
        prop_assert_eq!(actual, expected);

        // Second sweep at the same instant finds nothing
        prop_assert!(!ledger.sweep_expired(NOW));
    }

    /// Property: after removing an id, no key holds an entry with that id
    #[test]
    fn remove_by_id_leaves_no_trace(items in placements(), victim in "peer[0-9]") {
        let ledger = ReplicaIndex::new();
        for (key, id, ttl) in &items {
            ledger.add(key, MembershipEntry::new(id.clone(), *ttl));
        }
        let others = ledger.values().iter().filter(|e| e.id != victim).count();

        ledger.remove_entries_by_id(&victim);

        prop_assert!(ledger.values().iter().all(|e| e.id != victim));
        prop_assert_eq!(ledger.len(), others);
        for key in ledger.keys() {
            prop_assert!(!ledger.contains_entry_by_id(&key, &victim));
            prop_assert!(ledger.count_replicas(&key) > 0, "no empty buckets survive");
        }
    }

    /// Property: bulk loading a snapshot into an empty ledger reproduces it
    #[test]
    fn snapshot_bulk_load_reproduces(items in placements()) {
        let source = ReplicaIndex::new();
        for (key, id, ttl) in &items {
            source.add(key, MembershipEntry::new(id.clone(), *ttl));
        }
        let snapshot: LedgerSnapshot = source.snapshot();

        let target = ReplicaIndex::new();
        prop_assert_eq!(target.bulk_load(snapshot.clone()), source.len());
        prop_assert_eq!(target.snapshot(), snapshot);
    }
}
