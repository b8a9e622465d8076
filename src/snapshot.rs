//! Join snapshots - the wire form of the group ledger
//!
//! When a peer joins a group, the super-peer hands it both ledgers so it can
//! take over bookkeeping. On the wire each ledger is a key → collection map
//! of `{ id, ttl }` pairs. This module converts between that shape and
//! [`LedgerSnapshot`], and encodes it as CBOR.
//!
//! The ledgers themselves accept any entry. Malformed wire data (empty keys,
//! empty ids) is rejected here by [`JoinSnapshot::validate`] before it reaches
//! them.

use crate::entry::MembershipEntry;
use crate::ledger::LedgerSnapshot;
use crate::serialization::{from_cbor, to_cbor, SerializationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while decoding or checking a join snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot encoding failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Empty key in {ledger} ledger")]
    EmptyKey { ledger: &'static str },

    #[error("Entry with empty id under key '{key}' in {ledger} ledger")]
    EmptyId { ledger: &'static str, key: String },
}

/// Wire shape of one membership entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub id: String,
    pub ttl: i64,
}

/// Wire shape of the entries under one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCollection {
    pub values: Vec<WireEntry>,
}

/// Wire shape of a whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiMapPair {
    pub key_pair: BTreeMap<String, EntryCollection>,
}

/// Both ledgers of a group, as sent to a joining peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSnapshot {
    pub object_ledger: MultiMapPair,
    pub peer_ledger: MultiMapPair,
}

impl From<MembershipEntry> for WireEntry {
    fn from(entry: MembershipEntry) -> Self {
        Self {
            id: entry.id,
            ttl: entry.ttl,
        }
    }
}

impl From<WireEntry> for MembershipEntry {
    fn from(wire: WireEntry) -> Self {
        MembershipEntry::new(wire.id, wire.ttl)
    }
}

impl From<LedgerSnapshot> for MultiMapPair {
    fn from(snapshot: LedgerSnapshot) -> Self {
        let key_pair = snapshot
            .into_iter()
            .map(|(key, entries)| {
                let values = entries.into_iter().map(WireEntry::from).collect();
                (key, EntryCollection { values })
            })
            .collect();
        Self { key_pair }
    }
}

impl From<MultiMapPair> for LedgerSnapshot {
    fn from(pair: MultiMapPair) -> Self {
        pair.key_pair
            .into_iter()
            .map(|(key, collection)| {
                let entries = collection
                    .values
                    .into_iter()
                    .map(MembershipEntry::from)
                    .collect();
                (key, entries)
            })
            .collect()
    }
}

impl MultiMapPair {
    fn validate(&self, ledger: &'static str) -> Result<(), SnapshotError> {
        for (key, collection) in &self.key_pair {
            if key.is_empty() {
                return Err(SnapshotError::EmptyKey { ledger });
            }
            if collection.values.iter().any(|entry| entry.id.is_empty()) {
                return Err(SnapshotError::EmptyId {
                    ledger,
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Total number of entries across all keys.
    pub fn entry_count(&self) -> usize {
        self.key_pair.values().map(|c| c.values.len()).sum()
    }
}

impl JoinSnapshot {
    pub fn from_ledgers(object_snapshot: LedgerSnapshot, peer_snapshot: LedgerSnapshot) -> Self {
        Self {
            object_ledger: object_snapshot.into(),
            peer_ledger: peer_snapshot.into(),
        }
    }

    /// Split into `(object ledger, peer ledger)`.
    pub fn into_ledgers(self) -> (LedgerSnapshot, LedgerSnapshot) {
        (self.object_ledger.into(), self.peer_ledger.into())
    }

    /// Reject snapshots carrying empty keys or empty entry ids.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        self.object_ledger.validate("object")?;
        self.peer_ledger.validate("peer")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(to_cbor(self)?)
    }

    /// Decode and validate a snapshot received from another super-peer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: JoinSnapshot = from_cbor(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
