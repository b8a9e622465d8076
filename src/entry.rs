//! Membership entries stored in the replica ledgers.
//!
//! A [`MembershipEntry`] says "entity `id` is associated with this key until
//! `ttl`". In the object ledger the id is a peer; in the peer ledger the id
//! is an object. Both sides of one placement carry the same lease.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A lease-bounded claim that `id` belongs to some ledger key.
///
/// Equality and hashing are structural on `(id, ttl)`: the same id with a
/// renewed lease is a different entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MembershipEntry {
    /// Peer id (object ledger) or object id (peer ledger)
    pub id: String,

    /// Lease expiry as a unix timestamp in seconds
    pub ttl: i64,
}

impl MembershipEntry {
    /// Create a new entry
    pub fn new(id: impl Into<String>, ttl: i64) -> Self {
        Self { id: id.into(), ttl }
    }

    /// Entry whose lease runs `lease_secs` from now.
    pub fn leased_for(id: impl Into<String>, lease_secs: i64) -> Self {
        Self::new(id, unix_now().saturating_add(lease_secs))
    }

    /// An entry is expired once its lease is at or before `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.ttl <= now
    }

    pub fn is_live_at(&self, now: i64) -> bool {
        !self.is_expired_at(now)
    }
}

/// Current wall-clock time in unix seconds.
///
/// Clocks set before the epoch read as 0, which expires nothing.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
