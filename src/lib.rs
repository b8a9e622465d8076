//! Replica Ledger - replica bookkeeping for a super-peer storage group
//!
//! Tracks which peers of a group hold which objects, so under-replicated
//! objects can be found and departed peers purged.
//!
//! Key principles:
//! - Two views of every placement (object → peers, peer → objects)
//! - Lease-bounded claims, evicted by pull-based sweeps
//! - Detection and planning only, never data transfer
//! - In-memory only; a joining peer bootstraps from a snapshot
//!
//! ```
//! use replica_ledger::{GroupIndex, MembershipEntry};
//!
//! let group = GroupIndex::new();
//! group.place("obj1", "peerA", i64::MAX);
//! group.add_object_placement("obj1", MembershipEntry::new("peerB", i64::MAX));
//!
//! let deficits = group.objects_needing_repair(3);
//! assert_eq!(deficits["obj1"], 1);
//! ```

pub mod config;
pub mod entry;
pub mod group;
pub mod ledger;
pub mod node;
pub mod repair;
pub mod serialization;
pub mod snapshot;
pub mod sweeper;

pub use config::{ConfigError, LedgerConfig};
pub use entry::{unix_now, MembershipEntry};
pub use group::{GroupIndex, LedgerStats};
pub use ledger::{LedgerSnapshot, ReplicaIndex};
pub use node::LedgerNode;
pub use repair::{RepairPlan, RepairPlanner};
pub use snapshot::{JoinSnapshot, SnapshotError};
pub use sweeper::Sweeper;
