//! Repair planning for under-replicated objects
//!
//! Turns the deficit map from [`GroupIndex::objects_needing_repair`] into a
//! per-peer work list: for every object missing `d` copies, up to `d` group
//! peers that are not recorded as holding it are picked at random.
//!
//! Planning only. Fetching the data and recording the new placements is the
//! caller's job.

use crate::group::GroupIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

/// Objects each peer should fetch, plus objects no peer could take.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairPlan {
    /// peer id → objects that peer should fetch
    pub assignments: BTreeMap<String, Vec<String>>,

    /// object id → copies still missing after assignment
    pub unassigned: BTreeMap<String, usize>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.unassigned.is_empty()
    }

    /// Number of object copies the plan asks peers to fetch.
    pub fn assigned_copies(&self) -> usize {
        self.assignments.values().map(Vec::len).sum()
    }
}

/// Picks repair targets among the peers of a group.
#[derive(Debug)]
pub struct RepairPlanner {
    rng: StdRng,
}

impl RepairPlanner {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Planner with a fixed seed, for reproducible plans.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Assign every deficit to random group peers not storing the object.
    ///
    /// Uses the stale-tolerant membership check, so a peer whose lease lapsed
    /// but has not been swept is never picked for an object it may still
    /// hold.
    pub fn plan(
        &mut self,
        index: &GroupIndex,
        deficits: &HashMap<String, usize>,
        group_peers: &[String],
    ) -> RepairPlan {
        let mut plan = RepairPlan::default();
        if deficits.is_empty() {
            return plan;
        }

        // Sorted so a seeded planner is reproducible
        let mut objects: Vec<_> = deficits.iter().collect();
        objects.sort();

        for (object_id, &deficit) in objects {
            let mut candidates = index.peers_not_storing_object(group_peers, object_id);
            // A peer listed twice still takes at most one copy
            let mut seen = HashSet::new();
            candidates.retain(|peer_id| seen.insert(peer_id.clone()));
            candidates.shuffle(&mut self.rng);
            candidates.truncate(deficit);

            let missing = deficit - candidates.len();
            if missing > 0 {
                warn!(object_id = %object_id, deficit, missing, "not enough peers to repair object");
                plan.unassigned.insert(object_id.clone(), missing);
            }

            for peer_id in candidates {
                plan.assignments
                    .entry(peer_id)
                    .or_default()
                    .push(object_id.clone());
            }
        }

        info!(
            peers = plan.assignments.len(),
            copies = plan.assigned_copies(),
            unassigned = plan.unassigned.len(),
            "repair plan built"
        );
        plan
    }
}

impl Default for RepairPlanner {
    fn default() -> Self {
        Self::new()
    }
}
