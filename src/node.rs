//! Ledger node - owner of the group ledger
//!
//! Each super-peer process keeps exactly one [`GroupIndex`]. The node's
//! startup routine builds a [`LedgerNode`], which creates that index once and
//! hands out shared handles to request handlers. There is no global
//! instance.

use crate::config::{ConfigError, LedgerConfig};
use crate::group::GroupIndex;
use crate::repair::{RepairPlan, RepairPlanner};
use crate::sweeper::Sweeper;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The super-peer's ledger service.
#[derive(Debug)]
pub struct LedgerNode {
    config: LedgerConfig,
    index: Arc<GroupIndex>,
    sweeper: Option<Sweeper>,
}

impl LedgerNode {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            index: Arc::new(GroupIndex::new()),
            sweeper: None,
        }
    }

    /// Shared handle to the node's group ledger.
    pub fn handle(&self) -> Arc<GroupIndex> {
        Arc::clone(&self.index)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn replication_factor(&self) -> usize {
        self.config.ledger.replication_factor
    }

    /// Objects below the configured replication factor, with their deficit.
    pub fn repair_needed(&self) -> HashMap<String, usize> {
        let deficits = self.index.objects_needing_repair(self.replication_factor());
        info!(
            rf = self.replication_factor(),
            objects = deficits.len(),
            "objects needing repair"
        );
        deficits
    }

    /// Repair scan plus target selection among `group_peers`.
    pub fn plan_repair(&self, planner: &mut RepairPlanner, group_peers: &[String]) -> RepairPlan {
        let deficits = self.repair_needed();
        planner.plan(&self.index, &deficits, group_peers)
    }

    /// Start the background sweeper if the configuration enables it.
    ///
    /// Returns whether a sweeper is running afterwards. Must be called from
    /// within a tokio runtime. Fails without spawning anything if the
    /// configuration does not validate.
    pub fn start_sweeper(&mut self) -> Result<bool, ConfigError> {
        if self.sweeper.is_none() && self.config.sweeper.enabled {
            self.config.validate()?;
            self.sweeper = Some(Sweeper::spawn(self.handle(), self.config.sweeper.interval));
        }
        Ok(self.sweeper.is_some())
    }

    /// Stop background work. The ledger itself stays intact.
    pub async fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown().await;
        }
    }
}
