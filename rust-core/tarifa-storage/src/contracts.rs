// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Storage capability contracts.
//
// Four capabilities a storage engine may provide. Consumers only ever see
// these traits; which technology backs them is decided by the factory from
// configuration. One engine may implement several capabilities.
//
// - `Storage`     -- generic store: lifecycle and raw key listing.
// - `DataDb`      -- primary store: profiles, profile cache, load history.
// - `LoadStorage` -- bulk-load store: tariff-plan staging rows.
// - `CdrStorage`  -- CDR store: session-manager costs, v1 and v2 side by side.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::model::{
    ArgsV2CdrsStoreSmCost, AttrCdrsStoreSmCost, CostFilter, LoadInstance, SmCost,
    StatQueueProfile, TpStatQueueProfile, V2SmCost,
};

/// Capabilities common to every engine.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend tag of the engine, e.g. `redis`.
    fn backend(&self) -> &'static str;

    /// Where the engine points, credentials omitted.
    fn endpoint(&self) -> String;

    /// Raw keys starting with `prefix`, in order.
    async fn keys_for_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Remove every object the engine holds.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Flush pending writes and release the engine's resources.
    async fn close(&self) -> Result<(), StorageError>;
}

/// Primary store of tenant configuration.
#[async_trait]
pub trait DataDb: Storage {
    /// Fetch a profile. `skip_cache` forces a backend read (and refreshes
    /// the cache). A missing profile is [`StorageError::NotFound`].
    async fn get_stat_queue_profile(
        &self,
        tenant: &str,
        id: &str,
        skip_cache: bool,
    ) -> Result<StatQueueProfile, StorageError>;

    /// Create or replace a profile.
    async fn set_stat_queue_profile(&self, profile: &StatQueueProfile)
        -> Result<(), StorageError>;

    /// Delete a profile; [`StorageError::NotFound`] if there was none.
    async fn rem_stat_queue_profile(&self, tenant: &str, id: &str) -> Result<(), StorageError>;

    /// Record a load at the head of the history, trimming it to the
    /// configured size.
    async fn add_load_history(&self, load: LoadInstance) -> Result<(), StorageError>;

    /// Newest-first load history; `limit` 0 returns all of it.
    async fn get_load_history(
        &self,
        limit: usize,
        skip_cache: bool,
    ) -> Result<Vec<LoadInstance>, StorageError>;
}

/// Staging area for tariff plans before they are loaded into the primary
/// store.
#[async_trait]
pub trait LoadStorage: Storage {
    /// Distinct tariff-plan ids, sorted.
    async fn get_tp_ids(&self) -> Result<Vec<String>, StorageError>;

    /// Stage `profiles` under `tpid` in one write.
    async fn set_tp_stat_queue_profiles(
        &self,
        tpid: &str,
        profiles: &[StatQueueProfile],
    ) -> Result<(), StorageError>;

    /// Staged rows of `tpid`; empty `tenant`/`id` match anything.
    /// No matching row is [`StorageError::NotFound`].
    async fn get_tp_stat_queue_profiles(
        &self,
        tpid: &str,
        tenant: &str,
        id: &str,
    ) -> Result<Vec<TpStatQueueProfile>, StorageError>;

    /// Drop everything staged under `tpid`; returns the number of rows.
    async fn remove_tp_data(&self, tpid: &str) -> Result<usize, StorageError>;
}

/// Store of per-run session costs.
#[async_trait]
pub trait CdrStorage: Storage {
    async fn set_sm_cost(&self, cost: &SmCost) -> Result<(), StorageError>;

    /// Costs matching `filter`; none is [`StorageError::NotFound`].
    async fn get_sm_costs(&self, filter: CostFilter<'_>) -> Result<Vec<SmCost>, StorageError>;

    async fn remove_sm_cost(&self, cgrid: &str, run_id: &str) -> Result<(), StorageError>;

    async fn set_v2_sm_cost(&self, cost: &V2SmCost) -> Result<(), StorageError>;

    async fn get_v2_sm_costs(
        &self,
        filter: CostFilter<'_>,
    ) -> Result<Vec<V2SmCost>, StorageError>;

    /// Persist a v1 cost, refusing a stored `(cgrid, run_id)` when asked to.
    async fn store_sm_cost(&self, args: AttrCdrsStoreSmCost) -> Result<(), StorageError> {
        let cost = &args.cost;
        if args.check_duplicate {
            match self
                .get_sm_costs(CostFilter::by_id(&cost.cgrid, &cost.run_id))
                .await
            {
                Ok(_) => {
                    return Err(StorageError::Duplicate(format!(
                        "sm cost {}:{}",
                        cost.cgrid, cost.run_id
                    )))
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        self.set_sm_cost(cost).await
    }

    /// Persist a v2 cost, refusing a stored `(cgrid, run_id)` when asked to.
    async fn store_v2_sm_cost(&self, args: ArgsV2CdrsStoreSmCost) -> Result<(), StorageError> {
        let cost = &args.cost;
        if args.check_duplicate {
            match self
                .get_v2_sm_costs(CostFilter::by_id(&cost.cgrid, &cost.run_id))
                .await
            {
                Ok(_) => {
                    return Err(StorageError::Duplicate(format!(
                        "v2 sm cost {}:{}",
                        cost.cgrid, cost.run_id
                    )))
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        self.set_v2_sm_cost(cost).await
    }
}
