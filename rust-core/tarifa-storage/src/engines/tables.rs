// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Object tables shared by the engine families.
//
// `DataTables` backs the primary-store capability (profiles, profile cache,
// load history); `StorTables` backs the bulk-load and CDR capabilities. An
// engine owns whichever sets its family supports and delegates its trait
// methods here, so the three families cannot drift apart in semantics.

use std::collections::BTreeSet;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::backend::SharedBackend;
use crate::cache::BoundedCache;
use crate::config::CacheConfig;
use crate::error::StorageError;
use crate::marshal::Marshaler;
use crate::model::{
    CostFilter, LoadInstance, SmCost, StatQueueProfile, TenantId, TpStatQueueProfile, V2SmCost,
};
use crate::typed::TypedStore;

const STAT_QUEUE_PROFILES: &str = "sqp";
const LOAD_HISTORY: &str = "lh";
const LOAD_HISTORY_KEY: &str = "load_history";
const TP_STAT_QUEUE_PROFILES: &str = "tp_sqp";
const SM_COSTS: &str = "smc";
const V2_SM_COSTS: &str = "smc_v2";

pub(crate) struct DataTables {
    profiles: TypedStore<SharedBackend>,
    history: TypedStore<SharedBackend>,
    profile_cache: RwLock<BoundedCache<TenantId, StatQueueProfile>>,
    history_cache: RwLock<Option<Vec<LoadInstance>>>,
    cache_history: bool,
    history_writer: Mutex<()>,
    load_history_size: usize,
}

impl DataTables {
    pub(crate) fn new(
        backend: SharedBackend,
        marshaler: Marshaler,
        cache: CacheConfig,
        load_history_size: usize,
    ) -> Self {
        Self {
            profiles: TypedStore::new(backend.clone(), STAT_QUEUE_PROFILES, marshaler),
            history: TypedStore::new(backend, LOAD_HISTORY, marshaler),
            profile_cache: RwLock::new(BoundedCache::new(cache.stat_queue_profiles)),
            history_cache: RwLock::new(None),
            cache_history: !cache.load_history.is_disabled(),
            history_writer: Mutex::new(()),
            load_history_size,
        }
    }

    pub(crate) async fn get_stat_queue_profile(
        &self,
        tenant: &str,
        id: &str,
        skip_cache: bool,
    ) -> Result<StatQueueProfile, StorageError> {
        let key = TenantId::new(tenant, id);
        if !skip_cache {
            if let Some(profile) = self.profile_cache.read().await.get(&key) {
                return Ok(profile);
            }
        }

        // Fill under the write guard; Set and Remove invalidate only after
        // their backend write, so a row read here cannot outlive them.
        let mut cache = self.profile_cache.write().await;
        let profile: StatQueueProfile = self
            .profiles
            .get(&(tenant, id))
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("stat queue profile {key}")))?;
        cache.insert(key, profile.clone());
        Ok(profile)
    }

    pub(crate) async fn set_stat_queue_profile(
        &self,
        profile: &StatQueueProfile,
    ) -> Result<(), StorageError> {
        self.profiles
            .put(&(profile.tenant.as_str(), profile.id.as_str()), profile)
            .await?;
        self.profile_cache
            .write()
            .await
            .remove(&TenantId::new(&profile.tenant, &profile.id));
        Ok(())
    }

    pub(crate) async fn rem_stat_queue_profile(
        &self,
        tenant: &str,
        id: &str,
    ) -> Result<(), StorageError> {
        let key = TenantId::new(tenant, id);
        let existed = self.profiles.delete(&(tenant, id)).await?;
        self.profile_cache.write().await.remove(&key);
        if !existed {
            return Err(StorageError::NotFound(format!("stat queue profile {key}")));
        }
        Ok(())
    }

    pub(crate) async fn add_load_history(&self, load: LoadInstance) -> Result<(), StorageError> {
        let _writer = self.history_writer.lock().await;
        let mut history: Vec<LoadInstance> = self
            .history
            .get(LOAD_HISTORY_KEY)
            .await?
            .unwrap_or_default();
        history.insert(0, load);
        history.truncate(self.load_history_size);
        self.history.put(LOAD_HISTORY_KEY, &history).await?;
        *self.history_cache.write().await = None;
        debug!(entries = history.len(), "load history updated");
        Ok(())
    }

    pub(crate) async fn get_load_history(
        &self,
        limit: usize,
        skip_cache: bool,
    ) -> Result<Vec<LoadInstance>, StorageError> {
        if self.cache_history && !skip_cache {
            if let Some(history) = self.history_cache.read().await.as_ref() {
                return Ok(newest(history, limit));
            }
        }

        let mut cache = self.history_cache.write().await;
        let history: Vec<LoadInstance> = self
            .history
            .get(LOAD_HISTORY_KEY)
            .await?
            .unwrap_or_default();
        let page = newest(&history, limit);
        if self.cache_history {
            *cache = Some(history);
        }
        Ok(page)
    }

    pub(crate) async fn clear(&self) -> Result<(), StorageError> {
        self.profiles.clear().await?;
        self.history.clear().await?;
        self.profile_cache.write().await.clear();
        *self.history_cache.write().await = None;
        Ok(())
    }
}

/// The first `limit` entries of `history`; 0 is all of them.
fn newest(history: &[LoadInstance], limit: usize) -> Vec<LoadInstance> {
    match limit {
        0 => history.to_vec(),
        n => history.iter().take(n).cloned().collect(),
    }
}

pub(crate) struct StorTables {
    tp_profiles: TypedStore<SharedBackend>,
    sm_costs: TypedStore<SharedBackend>,
    v2_sm_costs: TypedStore<SharedBackend>,
}

impl StorTables {
    pub(crate) fn new(backend: SharedBackend, marshaler: Marshaler) -> Self {
        Self {
            tp_profiles: TypedStore::new(backend.clone(), TP_STAT_QUEUE_PROFILES, marshaler),
            sm_costs: TypedStore::new(backend.clone(), SM_COSTS, marshaler),
            v2_sm_costs: TypedStore::new(backend, V2_SM_COSTS, marshaler),
        }
    }

    pub(crate) async fn get_tp_ids(&self) -> Result<Vec<String>, StorageError> {
        let rows: Vec<TpStatQueueProfile> = self.tp_profiles.values().await?;
        let ids: BTreeSet<String> = rows.into_iter().map(|row| row.tpid).collect();
        Ok(ids.into_iter().collect())
    }

    pub(crate) async fn set_tp_stat_queue_profiles(
        &self,
        tpid: &str,
        profiles: &[StatQueueProfile],
    ) -> Result<(), StorageError> {
        let rows: Vec<((String, String, String), TpStatQueueProfile)> = profiles
            .iter()
            .map(|profile| {
                (
                    (tpid.to_string(), profile.tenant.clone(), profile.id.clone()),
                    TpStatQueueProfile {
                        tpid: tpid.to_string(),
                        profile: profile.clone(),
                    },
                )
            })
            .collect();
        self.tp_profiles.put_many(&rows).await
    }

    pub(crate) async fn get_tp_stat_queue_profiles(
        &self,
        tpid: &str,
        tenant: &str,
        id: &str,
    ) -> Result<Vec<TpStatQueueProfile>, StorageError> {
        let rows: Vec<TpStatQueueProfile> = self
            .tp_profiles
            .values::<TpStatQueueProfile>()
            .await?
            .into_iter()
            .filter(|row| {
                row.tpid == tpid
                    && (tenant.is_empty() || row.profile.tenant == tenant)
                    && (id.is_empty() || row.profile.id == id)
            })
            .collect();
        if rows.is_empty() {
            return Err(StorageError::NotFound(format!("tp stat queue profiles {tpid}")));
        }
        Ok(rows)
    }

    pub(crate) async fn remove_tp_data(&self, tpid: &str) -> Result<usize, StorageError> {
        let rows: Vec<TpStatQueueProfile> = self.tp_profiles.values().await?;
        let keys: Vec<(&str, &str, &str)> = rows
            .iter()
            .filter(|row| row.tpid == tpid)
            .map(|row| (row.tpid.as_str(), row.profile.tenant.as_str(), row.profile.id.as_str()))
            .collect();
        self.tp_profiles.delete_many(&keys).await?;
        Ok(keys.len())
    }

    pub(crate) async fn set_sm_cost(&self, cost: &SmCost) -> Result<(), StorageError> {
        self.sm_costs
            .put(&(cost.cgrid.as_str(), cost.run_id.as_str()), cost)
            .await
    }

    pub(crate) async fn get_sm_costs(
        &self,
        filter: CostFilter<'_>,
    ) -> Result<Vec<SmCost>, StorageError> {
        let costs: Vec<SmCost> = self
            .sm_costs
            .values::<SmCost>()
            .await?
            .into_iter()
            .filter(|c| filter.matches(&c.cgrid, &c.run_id, &c.origin_host, &c.origin_id))
            .collect();
        if costs.is_empty() {
            return Err(StorageError::NotFound("sm costs".to_string()));
        }
        Ok(costs)
    }

    pub(crate) async fn remove_sm_cost(&self, cgrid: &str, run_id: &str) -> Result<(), StorageError> {
        if !self.sm_costs.delete(&(cgrid, run_id)).await? {
            return Err(StorageError::NotFound(format!("sm cost {cgrid}:{run_id}")));
        }
        Ok(())
    }

    pub(crate) async fn set_v2_sm_cost(&self, cost: &V2SmCost) -> Result<(), StorageError> {
        self.v2_sm_costs
            .put(&(cost.cgrid.as_str(), cost.run_id.as_str()), cost)
            .await
    }

    pub(crate) async fn get_v2_sm_costs(
        &self,
        filter: CostFilter<'_>,
    ) -> Result<Vec<V2SmCost>, StorageError> {
        let costs: Vec<V2SmCost> = self
            .v2_sm_costs
            .values::<V2SmCost>()
            .await?
            .into_iter()
            .filter(|c| filter.matches(&c.cgrid, &c.run_id, &c.origin_host, &c.origin_id))
            .collect();
        if costs.is_empty() {
            return Err(StorageError::NotFound("v2 sm costs".to_string()));
        }
        Ok(costs)
    }

    pub(crate) async fn clear(&self) -> Result<(), StorageError> {
        self.tp_profiles.clear().await?;
        self.sm_costs.clear().await?;
        self.v2_sm_costs.clear().await?;
        Ok(())
    }
}
