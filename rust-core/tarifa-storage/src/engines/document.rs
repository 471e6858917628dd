// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Document family engine (`mongo`).
//
// The only family that backs every capability. One constructor serves both
// roles; the `StoragePurpose` passed in decides which tuning applies: a
// primary-store purpose carries the cache and load-history settings, a
// stor purpose carries the CDR indexes and runs without a profile cache.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::tables::{DataTables, StorTables};
use super::{list_keys, with_default_port, MONGO};
use crate::backend::SharedBackend;
use crate::config::CacheConfig;
use crate::contracts::{CdrStorage, DataDb, LoadStorage, Storage};
use crate::error::StorageError;
use crate::marshal::Marshaler;
use crate::memory::InMemoryBackend;
use crate::model::{
    CostFilter, LoadInstance, SmCost, StatQueueProfile, TpStatQueueProfile, V2SmCost,
};

/// Role a document store is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoragePurpose {
    DataDb {
        cache: CacheConfig,
        load_history_size: usize,
    },
    StorDb {
        cdrs_indexes: Vec<String>,
    },
}

impl StoragePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoragePurpose::DataDb { .. } => "data_db",
            StoragePurpose::StorDb { .. } => "stor_db",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// `host[:port]`; the port defaults to [`DocumentStore::DEFAULT_PORT`].
    pub address: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub marshaler: Marshaler,
    pub purpose: StoragePurpose,
}

/// Document-family engine implementing all four capabilities.
pub struct DocumentStore {
    address: String,
    database: String,
    user: String,
    purpose: StoragePurpose,
    backend: SharedBackend,
    data: DataTables,
    stor: StorTables,
}

impl DocumentStore {
    pub const DEFAULT_PORT: u16 = 27017;

    pub fn open(options: DocumentOptions) -> Result<Self, StorageError> {
        Self::with_backend(options, Arc::new(InMemoryBackend::new()))
    }

    pub fn with_backend(
        options: DocumentOptions,
        backend: SharedBackend,
    ) -> Result<Self, StorageError> {
        if options.database.is_empty() {
            return Err(StorageError::InvalidConfig(
                "mongo database name is required".to_string(),
            ));
        }
        if options.user.is_empty() && !options.password.is_empty() {
            return Err(StorageError::InvalidConfig(
                "mongo password given without a user".to_string(),
            ));
        }
        let (cache, load_history_size) = match &options.purpose {
            StoragePurpose::DataDb {
                cache,
                load_history_size,
            } => (*cache, *load_history_size),
            StoragePurpose::StorDb { cdrs_indexes } => {
                if cdrs_indexes.iter().any(|index| index.trim().is_empty()) {
                    return Err(StorageError::InvalidConfig(
                        "mongo cdrs_indexes contains an empty field name".to_string(),
                    ));
                }
                (CacheConfig::disabled(), 1)
            }
        };

        let address = with_default_port(&options.address, Self::DEFAULT_PORT);
        debug!(
            address = %address,
            database = %options.database,
            purpose = options.purpose.as_str(),
            "opened document store"
        );

        Ok(Self {
            data: DataTables::new(backend.clone(), options.marshaler, cache, load_history_size),
            stor: StorTables::new(backend.clone(), options.marshaler),
            address,
            database: options.database,
            user: options.user,
            purpose: options.purpose,
            backend,
        })
    }

    pub fn purpose(&self) -> &StoragePurpose {
        &self.purpose
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// CDR fields indexed by a stor-purpose store; empty otherwise.
    pub fn cdrs_indexes(&self) -> &[String] {
        match &self.purpose {
            StoragePurpose::StorDb { cdrs_indexes } => cdrs_indexes,
            StoragePurpose::DataDb { .. } => &[],
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("address", &self.address)
            .field("database", &self.database)
            .field("purpose", &self.purpose.as_str())
            .finish()
    }
}

#[async_trait]
impl Storage for DocumentStore {
    fn backend(&self) -> &'static str {
        MONGO
    }

    fn endpoint(&self) -> String {
        if self.user.is_empty() {
            format!("mongodb://{}/{}", self.address, self.database)
        } else {
            format!("mongodb://{}@{}/{}", self.user, self.address, self.database)
        }
    }

    async fn keys_for_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        list_keys(&self.backend, prefix).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.data.clear().await?;
        self.stor.clear().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.backend.flush().await
    }
}

#[async_trait]
impl DataDb for DocumentStore {
    async fn get_stat_queue_profile(
        &self,
        tenant: &str,
        id: &str,
        skip_cache: bool,
    ) -> Result<StatQueueProfile, StorageError> {
        self.data.get_stat_queue_profile(tenant, id, skip_cache).await
    }

    async fn set_stat_queue_profile(
        &self,
        profile: &StatQueueProfile,
    ) -> Result<(), StorageError> {
        self.data.set_stat_queue_profile(profile).await
    }

    async fn rem_stat_queue_profile(&self, tenant: &str, id: &str) -> Result<(), StorageError> {
        self.data.rem_stat_queue_profile(tenant, id).await
    }

    async fn add_load_history(&self, load: LoadInstance) -> Result<(), StorageError> {
        self.data.add_load_history(load).await
    }

    async fn get_load_history(
        &self,
        limit: usize,
        skip_cache: bool,
    ) -> Result<Vec<LoadInstance>, StorageError> {
        self.data.get_load_history(limit, skip_cache).await
    }
}

#[async_trait]
impl LoadStorage for DocumentStore {
    async fn get_tp_ids(&self) -> Result<Vec<String>, StorageError> {
        self.stor.get_tp_ids().await
    }

    async fn set_tp_stat_queue_profiles(
        &self,
        tpid: &str,
        profiles: &[StatQueueProfile],
    ) -> Result<(), StorageError> {
        self.stor.set_tp_stat_queue_profiles(tpid, profiles).await
    }

    async fn get_tp_stat_queue_profiles(
        &self,
        tpid: &str,
        tenant: &str,
        id: &str,
    ) -> Result<Vec<TpStatQueueProfile>, StorageError> {
        self.stor.get_tp_stat_queue_profiles(tpid, tenant, id).await
    }

    async fn remove_tp_data(&self, tpid: &str) -> Result<usize, StorageError> {
        self.stor.remove_tp_data(tpid).await
    }
}

#[async_trait]
impl CdrStorage for DocumentStore {
    async fn set_sm_cost(&self, cost: &SmCost) -> Result<(), StorageError> {
        self.stor.set_sm_cost(cost).await
    }

    async fn get_sm_costs(&self, filter: CostFilter<'_>) -> Result<Vec<SmCost>, StorageError> {
        self.stor.get_sm_costs(filter).await
    }

    async fn remove_sm_cost(&self, cgrid: &str, run_id: &str) -> Result<(), StorageError> {
        self.stor.remove_sm_cost(cgrid, run_id).await
    }

    async fn set_v2_sm_cost(&self, cost: &V2SmCost) -> Result<(), StorageError> {
        self.stor.set_v2_sm_cost(cost).await
    }

    async fn get_v2_sm_costs(
        &self,
        filter: CostFilter<'_>,
    ) -> Result<Vec<V2SmCost>, StorageError> {
        self.stor.get_v2_sm_costs(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttrCdrsStoreSmCost, CallCost};

    fn stor_options() -> DocumentOptions {
        DocumentOptions {
            address: "mongo.example.com".to_string(),
            database: "tarifa".to_string(),
            user: "tarifa".to_string(),
            password: "secret".to_string(),
            marshaler: Marshaler::Json,
            purpose: StoragePurpose::StorDb {
                cdrs_indexes: vec!["origin_id".to_string()],
            },
        }
    }

    fn cost(cgrid: &str, origin_id: &str) -> SmCost {
        SmCost {
            cgrid: cgrid.to_string(),
            run_id: "*default".to_string(),
            origin_host: "127.0.0.1".to_string(),
            origin_id: origin_id.to_string(),
            cost_source: "*sessions".to_string(),
            usage: 60.0,
            cost_details: Some(CallCost(serde_json::json!({"cost": 0.12}))),
        }
    }

    #[test]
    fn test_endpoint_hides_password() {
        let store = DocumentStore::open(stor_options()).unwrap();
        assert_eq!(store.endpoint(), "mongodb://tarifa@mongo.example.com:27017/tarifa");
        assert_eq!(store.cdrs_indexes(), ["origin_id".to_string()]);
    }

    #[test]
    fn test_password_without_user_rejected() {
        let err = DocumentStore::open(DocumentOptions {
            user: String::new(),
            ..stor_options()
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_database_rejected() {
        let err = DocumentStore::open(DocumentOptions {
            database: String::new(),
            ..stor_options()
        })
        .unwrap_err();
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_purpose_is_kept() {
        let store = DocumentStore::open(DocumentOptions {
            purpose: StoragePurpose::DataDb {
                cache: CacheConfig::default(),
                load_history_size: 5,
            },
            ..stor_options()
        })
        .unwrap();
        assert_eq!(store.purpose().as_str(), "data_db");
        assert!(store.cdrs_indexes().is_empty());
    }

    #[tokio::test]
    async fn test_sm_cost_filters_and_duplicates() {
        let store = DocumentStore::open(stor_options()).unwrap();
        store.set_sm_cost(&cost("cg1", "sess-1")).await.unwrap();
        store.set_sm_cost(&cost("cg2", "other-2")).await.unwrap();

        let by_prefix = store
            .get_sm_costs(CostFilter {
                origin_id_prefix: "sess-",
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_prefix, vec![cost("cg1", "sess-1")]);

        let dup = store
            .store_sm_cost(AttrCdrsStoreSmCost {
                cost: cost("cg1", "sess-1"),
                check_duplicate: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(dup, StorageError::Duplicate(_)));

        store.remove_sm_cost("cg1", "*default").await.unwrap();
        assert!(store
            .get_sm_costs(CostFilter::by_id("cg1", ""))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_v1_and_v2_costs_live_side_by_side() {
        let store = DocumentStore::open(stor_options()).unwrap();
        store.set_sm_cost(&cost("cg1", "sess-1")).await.unwrap();
        assert!(store
            .get_v2_sm_costs(CostFilter::by_id("cg1", ""))
            .await
            .unwrap_err()
            .is_not_found());

        store
            .set_v2_sm_cost(&V2SmCost {
                cgrid: "cg1".to_string(),
                run_id: "*default".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.get_sm_costs(CostFilter::by_id("cg1", "")).await.unwrap().len(), 1);
        assert_eq!(store.get_v2_sm_costs(CostFilter::by_id("cg1", "")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tariff_plan_staging() {
        let store = DocumentStore::open(stor_options()).unwrap();
        let profiles = vec![
            StatQueueProfile {
                tenant: "cgrates.org".to_string(),
                id: "SQ1".to_string(),
                ..Default::default()
            },
            StatQueueProfile {
                tenant: "cgrates.org".to_string(),
                id: "SQ2".to_string(),
                ..Default::default()
            },
        ];
        store.set_tp_stat_queue_profiles("TP1", &profiles).await.unwrap();
        store.set_tp_stat_queue_profiles("TP2", &profiles[..1]).await.unwrap();

        assert_eq!(store.get_tp_ids().await.unwrap(), vec!["TP1", "TP2"]);
        let sq2 = store
            .get_tp_stat_queue_profiles("TP1", "", "SQ2")
            .await
            .unwrap();
        assert_eq!(sq2.len(), 1);
        assert_eq!(sq2[0].profile.id, "SQ2");

        assert_eq!(store.remove_tp_data("TP1").await.unwrap(), 2);
        assert_eq!(store.get_tp_ids().await.unwrap(), vec!["TP2"]);
        assert!(store
            .get_tp_stat_queue_profiles("TP1", "", "")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
