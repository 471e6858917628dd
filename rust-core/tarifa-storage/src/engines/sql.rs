// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Relational family engine (`postgres`, `mysql`).
//
// Serves the generic, bulk-load and CDR capabilities. Rows are stored as
// JSON regardless of the configured marshaler; the relational schemas
// keep their columns in text form.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::tables::StorTables;
use super::{list_keys, with_default_port, MYSQL, POSTGRES};
use crate::backend::SharedBackend;
use crate::config::PoolConfig;
use crate::contracts::{CdrStorage, LoadStorage, Storage};
use crate::error::StorageError;
use crate::marshal::Marshaler;
use crate::memory::InMemoryBackend;
use crate::model::{CostFilter, SmCost, StatQueueProfile, TpStatQueueProfile, V2SmCost};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    MySql,
}

impl SqlDialect {
    pub fn default_port(self) -> u16 {
        match self {
            SqlDialect::Postgres => 5432,
            SqlDialect::MySql => 3306,
        }
    }

    /// Backend tag of the dialect.
    pub fn tag(self) -> &'static str {
        match self {
            SqlDialect::Postgres => POSTGRES,
            SqlDialect::MySql => MYSQL,
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone)]
pub struct SqlOptions {
    pub dialect: SqlDialect,
    pub address: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool: PoolConfig,
}

pub struct SqlStore {
    dialect: SqlDialect,
    address: String,
    database: String,
    user: String,
    pool: PoolConfig,
    backend: SharedBackend,
    stor: StorTables,
}

impl SqlStore {
    pub fn open(options: SqlOptions) -> Result<Self, StorageError> {
        Self::with_backend(options, Arc::new(InMemoryBackend::new()))
    }

    pub fn with_backend(options: SqlOptions, backend: SharedBackend) -> Result<Self, StorageError> {
        let dialect = options.dialect;
        if options.database.is_empty() {
            return Err(StorageError::InvalidConfig(format!(
                "{dialect} database name is required"
            )));
        }
        if options.user.is_empty() {
            return Err(StorageError::InvalidConfig(format!("{dialect} user is required")));
        }
        let pool = options.pool;
        if pool.max_open_conns > 0 && pool.max_idle_conns > pool.max_open_conns {
            return Err(StorageError::InvalidConfig(format!(
                "{dialect} max_idle_conns ({}) exceeds max_open_conns ({})",
                pool.max_idle_conns, pool.max_open_conns
            )));
        }

        let address = with_default_port(&options.address, dialect.default_port());
        debug!(
            dialect = %dialect,
            address = %address,
            database = %options.database,
            max_open_conns = pool.max_open_conns,
            "opened sql store"
        );

        Ok(Self {
            stor: StorTables::new(backend.clone(), Marshaler::Json),
            dialect,
            address,
            database: options.database,
            user: options.user,
            pool,
            backend,
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn pool(&self) -> PoolConfig {
        self.pool
    }
}

impl fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlStore")
            .field("dialect", &self.dialect)
            .field("address", &self.address)
            .field("database", &self.database)
            .finish()
    }
}

#[async_trait]
impl Storage for SqlStore {
    fn backend(&self) -> &'static str {
        self.dialect.tag()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}://{}@{}/{}",
            self.dialect.scheme(),
            self.user,
            self.address,
            self.database
        )
    }

    async fn keys_for_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        list_keys(&self.backend, prefix).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.stor.clear().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.backend.flush().await
    }
}

#[async_trait]
impl LoadStorage for SqlStore {
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
impl CdrStorage for SqlStore {
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
