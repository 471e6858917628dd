// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Key-value family engine (`redis`).
//
// Databases of this family are addressed by numeric index rather than by
// name. The engine serves the primary-store capability only.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::tables::DataTables;
use super::{list_keys, with_default_port, REDIS};
use crate::backend::SharedBackend;
use crate::config::CacheConfig;
use crate::contracts::{DataDb, Storage};
use crate::error::StorageError;
use crate::marshal::Marshaler;
use crate::memory::InMemoryBackend;
use crate::model::{LoadInstance, StatQueueProfile};

/// Parameters of a key-value store, already validated by the factory.
#[derive(Debug, Clone)]
pub struct KvOptions {
    /// `host[:port]`; the port defaults to [`KvStore::DEFAULT_PORT`].
    pub address: String,
    pub db_index: u32,
    pub password: String,
    pub marshaler: Marshaler,
    pub max_conns: usize,
    pub cache: CacheConfig,
    pub load_history_size: usize,
}

/// Primary store on the key-value family.
pub struct KvStore {
    address: String,
    db_index: u32,
    max_conns: usize,
    requires_auth: bool,
    marshaler: Marshaler,
    backend: SharedBackend,
    data: DataTables,
}

impl KvStore {
    pub const DEFAULT_PORT: u16 = 6379;
    /// Connection pool size used by the factory.
    pub const MAX_CONNS: usize = 10;

    pub fn open(options: KvOptions) -> Result<Self, StorageError> {
        Self::with_backend(options, Arc::new(InMemoryBackend::new()))
    }

    pub fn with_backend(options: KvOptions, backend: SharedBackend) -> Result<Self, StorageError> {
        if options.max_conns == 0 {
            return Err(StorageError::InvalidConfig(
                "redis connection pool needs at least one connection".to_string(),
            ));
        }
        let address = with_default_port(&options.address, Self::DEFAULT_PORT);
        debug!(
            address = %address,
            db_index = options.db_index,
            marshaler = %options.marshaler,
            backend = backend.name(),
            "opened key-value store"
        );

        Ok(Self {
            data: DataTables::new(
                backend.clone(),
                options.marshaler,
                options.cache,
                options.load_history_size,
            ),
            address,
            db_index: options.db_index,
            max_conns: options.max_conns,
            requires_auth: !options.password.is_empty(),
            marshaler: options.marshaler,
            backend,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn db_index(&self) -> u32 {
        self.db_index
    }

    pub fn max_conns(&self) -> usize {
        self.max_conns
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn marshaler(&self) -> Marshaler {
        self.marshaler
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("address", &self.address)
            .field("db_index", &self.db_index)
            .field("marshaler", &self.marshaler)
            .finish()
    }
}

#[async_trait]
impl Storage for KvStore {
    fn backend(&self) -> &'static str {
        REDIS
    }

    fn endpoint(&self) -> String {
        format!("redis://{}/{}", self.address, self.db_index)
    }

    async fn keys_for_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        list_keys(&self.backend, prefix).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.data.clear().await
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.backend.flush().await
    }
}

#[async_trait]
impl DataDb for KvStore {
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
