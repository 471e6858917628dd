// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tarifa Storage Layer
//
// This crate defines the storage capabilities of the charging engine and the
// factory that builds them from configuration. Consumers depend on the four
// capability traits only; the backend family behind each one is chosen by a
// tag in the `data_db` / `stor_db` configuration sections.
//
// # Modules
//
// - [`contracts`] -- The `Storage`, `DataDb`, `LoadStorage` and `CdrStorage`
//   capability traits.
// - [`factory`] -- Per-capability constructor registries and the
//   `configure_*` entry points.
// - [`engines`] -- Key-value, document and relational engines.
// - [`config`] -- Per-capability configuration structs.
// - [`model`] -- Persisted entities (profiles, load history, session costs).
// - [`backend`] / [`memory`] / [`typed`] -- The raw key-value interface the
//   engines store through, its in-memory implementation, and a namespaced,
//   marshaler-aware view over it.
// - [`marshal`] -- Value encodings (`json`, `cbor`).
// - [`cache`] -- Bounded cache partitions of the primary store.
// - [`error`] -- The `StorageError` enum.
//
// # Example
//
// ```rust
// use tarifa_storage::config::DataDbConfig;
// use tarifa_storage::contracts::DataDb;
// use tarifa_storage::factory::configure_data_db;
// use tarifa_storage::model::StatQueueProfile;
//
// # tokio_test::block_on(async {
// let data_db = configure_data_db(DataDbConfig::default()).unwrap();
//
// let profile = StatQueueProfile {
//     tenant: "cgrates.org".to_string(),
//     id: "SQ1".to_string(),
//     ..Default::default()
// };
// data_db.set_stat_queue_profile(&profile).await.unwrap();
//
// let stored = data_db.get_stat_queue_profile("cgrates.org", "SQ1", false).await.unwrap();
// assert_eq!(stored, profile);
// # });
// ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod contracts;
pub mod engines;
pub mod error;
pub mod factory;
pub mod marshal;
pub mod memory;
pub mod model;
pub mod typed;

pub use backend::{SharedBackend, StorageBackend, WriteOp};
pub use config::{CacheConfig, CachePartition, ConnectionParams, DataDbConfig, PoolConfig, StorDbConfig};
pub use contracts::{CdrStorage, DataDb, LoadStorage, Storage};
pub use error::{StorageError, StorageResult};
pub use factory::{
    configure_cdr_db, configure_data_db, configure_load_db, configure_stor_db, Capability,
    StorageFactory,
};
pub use marshal::Marshaler;
pub use memory::InMemoryBackend;
pub use model::{StatQueueProfile, TenantId, TenantScoped};
pub use typed::TypedStore;
