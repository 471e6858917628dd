// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tarifa API
//
// Service bindings of the charging engine and the wiring that starts it:
// configuration is loaded, the storage layer assembled once per capability,
// and the services exported by name through dispatchers.
//
// # Modules
//
// - [`apier`] -- `ApierV1`, administrative CRUD over StatQueueProfiles.
// - [`stats`] -- `StatSV1`, the RPC face of a `StatService`.
// - [`layer`] -- `StorageLayer`, the assembled storage capabilities.
// - [`config`] -- `EngineConfig` and its layered loading.
// - [`error`] -- The `ApiError` envelope.

pub mod apier;
pub mod config;
pub mod error;
pub mod layer;
pub mod stats;

pub use apier::ApierV1;
pub use config::EngineConfig;
pub use error::{ApiError, OK};
pub use layer::StorageLayer;
pub use stats::{StatEvent, StatQueue, StatSV1, StatService};
