// SPDX-License-Identifier: PMPL-1.0-or-later
//! Storage engines, one per backend family.
//!
//! Engines keep their objects in a [`SharedBackend`]; `open` starts on a
//! fresh [`crate::memory::InMemoryBackend`], `with_backend` takes any other.
//! Each engine validates its own parameters and fills in its default port.

pub mod document;
pub mod kv;
pub mod sql;
mod tables;

pub use document::{DocumentOptions, DocumentStore, StoragePurpose};
pub use kv::{KvOptions, KvStore};
pub use sql::{SqlDialect, SqlOptions, SqlStore};

use crate::backend::SharedBackend;
use crate::error::StorageError;

/// Backend tag of the key-value family.
pub const REDIS: &str = "redis";
/// Backend tag of the document family.
pub const MONGO: &str = "mongo";
pub const MYSQL: &str = "mysql";
pub const POSTGRES: &str = "postgres";

/// Append `default_port` unless `address` already names one. An empty
/// address means the local host. IPv6 literals come out bracketed.
pub(crate) fn with_default_port(address: &str, default_port: u16) -> String {
    if address.is_empty() {
        return format!("127.0.0.1:{default_port}");
    }
    if let Some(rest) = address.strip_prefix('[') {
        // Only text after the closing bracket can be a port.
        return match rest.split_once(']') {
            Some((_, "")) => format!("{address}:{default_port}"),
            _ => address.to_string(),
        };
    }
    match address.matches(':').count() {
        0 => format!("{address}:{default_port}"),
        1 => match address.split_once(':') {
            Some((host, "")) => format!("{host}:{default_port}"),
            _ => address.to_string(),
        },
        // Bare IPv6 literal.
        _ => format!("[{address}]:{default_port}"),
    }
}

/// Raw keys of `backend` starting with `prefix`.
pub(crate) async fn list_keys(
    backend: &SharedBackend,
    prefix: &str,
) -> Result<Vec<String>, StorageError> {
    let keys = backend.keys_with_prefix(prefix.as_bytes()).await?;
    Ok(keys
        .into_iter()
        .map(|key| String::from_utf8_lossy(&key).into_owned())
        .collect())
}
