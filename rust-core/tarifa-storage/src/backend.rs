// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Raw byte store underneath every engine.
//
// Engines never encode bytes themselves; each of their tables is a
// `TypedStore` namespace over one shared `StorageBackend`. A backend only has
// to provide ordered prefix access and an atomic batch; clearing a table or
// dropping a tariff plan is expressed through those.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageError;

/// One step of an atomic [`StorageBackend::write_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp<'a> {
    Put { key: &'a [u8], value: &'a [u8] },
    Delete { key: &'a [u8] },
}

/// Ordered key-value store with opaque byte keys and values.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// `Ok(None)` when `key` is absent.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Whether `key` was present.
    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError>;

    /// Up to `limit` entries whose key starts with `prefix`, in key order.
    async fn scan_prefix(
        &self,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Keys starting with `prefix`, in key order.
    async fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError>;

    /// Apply `ops` in order, all or nothing.
    async fn write_batch(&self, ops: &[WriteOp<'_>]) -> Result<(), StorageError>;

    /// Remove every key starting with `prefix`; returns how many went.
    async fn delete_prefix(&self, prefix: &[u8]) -> Result<usize, StorageError>;

    async fn flush(&self) -> Result<(), StorageError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Backend handle shared by all tables of one engine.
pub type SharedBackend = Arc<dyn StorageBackend>;

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).delete(key).await
    }

    async fn scan_prefix(
        &self,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        (**self).scan_prefix(prefix, limit).await
    }

    async fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        (**self).keys_with_prefix(prefix).await
    }

    async fn write_batch(&self, ops: &[WriteOp<'_>]) -> Result<(), StorageError> {
        (**self).write_batch(ops).await
    }

    async fn delete_prefix(&self, prefix: &[u8]) -> Result<usize, StorageError> {
        (**self).delete_prefix(prefix).await
    }

    async fn flush(&self) -> Result<(), StorageError> {
        (**self).flush().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
