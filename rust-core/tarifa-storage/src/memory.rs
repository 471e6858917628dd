// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Process-local backend.
//
// Engines opened by the factory keep their tables here. Keys live in a
// `BTreeMap`, so a table namespace is one contiguous range.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{StorageBackend, WriteOp};
use crate::error::StorageError;

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered in-memory backend. Clones share one map.
///
/// # Example
///
/// ```rust
/// use tarifa_storage::backend::{StorageBackend, WriteOp};
/// use tarifa_storage::memory::InMemoryBackend;
///
/// # tokio_test::block_on(async {
/// let backend = InMemoryBackend::new();
/// backend
///     .write_batch(&[
///         WriteOp::Put { key: b"smc:1", value: b"a" },
///         WriteOp::Put { key: b"smc:2", value: b"b" },
///     ])
///     .await
///     .unwrap();
/// assert_eq!(backend.delete_prefix(b"smc:").await.unwrap(), 2);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    map: Arc<RwLock<Map>>,
}

/// Keys of `map` within the `prefix` range.
fn prefix_range<'m>(
    map: &'m Map,
    prefix: &[u8],
) -> impl Iterator<Item = (&'m Vec<u8>, &'m Vec<u8>)> + 'm {
    let prefix = prefix.to_vec();
    map.range::<[u8], _>((Bound::Included(prefix.as_slice()), Bound::Unbounded))
        .take_while(move |(key, _)| key.starts_with(&prefix))
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.map.read().await.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.map.write().await.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.map.write().await.remove(key).is_some())
    }

    async fn scan_prefix(
        &self,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let map = self.map.read().await;
        Ok(prefix_range(&map, prefix)
            .take(limit)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StorageError> {
        let map = self.map.read().await;
        Ok(prefix_range(&map, prefix).map(|(key, _)| key.clone()).collect())
    }

    async fn write_batch(&self, ops: &[WriteOp<'_>]) -> Result<(), StorageError> {
        // One write guard for the whole batch; no reader sees a partial batch.
        let mut map = self.map.write().await;
        for op in ops {
            match *op {
                WriteOp::Put { key, value } => {
                    map.insert(key.to_vec(), value.to_vec());
                }
                WriteOp::Delete { key } => {
                    map.remove(key);
                }
            }
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &[u8]) -> Result<usize, StorageError> {
        let mut map = self.map.write().await;
        let doomed: Vec<Vec<u8>> = prefix_range(&map, prefix).map(|(key, _)| key.clone()).collect();
        for key in &doomed {
            map.remove(key);
        }
        Ok(doomed.len())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
