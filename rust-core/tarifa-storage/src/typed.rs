// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Typed table on top of a raw `StorageBackend`.
//
// Every engine table (profiles, load history, tariff-plan rows, SM costs) is
// a `TypedStore` with its own namespace over the engine's shared backend.
// Keys are structured values: a `(tenant, id)` pair is written as a JSON
// array, so `("a:b", "c")` and `("a", "b:c")` can never share a slot. Values
// go through the engine's configured `Marshaler`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{StorageBackend, WriteOp};
use crate::error::StorageError;
use crate::marshal::Marshaler;

/// A namespaced, marshaler-aware view over a [`StorageBackend`].
///
/// # Example
///
/// ```rust
/// use tarifa_storage::marshal::Marshaler;
/// use tarifa_storage::memory::InMemoryBackend;
/// use tarifa_storage::typed::TypedStore;
///
/// # tokio_test::block_on(async {
/// let store = TypedStore::new(InMemoryBackend::new(), "sqp", Marshaler::Cbor);
/// store.put(&("cgrates.org", "SQ1"), &20.0_f64).await.unwrap();
///
/// let weight: f64 = store.get(&("cgrates.org", "SQ1")).await.unwrap().unwrap();
/// assert_eq!(weight, 20.0);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TypedStore<B: StorageBackend> {
    backend: B,
    namespace: String,
    marshaler: Marshaler,
}

impl<B: StorageBackend> TypedStore<B> {
    /// Create a typed table named `namespace` over `backend`.
    pub fn new(backend: B, namespace: &str, marshaler: Marshaler) -> Self {
        Self {
            backend,
            namespace: namespace.to_string(),
            marshaler,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn marshaler(&self) -> Marshaler {
        self.marshaler
    }

    fn prefix_bytes(&self) -> Vec<u8> {
        format!("{}:", self.namespace).into_bytes()
    }

    /// Full backend key: `"{namespace}:"` followed by the JSON form of `key`.
    fn encode_key<K: Serialize + ?Sized>(&self, key: &K) -> Result<Vec<u8>, StorageError> {
        let mut full = self.prefix_bytes();
        serde_json::to_writer(&mut full, key).map_err(|err| {
            StorageError::SerializationError(format!(
                "failed to encode key in '{}': {}",
                self.namespace, err
            ))
        })?;
        Ok(full)
    }

    fn decode<T: DeserializeOwned>(&self, raw: &[u8]) -> Result<T, StorageError> {
        self.marshaler.unmarshal(raw).map_err(|err| {
            StorageError::SerializationError(format!(
                "failed to deserialize value in '{}': {}",
                self.namespace, err
            ))
        })
    }

    /// Retrieve and decode the value stored under `key`.
    pub async fn get<K, T>(&self, key: &K) -> Result<Option<T>, StorageError>
    where
        K: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let full_key = self.encode_key(key)?;
        match self.backend.get(&full_key).await? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`, replacing any previous value.
    pub async fn put<K, T>(&self, key: &K, value: &T) -> Result<(), StorageError>
    where
        K: Serialize + ?Sized + Sync,
        T: Serialize + ?Sized + Sync,
    {
        let full_key = self.encode_key(key)?;
        let bytes = self.marshaler.marshal(value)?;
        self.backend.put(&full_key, &bytes).await
    }

    /// Store many entries in one atomic backend write.
    pub async fn put_many<K, T>(&self, entries: &[(K, T)]) -> Result<(), StorageError>
    where
        K: Serialize + Sync,
        T: Serialize + Sync,
    {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            encoded.push((self.encode_key(key)?, self.marshaler.marshal(value)?));
        }
        let ops: Vec<WriteOp<'_>> = encoded
            .iter()
            .map(|(key, value)| WriteOp::Put {
                key: key.as_slice(),
                value: value.as_slice(),
            })
            .collect();
        self.backend.write_batch(&ops).await
    }

    /// Delete the value under `key`. Returns `Ok(true)` if it existed.
    pub async fn delete<K>(&self, key: &K) -> Result<bool, StorageError>
    where
        K: Serialize + ?Sized + Sync,
    {
        let full_key = self.encode_key(key)?;
        self.backend.delete(&full_key).await
    }

    /// Delete `keys` in one atomic backend write; absent keys are skipped.
    pub async fn delete_many<K>(&self, keys: &[K]) -> Result<(), StorageError>
    where
        K: Serialize + Sync,
    {
        let encoded = keys
            .iter()
            .map(|key| self.encode_key(key))
            .collect::<Result<Vec<_>, _>>()?;
        let ops: Vec<WriteOp<'_>> = encoded
            .iter()
            .map(|key| WriteOp::Delete { key: key.as_slice() })
            .collect();
        self.backend.write_batch(&ops).await
    }

    /// Decode every value in this namespace, in key order.
    pub async fn values<T: DeserializeOwned>(&self) -> Result<Vec<T>, StorageError> {
        let raw = self
            .backend
            .scan_prefix(&self.prefix_bytes(), usize::MAX)
            .await?;
        raw.iter().map(|(_, value)| self.decode(value)).collect()
    }

    /// Drop the whole namespace, returning how many entries went.
    pub async fn clear(&self) -> Result<usize, StorageError> {
        self.backend.delete_prefix(&self.prefix_bytes()).await
    }
}
