// SPDX-License-Identifier: PMPL-1.0-or-later
//! Bounded in-process cache used by the primary store.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::config::CachePartition;

/// Insertion-ordered cache; the oldest entry is evicted once `limit` is hit.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    limit: Option<usize>,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Clone + Eq + Hash, V: Clone> BoundedCache<K, V> {
    pub fn new(partition: CachePartition) -> Self {
        Self {
            limit: partition.limit,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.limit == Some(0) {
            return;
        }
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        if let Some(limit) = self.limit {
            while self.entries.len() > limit {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
