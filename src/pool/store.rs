/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::*;
use parking_lot::{Mutex, RwLock};

use crate::internal_common::*;
use super::{MixPool, MixTransaction};

///A pool together with everything recorded against it.
///
///Only ever accessed through the pool's lock in a `PoolStore`.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub(crate) pool: MixPool,
    pub(crate) key_images: HashSet<KeyImage>,
    pub(crate) transactions: Vec<MixTransaction>,
    ///Set once the pool is removed from its store.
    pub(crate) evicted: bool

} impl PoolEntry {
    pub fn new(pool: MixPool) -> Self {
        return Self{pool, key_images: HashSet::new(), transactions: Vec::new(), evicted: false}
    }

    pub fn pool(&self) -> &MixPool {
        return &self.pool
    }

    pub fn transactions(&self) -> &[MixTransaction] {
        return &self.transactions
    }

    ///True if a request signed with this key image was accepted by the pool.
    pub fn has_key_image(&self, key_image: &KeyImage) -> bool {
        return self.key_images.contains(key_image)
    }
}

///Registry of pools, with one lock per pool.
///
///The map lock is only held to find or insert an entry;
///every read or write of a pool happens under its own `Mutex`,
///so different pools never wait on each other.
#[derive(Debug, Default)]
pub struct PoolStore {
    pools: RwLock<HashMap<PoolId, Arc<Mutex<PoolEntry>>>>,
    transaction_index: RwLock<HashMap<TransactionId, PoolId>>

} impl PoolStore {
    pub fn new() -> Self {
        return Self::default()
    }

    ///Add a pool. Returns `false`, leaving the store untouched, if the id is taken.
    pub fn insert(&self, pool: MixPool) -> bool {
        let id = pool.id.clone();
        let mut pools = self.pools.write();
        if pools.contains_key(&id) {
            warn!("Pool {id} already exists, not replacing it");
            return false
        }
        pools.insert(id, Arc::new(Mutex::new(PoolEntry::new(pool))));
        trace!("Stored pool");
        return true
    }

    ///The lock guarding a pool, if it exists.
    pub fn checkout(&self, id: &PoolId) -> Option<Arc<Mutex<PoolEntry>>> {
        return self.pools.read().get(id).cloned()
    }

    pub fn contains(&self, id: &PoolId) -> bool {
        return self.pools.read().contains_key(id)
    }

    ///A snapshot of the pool, taken under its lock.
    pub fn peek(&self, id: &PoolId) -> Option<MixPool> {
        let entry = self.checkout(id)?;
        let pool = entry.lock().pool.clone();
        return Some(pool)
    }

    ///Every pool's lock, so callers can visit pools one at a time
    ///without holding the map lock.
    pub fn entries(&self) -> Vec<Arc<Mutex<PoolEntry>>> {
        return self.pools.read().values().cloned().collect()
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        return self.pools.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        return self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        return self.pools.read().is_empty()
    }

    ///Drop a pool and the index entries of its transactions.
    ///Returns `false` if there was no such pool.
    pub fn remove(&self, id: &PoolId) -> bool {
        let removed = self.pools.write().remove(id);
        let entry = match removed {
            Some(entry) => entry,
            None => return false
        };

        let mut entry = entry.lock();
        entry.evicted = true;
        let mut index = self.transaction_index.write();
        for transaction in &entry.transactions {
            index.remove(&transaction.id);
        }
        trace!("Removed pool");
        return true
    }

    pub(crate) fn index_transaction(&self, transaction: &TransactionId, pool: &PoolId) {
        self.transaction_index.write().insert(transaction.clone(), pool.clone());
    }

    ///The pool a transaction was recorded in.
    pub fn pool_of(&self, transaction: &TransactionId) -> Option<PoolId> {
        return self.transaction_index.read().get(transaction).cloned()
    }
}
