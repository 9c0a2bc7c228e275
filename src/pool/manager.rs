/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::Arc;

use log::*;
use rand::{thread_rng, Rng};

use crate::internal_common::*;
use crate::config::MixerConfig;
use super::*;

///Owns the lifecycle of every pool in a `PoolStore`.
pub struct MixPoolManager {
    config: MixerConfig,
    store: Arc<PoolStore>,
    clock: Arc<dyn Clock>

} impl MixPoolManager {
    ///A manager with an empty store, on the system clock.
    pub fn new(config: MixerConfig) -> Self {
        return Self::with_store(config, Arc::new(PoolStore::new()), Arc::new(SystemClock))
    }

    ///A manager over an existing store and clock.
    pub fn with_store(config: MixerConfig, store: Arc<PoolStore>, clock: Arc<dyn Clock>) -> Self {
        return Self{config, store, clock}
    }

    pub fn config(&self) -> &MixerConfig {
        return &self.config
    }

    pub fn store(&self) -> &Arc<PoolStore> {
        return &self.store
    }

    pub fn now_ms(&self) -> u64 {
        return self.clock.now_ms()
    }

    fn entry(&self, pool_id: &PoolId) -> Result<Arc<parking_lot::Mutex<PoolEntry>>, MixError> {
        return self.store.checkout(pool_id)
            .ok_or_else(|| MixError::PoolNotFound(pool_id.clone()))
    }

    ///Open a new pool for `asset`, accepting amounts in `[min_amount, max_amount]`.
    pub fn create_mix_pool(
        &self, asset: &str, min_amount: u64, max_amount: u64, mix_depth: u32
    ) -> Result<MixPool, MixError> {
        if asset.is_empty() {
            return Err(MixError::InvalidPool("asset must not be empty".into()))
        }
        if min_amount == 0 {
            return Err(MixError::InvalidPool("min_amount must be positive".into()))
        }
        if min_amount > max_amount {
            return Err(MixError::InvalidPool(format!("min_amount {min_amount} exceeds max_amount {max_amount}")))
        }

        let pool = MixPool{
            id: PoolId::random(),
            asset: asset.to_string(),
            min_amount,
            max_amount,
            mix_depth,
            fee_basis_points: self.config.fee_basis_points,
            anonymity_set: Vec::new(),
            state: PoolState::Open,
            created_at: self.clock.now_ms(),
            ttl_ms: self.config.pool_ttl_ms(),
            closed_at: None
        };
        if !self.store.insert(pool.clone()) {
            return Err(MixError::InvalidPool(format!("pool {} already exists", pool.id)))
        }
        info!("Created pool {} for {asset} [{min_amount}, {max_amount}]", pool.id);
        return Ok(pool)
    }

    ///Submit `request` to a pool.
    ///
    ///Unknown pools and malformed requests are errors. Any other rejection is returned as a
    ///`Failed` transaction naming the reason, and leaves the pool exactly as it was.
    pub fn join_mix_pool(&self, pool_id: &PoolId, request: MixRequest) -> Result<MixTransaction, MixError> {
        let entry = self.entry(pool_id)?;
        if request.pool_id != *pool_id {
            return Err(MixError::MalformedRequest(format!("request is for pool {}", request.pool_id)))
        }
        if request.output_addresses.is_empty() {
            return Err(MixError::MalformedRequest("no output addresses".into()))
        }
        if request.output_addresses.len() > self.config.max_outputs {
            return Err(MixError::MalformedRequest(format!(
                "{} output addresses, at most {} are allowed", request.output_addresses.len(), self.config.max_outputs
            )))
        }
        let delay_range = request.delay_range.unwrap_or(self.config.default_delay_range);
        if !delay_range.is_valid() {
            return Err(MixError::MalformedRequest("delay range is empty".into()))
        }

        //verification is pure, keep it outside the pool lock
        let signature_valid = request.ring_signature.verify(&request.message());

        let mut entry = entry.lock();
        if entry.evicted {
            return Err(MixError::PoolNotFound(pool_id.clone()))
        }
        let now = self.clock.now_ms();
        let rejection = self.check_request(&entry, &request, signature_valid, now);

        let transaction = match rejection {
            Some(reason) => {
                debug!("Rejected request against pool {pool_id}: {reason}");
                MixTransaction::rejected(&request, delay_range, reason, now)
            },
            None => {
                //checked above, under the same lock
                entry.key_images.insert(request.ring_signature.key_image);
                for member in &request.ring_signature.ring_members {
                    if !entry.pool.anonymity_set.iter().any(|known| known.address == member.address) {
                        entry.pool.anonymity_set.push(member.clone());
                    }
                }
                let transaction = MixTransaction::pending(&request, delay_range, now);
                info!("Accepted transaction {} into pool {pool_id}", transaction.id);
                transaction
            }
        };
        entry.transactions.push(transaction.clone());
        //indexed under the pool lock, so eviction sees every transaction
        self.store.index_transaction(&transaction.id, pool_id);
        return Ok(transaction)
    }

    ///Why `request` must be turned away, checked in a fixed order.
    fn check_request(
        &self, entry: &PoolEntry, request: &MixRequest, signature_valid: bool, now: u64
    ) -> Option<RejectReason> {
        let pool = &entry.pool;
        if pool.state != PoolState::Open {
            return Some(pool.state.not_open_reason())
        }
        if pool.is_overdue(now) {
            return Some(RejectReason::PoolExpired)
        }
        if !pool.accepts_amount(request.amount) {
            return Some(RejectReason::AmountOutOfRange)
        }
        if request.ring_signature.ring_members.len() < self.config.min_ring_size {
            return Some(RejectReason::RingTooSmall)
        }
        if !signature_valid {
            return Some(RejectReason::InvalidSignature)
        }
        if entry.has_key_image(&request.ring_signature.key_image) {
            return Some(RejectReason::DuplicateKeyImage)
        }
        return None
    }

    ///Execute a pool, returning its executed transactions.
    pub fn execute_mix(&self, pool_id: &PoolId) -> Result<Vec<MixTransaction>, MixError> {
        return self.execute_mix_with_rng(&mut thread_rng(), pool_id)
    }

    ///Same as `execute_mix`, drawing payout delays from `rng`.
    ///
    ///Only an `Open` pool which has not reached its deadline can be executed, exactly once.
    ///Every pending transaction has the pool fee deducted, the rest split across its outputs,
    ///and each output delayed by a uniform draw from the transaction's delay range.
    pub fn execute_mix_with_rng<R: Rng + ?Sized>(
        &self, rng: &mut R, pool_id: &PoolId
    ) -> Result<Vec<MixTransaction>, MixError> {
        let entry = self.entry(pool_id)?;
        let mut entry = entry.lock();
        if entry.evicted {
            return Err(MixError::PoolNotFound(pool_id.clone()))
        }
        let now = self.clock.now_ms();

        if entry.pool.state != PoolState::Open {
            warn!("Refusing to execute pool {pool_id} in state {}", entry.pool.state);
            return Err(MixError::Rejected(entry.pool.state.not_open_reason()))
        }
        if entry.pool.is_overdue(now) {
            warn!("Refusing to execute pool {pool_id} past its deadline");
            return Err(MixError::Rejected(RejectReason::PoolExpired))
        }

        entry.pool.state = PoolState::Mixing;
        info!("Mixing pool {pool_id}");

        let PoolEntry{pool, transactions, ..} = &mut *entry;
        let mut executed: Vec<MixTransaction> = Vec::new();
        for transaction in transactions.iter_mut()
            .filter(|transaction| transaction.status == TransactionStatus::Pending) {
            transaction.status = TransactionStatus::Mixing;

            let fee = pool.fee_for(transaction.amount);
            let shares = split_amount(transaction.amount.saturating_sub(fee), transaction.output_addresses.len());
            transaction.transfers = transaction.output_addresses.iter()
                .zip(shares)
                .map(|(address, amount)| ScheduledTransfer{
                    address: address.clone(),
                    amount,
                    delay_ms: transaction.delay_range.sample(rng)
                })
                .collect();

            transaction.status = TransactionStatus::Completed;
            transaction.completed_at = Some(now);
            executed.push(transaction.clone());
        }

        pool.state = PoolState::Completed;
        pool.closed_at = Some(now);
        info!("Completed pool {pool_id} with {} transaction(s)", executed.len());
        return Ok(executed)
    }

    ///Open pools for `asset` which accept `min_amount`, oldest first.
    pub fn find_eligible_pools(&self, asset: &str, min_amount: u64) -> Vec<MixPool> {
        let now = self.clock.now_ms();
        let mut pools: Vec<MixPool> = self.store.entries().iter()
            .filter_map(|entry| {
                let entry = entry.lock();
                let pool = &entry.pool;
                let eligible = pool.state == PoolState::Open
                    && !pool.is_overdue(now)
                    && pool.asset == asset
                    && pool.accepts_amount(min_amount);
                return if eligible { Some(pool.clone()) } else { None }
            })
            .collect();
        pools.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        return pools
    }

    ///A snapshot of one pool.
    pub fn get_pool(&self, pool_id: &PoolId) -> Result<MixPool, MixError> {
        return self.store.peek(pool_id)
            .ok_or_else(|| MixError::PoolNotFound(pool_id.clone()))
    }

    pub fn get_pool_stats(&self, pool_id: &PoolId) -> Result<PoolStats, MixError> {
        let entry = self.entry(pool_id)?;
        let entry = entry.lock();
        let mut tally = Tally::default();
        tally.add(&entry.transactions);

        return Ok(PoolStats{
            pool_id: pool_id.clone(),
            state: entry.pool.state,
            transaction_count: entry.transactions.len(),
            pending_count: tally.pending,
            completed_count: tally.completed,
            failed_count: tally.failed,
            total_volume: tally.volume,
            total_mixed: tally.mixed,
            total_fees: tally.volume_completed.saturating_sub(tally.mixed),
            average_mix_time_ms: tally.average_mix_time_ms(),
            anonymity_set_size: entry.pool.anonymity_set.len(),
            success_rate: tally.success_rate()
        })
    }

    pub fn get_ring_vrm_stats(&self) -> RingVrmStats {
        let now = self.clock.now_ms();
        let mut tally = Tally::default();
        let mut active_pools = 0;
        let mut current_anonymity_set = 0;

        for entry in self.store.entries() {
            let entry = entry.lock();
            tally.add(&entry.transactions);
            if entry.pool.state == PoolState::Open && !entry.pool.is_overdue(now) {
                active_pools += 1;
                current_anonymity_set += entry.pool.anonymity_set.len();
            }
        }

        return RingVrmStats{
            current_anonymity_set,
            active_pools,
            mix_success_rate: tally.success_rate(),
            total_mixed: tally.mixed,
            total_volume: tally.volume,
            average_mix_time_ms: tally.average_mix_time_ms(),
            total_transactions: tally.count
        }
    }

    pub fn get_transaction(&self, transaction_id: &TransactionId) -> Option<MixTransaction> {
        let pool_id = self.store.pool_of(transaction_id)?;
        let entry = self.store.checkout(&pool_id)?;
        let entry = entry.lock();
        return entry.transactions.iter()
            .find(|transaction| transaction.id == *transaction_id)
            .cloned()
    }

    ///Expire every open pool whose deadline has passed, failing its pending transactions,
    ///then evict pools closed for longer than the retention period.
    ///
    ///Returns the number of pools expired.
    pub fn cleanup_expired_pools(&self) -> usize {
        let now = self.clock.now_ms();
        let mut expired = 0;

        for entry in self.store.entries() {
            let mut entry = entry.lock();
            if entry.pool.state != PoolState::Open || !entry.pool.is_overdue(now) {
                continue
            }
            entry.pool.state = PoolState::Expired;
            entry.pool.closed_at = Some(now);
            let mut failed = 0;
            for transaction in entry.transactions.iter_mut()
                .filter(|transaction| transaction.status == TransactionStatus::Pending) {
                transaction.fail(RejectReason::PoolExpired);
                failed += 1;
            }
            info!("Expired pool {}, {failed} pending transaction(s) failed", entry.pool.id);
            expired += 1;
        }

        if expired > 0 {
            debug!("Cleanup expired {expired} pool(s)");
        }
        self.evict_closed_pools();
        return expired
    }

    ///Forget every `Completed` or `Expired` pool which closed at least the retention period ago,
    ///together with its transactions.
    ///
    ///Returns the number of pools evicted.
    pub fn evict_closed_pools(&self) -> usize {
        let now = self.clock.now_ms();
        let retention = self.config.closed_pool_retention_ms();
        let due: Vec<PoolId> = self.store.entries().iter()
            .filter_map(|entry| {
                let entry = entry.lock();
                let closed_at = entry.pool.closed_at?;
                return if now >= closed_at.saturating_add(retention) { Some(entry.pool.id.clone()) } else { None }
            })
            .collect();

        let evicted = due.iter().filter(|pool_id| self.store.remove(pool_id)).count();
        if evicted > 0 {
            info!("Evicted {evicted} closed pool(s)");
        }
        return evicted
    }
}

///Split `amount` into `parts` shares which differ by at most one,
///the larger shares first.
fn split_amount(amount: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new()
    }
    let base = amount / parts as u64;
    let remainder = (amount % parts as u64) as usize;
    return (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

///Running totals over transactions.
#[derive(Default)]
struct Tally {
    count: usize,
    pending: usize,
    completed: usize,
    failed: usize,
    volume: u64,
    volume_completed: u64,
    mixed: u64,
    mix_time_total: u128,

} impl Tally {
    fn add(&mut self, transactions: &[MixTransaction]) {
        for transaction in transactions {
            self.count += 1;
            match transaction.status {
                TransactionStatus::Pending | TransactionStatus::Mixing => self.pending += 1,
                TransactionStatus::Completed => {
                    self.completed += 1;
                    self.volume_completed = self.volume_completed.saturating_add(transaction.amount);
                    self.mixed = self.mixed.saturating_add(transaction.net_amount());
                    self.mix_time_total += transaction.mix_time_ms().unwrap_or(0) as u128;
                },
                TransactionStatus::Failed => self.failed += 1
            }
            //accepted requests carry a key image, failed ones never moved funds
            if transaction.key_image.is_some() && transaction.status != TransactionStatus::Failed {
                self.volume = self.volume.saturating_add(transaction.amount);
            }
        }
    }

    fn success_rate(&self) -> f64 {
        let finished = self.completed + self.failed;
        if finished == 0 {
            return 0.0
        }
        return self.completed as f64 * 100.0 / finished as f64
    }

    fn average_mix_time_ms(&self) -> u64 {
        if self.completed == 0 {
            return 0
        }
        return (self.mix_time_total / self.completed as u128) as u64
    }
}
