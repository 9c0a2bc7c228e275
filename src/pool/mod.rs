/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//!Mix pools
//!
//!A pool collects ring-signed transfer requests for one asset and amount range,
//!then pays every accepted request out to its output addresses at randomized delays.
//!
//!Pool lifecycle:
//!```text
//!Open ──execute_mix──> Mixing ──> Completed
//!  │
//!  └──cleanup_expired_pools (created_at + ttl <= now)──> Expired
//!```
//!A pool's key images are checked and inserted under that pool's lock,
//!so the same signer can never join one pool twice.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::internal_common::*;
use crate::signature::RingSignature;

mod store;
mod manager;
mod cleanup;

pub use store::{PoolStore, PoolEntry};
pub use manager::MixPoolManager;
pub use cleanup::spawn_cleanup_task;

///Basis points in 100%.
pub const BASIS_POINTS: u64 = 10_000;

///Where a pool is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolState {
    ///Accepting requests.
    Open,
    ///Paying out, no longer accepting requests.
    Mixing,
    ///Paid out. Terminal.
    Completed,
    ///Closed by the sweep before it was executed. Terminal.
    Expired,

} impl PoolState {
    pub fn is_terminal(&self) -> bool {
        return matches!(self, Self::Completed | Self::Expired)
    }

    ///Why a request or execution against a pool in this state is turned away.
    pub(crate) fn not_open_reason(&self) -> RejectReason {
        return match self {
            Self::Expired => RejectReason::PoolExpired,
            _ => RejectReason::PoolNotOpen
        }
    }

} impl Display for PoolState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Mixing => "mixing",
            Self::Completed => "completed",
            Self::Expired => "expired"
        };
        write!(f, "{name}")
    }
}

///Inclusive range payouts are delayed by, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64

} impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        return Self{min_ms, max_ms}
    }

    pub fn is_valid(&self) -> bool {
        return self.min_ms <= self.max_ms
    }

    ///Draw a delay uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.min_ms >= self.max_ms {
            return self.min_ms
        }
        return rng.gen_range(self.min_ms..=self.max_ms)
    }

} impl Default for DelayRange {
    ///1 to 30 seconds.
    fn default() -> Self {
        return Self{min_ms: 1_000, max_ms: 30_000}
    }
}

///A mix pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixPool {
    pub id: PoolId,
    pub asset: String,
    pub min_amount: u64,
    pub max_amount: u64,
    pub mix_depth: u32,
    pub fee_basis_points: u16,
    ///Every ring member seen in an accepted request, unique by address.
    pub anonymity_set: Vec<RingMember>,
    pub state: PoolState,
    ///Unix milliseconds.
    pub created_at: u64,
    pub ttl_ms: u64,
    ///When the pool completed or expired, Unix milliseconds.
    pub closed_at: Option<u64>

} impl MixPool {
    ///Deadline after which the pool can no longer be joined or executed.
    pub fn expires_at(&self) -> u64 {
        return self.created_at.saturating_add(self.ttl_ms)
    }

    pub fn is_overdue(&self, now: u64) -> bool {
        return now >= self.expires_at()
    }

    pub fn accepts_amount(&self, amount: u64) -> bool {
        return amount >= self.min_amount && amount <= self.max_amount
    }

    ///The fee kept from `amount`, rounded down and never more than `amount`.
    pub fn fee_for(&self, amount: u64) -> u64 {
        let fee = (amount as u128 * self.fee_basis_points as u128) / BASIS_POINTS as u128;
        return fee.min(amount as u128) as u64
    }
}

///A participant's request to mix through a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixRequest {
    pub pool_id: PoolId,
    pub input_address: String,
    pub output_addresses: Vec<String>,
    pub amount: u64,
    pub mix_depth: u32,
    ///`None` uses the manager's configured default.
    pub delay_range: Option<DelayRange>,
    ///Signature over `signing_message`.
    pub ring_signature: RingSignature

} impl MixRequest {
    ///The message a participant signs to authorize a request.
    ///
    ///It binds the pool, the input, every output in order, and the amount,
    ///so a signature cannot be replayed against a different request.
    pub fn signing_message(
        pool_id: &PoolId, input_address: &str, output_addresses: &[String], amount: u64
    ) -> Vec<u8> {
        let mut message: Vec<u8> = Vec::new();
        encode_framed(domains::MIX_REQUEST, &mut message);
        encode_framed(pool_id.as_str(), &mut message);
        encode_framed(input_address, &mut message);
        encode_framed(&(output_addresses.len() as u64), &mut message);
        for output in output_addresses {
            encode_framed(output.as_str(), &mut message);
        }
        encode_framed(&amount, &mut message);
        return message
    }

    ///`signing_message` for this request.
    pub fn message(&self) -> Vec<u8> {
        return Self::signing_message(&self.pool_id, &self.input_address, &self.output_addresses, self.amount)
    }

} #[cfg(feature = "to_bytes")] impl ToBytes<'_> for MixRequest {}

///Where a mix transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Mixing,
    Completed,
    Failed,
}

///One payout of a mixed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTransfer {
    pub address: String,
    pub amount: u64,
    ///Delay after execution, in milliseconds.
    pub delay_ms: u64,
}

///The pool's record of a request, accepted or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixTransaction {
    pub id: TransactionId,
    pub pool_id: PoolId,
    pub status: TransactionStatus,
    ///Set exactly when `status` is `Failed`.
    pub failure: Option<RejectReason>,
    pub amount: u64,
    pub output_addresses: Vec<String>,
    pub delay_range: DelayRange,
    ///`None` for rejected requests.
    pub key_image: Option<KeyImage>,
    pub created_at: u64,
    pub completed_at: Option<u64>,
    ///Filled in when the pool executes.
    pub transfers: Vec<ScheduledTransfer>

} impl MixTransaction {
    pub(crate) fn pending(request: &MixRequest, delay_range: DelayRange, now: u64) -> Self {
        return Self{
            id: TransactionId::random(),
            pool_id: request.pool_id.clone(),
            status: TransactionStatus::Pending,
            failure: None,
            amount: request.amount,
            output_addresses: request.output_addresses.clone(),
            delay_range,
            key_image: Some(request.ring_signature.key_image),
            created_at: now,
            completed_at: None,
            transfers: Vec::new()
        }
    }

    pub(crate) fn rejected(request: &MixRequest, delay_range: DelayRange, reason: RejectReason, now: u64) -> Self {
        let mut transaction = Self::pending(request, delay_range, now);
        transaction.key_image = None;
        transaction.fail(reason);
        return transaction
    }

    pub(crate) fn fail(&mut self, reason: RejectReason) {
        self.status = TransactionStatus::Failed;
        self.failure = Some(reason);
    }

    ///Delays of every payout, in output order.
    pub fn scheduled_delays(&self) -> Vec<u64> {
        return self.transfers.iter().map(|transfer| transfer.delay_ms).collect()
    }

    ///Sum of every payout, the amount minus the pool fee once executed.
    pub fn net_amount(&self) -> u64 {
        return self.transfers.iter().map(|transfer| transfer.amount).sum()
    }

    ///Time from the request to its last payout.
    pub fn mix_time_ms(&self) -> Option<u64> {
        let completed_at = self.completed_at?;
        let last_delay = self.transfers.iter().map(|transfer| transfer.delay_ms).max().unwrap_or(0);
        return Some(completed_at.saturating_sub(self.created_at).saturating_add(last_delay))
    }
}

///Aggregates for one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub pool_id: PoolId,
    pub state: PoolState,
    pub transaction_count: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    ///Sum of accepted request amounts.
    pub total_volume: u64,
    ///Sum of payouts.
    pub total_mixed: u64,
    pub total_fees: u64,
    pub average_mix_time_ms: u64,
    pub anonymity_set_size: usize,
    ///Completed transactions out of finished ones, in percent.
    pub success_rate: f64,
}

///Aggregates across every pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingVrmStats {
    ///Ring members across every open pool.
    pub current_anonymity_set: usize,
    pub active_pools: usize,
    ///In percent.
    pub mix_success_rate: f64,
    pub total_mixed: u64,
    pub total_volume: u64,
    pub average_mix_time_ms: u64,
    pub total_transactions: usize,
}

///What a participant needs to know to pick a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub id: PoolId,
    pub asset: String,
    pub min_amount: u64,
    pub max_amount: u64,
    pub mix_depth: u32,
    pub fee_basis_points: u16,
    pub participants: usize,
    pub state: PoolState,
    pub expires_at: u64,

} impl From<&MixPool> for PoolSummary {
    fn from(pool: &MixPool) -> Self {
        return Self{
            id: pool.id.clone(),
            asset: pool.asset.clone(),
            min_amount: pool.min_amount,
            max_amount: pool.max_amount,
            mix_depth: pool.mix_depth,
            fee_basis_points: pool.fee_basis_points,
            participants: pool.anonymity_set.len(),
            state: pool.state,
            expires_at: pool.expires_at()
        }
    }
}

///Source of the current time, in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

///The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        return SystemTime::now().duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

///A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64

} impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        return Self{now: AtomicU64::new(now_ms)}
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

} impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        return self.now.load(Ordering::SeqCst)
    }
}
