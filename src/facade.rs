/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The surface exposed to front-ends and order-submission glue.
//!
//! Everything crossing this boundary is a plain serializable value;
//! keys, points and proofs use their canonical encodings.

use std::sync::Arc;

use log::*;
use parking_lot::RwLock;
use rand::{thread_rng, RngCore, CryptoRng};
use tokio::task::JoinHandle;

use crate::internal_common::*;
use crate::config::MixerConfig;
use crate::pool::*;
use crate::signature::{RingSignature, DecoyPool, calculate_anonymity_set};
use crate::vrf::{self, VrfKeyPair, VrfProof, VrfPublicKey, VrfSecretKey, VRF_OUTPUT_BYTES};

///Anonymity set size at which a score gets every anonymity point.
const SCORE_FULL_ANONYMITY_SET: usize = 50;

///Score from 0 to 100 for how well the current pools hide their participants.
///
///Up to 40 points for the anonymity set, 30 for the success rate and 30 for active pools.
pub fn privacy_score(stats: &RingVrmStats) -> u8 {
    let anonymity = (stats.current_anonymity_set.min(SCORE_FULL_ANONYMITY_SET) * 40 / SCORE_FULL_ANONYMITY_SET) as u8;
    let success = match stats.mix_success_rate {
        rate if rate >= 95.0 => 30,
        rate if rate >= 80.0 => 20,
        rate if rate >= 50.0 => 10,
        _ => 0
    };
    let pools = (stats.active_pools.min(3) * 10) as u8;
    return anonymity + success + pools
}

///Mix pools, decoys and the VRF behind one handle.
pub struct RingVrm {
    manager: Arc<MixPoolManager>,
    decoys: RwLock<DecoyPool>

} impl RingVrm {
    pub fn new(config: MixerConfig) -> Self {
        return Self::with_manager(Arc::new(MixPoolManager::new(config)))
    }

    pub fn with_manager(manager: Arc<MixPoolManager>) -> Self {
        return Self{manager, decoys: RwLock::new(DecoyPool::new())}
    }

    pub fn manager(&self) -> &Arc<MixPoolManager> {
        return &self.manager
    }

    pub fn create_pool(&self, asset: &str, min_amount: u64, max_amount: u64, mix_depth: u32) -> Result<PoolId, MixError> {
        return Ok(self.manager.create_mix_pool(asset, min_amount, max_amount, mix_depth)?.id)
    }

    pub fn list_pools(&self, asset: &str, min_amount: u64) -> Vec<PoolSummary> {
        return self.manager.find_eligible_pools(asset, min_amount).iter()
            .map(PoolSummary::from)
            .collect()
    }

    ///Submit a signed request to a pool.
    ///
    ///`ring_signature` must sign `MixRequest::signing_message` for the same arguments.
    ///A rejected request is `MixError::Rejected` with the reason.
    pub fn join_pool(
        &self,
        pool_id: &PoolId,
        input_address: &str,
        output_addresses: Vec<String>,
        amount: u64,
        ring_signature: RingSignature
    ) -> Result<TransactionId, MixError> {
        let mix_depth = self.manager.get_pool(pool_id)?.mix_depth;
        let request = MixRequest{
            pool_id: pool_id.clone(),
            input_address: input_address.to_string(),
            output_addresses,
            amount,
            mix_depth,
            delay_range: None,
            ring_signature
        };

        let transaction = self.manager.join_mix_pool(pool_id, request)?;
        return match (transaction.status, transaction.failure) {
            (TransactionStatus::Failed, Some(reason)) => Err(MixError::Rejected(reason)),
            _ => Ok(transaction.id)
        }
    }

    pub fn execute_pool(&self, pool_id: &PoolId) -> Result<(), MixError> {
        self.manager.execute_mix(pool_id)?;
        return Ok(())
    }

    pub fn pool_stats(&self, pool_id: &PoolId) -> Result<PoolStats, MixError> {
        return self.manager.get_pool_stats(pool_id)
    }

    pub fn global_stats(&self) -> RingVrmStats {
        return self.manager.get_ring_vrm_stats()
    }

    pub fn transaction(&self, transaction_id: &TransactionId) -> Option<MixTransaction> {
        return self.manager.get_transaction(transaction_id)
    }

    ///`privacy_score` of the current global stats.
    pub fn privacy_score(&self) -> u8 {
        return privacy_score(&self.global_stats())
    }

    pub fn vrf_keygen(&self) -> VrfKeyPair {
        return VrfKeyPair::generate()
    }

    pub fn vrf_prove(&self, sk: &VrfSecretKey, pk: &VrfPublicKey, input: &[u8]) -> Result<VrfProof, VrfError> {
        return vrf::prove(sk, pk, input)
    }

    pub fn vrf_verify(&self, pk: &VrfPublicKey, input: &[u8], proof: &VrfProof) -> Result<Option<[u8; VRF_OUTPUT_BYTES]>, VrfError> {
        return vrf::verify(pk, input, proof)
    }

    ///Make `member` available as a decoy for `asset`.
    pub fn register_decoy(&self, asset: &str, member: RingMember) -> bool {
        return self.decoys.write().register(asset, member)
    }

    ///Build a ring for `signer` sized for privacy `level`, see `calculate_anonymity_set`.
    ///
    ///Returns the ring and the signer's index in it.
    pub fn select_ring(&self, asset: &str, signer: &RingMember, level: u32) -> Result<(Ring, usize), SignatureError> {
        return self.select_ring_with_rng(&mut thread_rng(), asset, signer, level)
    }

    pub fn select_ring_with_rng<R: RngCore + CryptoRng>(
        &self, rng: &mut R, asset: &str, signer: &RingMember, level: u32
    ) -> Result<(Ring, usize), SignatureError> {
        let decoy_count = calculate_anonymity_set(level) as usize - 1;
        let decoys = self.decoys.read()
            .select_decoys_for_with_rng(rng, decoy_count, signer, asset)?;
        let (ring, index) = Ring::with_signer(rng, decoys, signer.clone());
        debug!("Selected a ring of {} for {asset}", ring.len());
        return Ok((ring, index))
    }

    ///Start the periodic pool sweep at the configured interval.
    ///
    ///Must be called from within a tokio runtime.
    pub fn spawn_cleanup_task(&self) -> JoinHandle<()> {
        let period = self.manager.config().cleanup_interval();
        return spawn_cleanup_task(Arc::clone(&self.manager), period)
    }

} impl Default for RingVrm {
    fn default() -> Self {
        return Self::new(MixerConfig::default())
    }
}
