/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::{HashMap, HashSet};

use log::*;
use rand::{thread_rng, Rng};
use rand::seq::SliceRandom;

use crate::internal_common::*;

///Recommended ring size at privacy level 0.
pub const BASE_ANONYMITY_SET: u32 = 8;
///Largest recommended ring size, used for level 4 and up.
pub const MAX_ANONYMITY_SET: u32 = 100;

///Minimum ring size recommended for a privacy `level`.
///
///Doubles per level starting at 8 (8, 16, 32, 64) and is capped at 100 from level 4 on.
pub fn calculate_anonymity_set(level: u32) -> u32 {
    if level >= 4 {
        return MAX_ANONYMITY_SET
    }
    return BASE_ANONYMITY_SET << level
}

///Known public ring members, per asset, that can be used as decoys.
#[derive(Debug, Clone, Default)]
pub struct DecoyPool {
    members: HashMap<String, Vec<RingMember>>

} impl DecoyPool {
    pub fn new() -> Self {
        return Self::default()
    }

    ///Register a member for `asset`.
    ///Returns `false` if a member with the same address or public key is already known.
    pub fn register(&mut self, asset: &str, member: RingMember) -> bool {
        let members = self.members.entry(asset.to_string()).or_default();
        if members.iter().any(|known| known.address == member.address || known.public_key == member.public_key) {
            return false
        }
        members.push(member);
        return true
    }

    ///Register many members at once, returning how many were new.
    pub fn extend<I: IntoIterator<Item = RingMember>>(&mut self, asset: &str, members: I) -> usize {
        return members.into_iter()
            .filter(|member| self.register(asset, member.clone()))
            .count()
    }

    ///Number of members known for `asset`.
    pub fn available(&self, asset: &str) -> usize {
        return self.members.get(asset).map_or(0, |members| members.len())
    }

    ///Pick `count` decoys for `asset`, none of which has `exclude_address`.
    ///
    ///Every returned address and public key is distinct: a repeated decoy would silently shrink the anonymity set.
    pub fn select_decoys(
        &self, count: usize, exclude_address: &str, asset: &str
    ) -> Result<Vec<RingMember>, SignatureError> {
        return self.select_decoys_with_rng(&mut thread_rng(), count, exclude_address, asset)
    }

    ///Same as `select_decoys`, sampling with `rng`.
    pub fn select_decoys_with_rng<R: Rng + ?Sized>(
        &self, rng: &mut R, count: usize, exclude_address: &str, asset: &str
    ) -> Result<Vec<RingMember>, SignatureError> {
        return self.sample(rng, count, exclude_address, None, asset)
    }

    ///Pick `count` decoys to sign alongside `signer`,
    ///sharing neither its address nor its public key.
    pub fn select_decoys_for_with_rng<R: Rng + ?Sized>(
        &self, rng: &mut R, count: usize, signer: &RingMember, asset: &str
    ) -> Result<Vec<RingMember>, SignatureError> {
        return self.sample(rng, count, &signer.address, Some(&signer.public_key), asset)
    }

    fn sample<R: Rng + ?Sized>(
        &self, rng: &mut R, count: usize, exclude_address: &str, exclude_key: Option<&RistrettoPoint>, asset: &str
    ) -> Result<Vec<RingMember>, SignatureError> {
        let mut seen_addresses: HashSet<&str> = HashSet::new();
        let mut seen_keys: HashSet<[u8; 32]> = HashSet::new();
        let candidates: Vec<&RingMember> = self.members.get(asset)
            .map(|members| members.iter()
                .filter(|member| member.address != exclude_address)
                .filter(|member| exclude_key != Some(&member.public_key))
                .filter(|member| seen_addresses.insert(member.address.as_str()))
                .filter(|member| seen_keys.insert(member.public_key.compress().to_bytes()))
                .collect())
            .unwrap_or_default();

        if candidates.len() < count {
            warn!("Decoy selection for {asset} failed: {count} requested, {} available", candidates.len());
            return Err(SignatureError::NotEnoughDecoys{requested: count, available: candidates.len()})
        }
        return Ok(candidates.choose_multiple(rng, count)
            .map(|member| (*member).clone())
            .collect())
    }
}
