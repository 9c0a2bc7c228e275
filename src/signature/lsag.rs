/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use log::*;
use rand::{thread_rng, RngCore, CryptoRng};
use zeroize::Zeroize;

use crate::internal_common::*;
use super::signature_utils::*;

///A linkable ring signature.
///
///LSAG stands for "Linkable Spontaneous Anonymous Group (signature)".
///
///The ring is carried inside the signature, in signing order,
///so a signature can be verified with nothing but the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RingSignature {
    pub ring_size: u32,
    pub message_hash: Scalar,
    pub c_0: Scalar,
    pub s: Vec<Scalar>,
    pub key_image: KeyImage,
    pub ring_members: Vec<RingMember>,

} impl RingSignature {
    ///Sign `message` with `signing_key`, whose public key must sit at `signer_index` in `ring`.
    ///
    ///Returns `SignatureError` if the ring is malformed or the key does not match;
    ///these are caller bugs and are never silently repaired.
    pub fn generate(
        message: &[u8], signing_key: &SigningKey, ring: &Ring, signer_index: usize
    ) -> Result<Self, SignatureError> {
        return Self::generate_with_rng(&mut thread_rng(), message, signing_key, ring, signer_index)
    }

    ///Same as `generate`, drawing the nonce and the decoy responses from `rng`.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        rng: &mut R, message: &[u8], signing_key: &SigningKey, ring: &Ring, signer_index: usize
    ) -> Result<Self, SignatureError> {
        let n = ring.len();
        if n < 2 {
            return Err(SignatureError::RingTooSmall(n))
        }
        if signer_index >= n {
            return Err(SignatureError::SignerIndexOutOfRange{index: signer_index, size: n})
        }
        let j = signer_index;
        if ring.0[j].public_key != signing_key.to_public() {
            return Err(SignatureError::KeyMismatch)
        }
        if ring_has_duplicate_keys(&ring.0) {
            return Err(SignatureError::DuplicateRingMember)
        }

        let key_image_points = key_image_bases(&ring.0);
        let key_image = signing_key.key_image_for(&ring.0[j].public_key);
        let message_hash = hash_message(message);
        let chain = ChallengeChain::new(&message_hash, &ring.0, &key_image);

        let mut nonce = random_scalar_with(rng);
        //s[j] is overwritten once the chain is closed
        let mut s: Vec<Scalar> = (0..n).map(|_| random_scalar_with(rng)).collect();
        let mut c: Vec<Scalar> = vec!(Scalar::zero(); n);

        //compute starting values
        let mut left = &nonce * G;
        let mut right = nonce * key_image_points[j];

        let mut i = j;
        for _ in 0..n {
            i = (i + 1) % n;
            c[i] = chain.next(&left, &right);

            if i == j { break }

            //(s[i] * G) + (c[i] * ring[i])
            left = RistrettoPoint::multiscalar_mul(
                vec!(s[i], c[i]), vec!(G_POINT, ring.0[i].public_key)
            );
            //(s[i] * key_image_points[i]) + (c[i] * key_image)
            right = RistrettoPoint::multiscalar_mul(
                vec!(s[i], c[i]), vec!(key_image_points[i], key_image.0)
            );
        }
        s[j] = nonce - (c[j] * signing_key.as_scalar());

        nonce.zeroize();

        debug!("Created ring signature over {n} members");
        return Ok(Self{
            ring_size: n as u32,
            message_hash,
            c_0: c[0],
            s,
            key_image,
            ring_members: ring.0.clone()
        })
    }

    ///Check this signature against `message`.
    ///
    ///Returns `false` for any signature which does not verify, including structurally
    ///inconsistent ones; a rejected signature is an ordinary outcome, not an error.
    pub fn verify(&self, message: &[u8]) -> bool {
        let RingSignature{
            ring_size,
            message_hash,
            c_0,
            s,
            key_image,
            ring_members
        } = self;

        let n = ring_members.len();
        if n < 2 || *ring_size as usize != n || s.len() != n {
            debug!("Rejecting ring signature: inconsistent ring size");
            return false
        }
        if hash_message(message) != *message_hash {
            debug!("Rejecting ring signature: message hash mismatch");
            return false
        }
        if key_image.0.is_identity()
            || ring_members.iter().any(|member| member.public_key.is_identity())
            || ring_has_duplicate_keys(ring_members) {
            debug!("Rejecting ring signature: degenerate key image or ring");
            return false
        }

        let key_image_points = key_image_bases(ring_members);
        let chain = ChallengeChain::new(message_hash, ring_members, key_image);

        //travel around the ring
        let mut c_i = *c_0;
        for i in 0..n {
            //(s[i] * G) + (c[i] * ring[i])
            let left = G_MULTISCALAR_MUL.vartime_mixed_multiscalar_mul(
                vec!(s[i]), vec!(c_i), vec!(ring_members[i].public_key)
            );
            //(s[i] * key_image_points[i]) + (c[i] * key_image)
            let right = RistrettoPoint::vartime_multiscalar_mul(
                vec!(s[i], c_i), vec!(key_image_points[i], key_image.0)
            );
            c_i = chain.next(&left, &right);
        }
        //check if we end up back where we started
        return c_i == *c_0
    }

    ///The ring this signature was made over, in signing order.
    pub fn ring(&self) -> Ring {
        return Ring(self.ring_members.clone())
    }

} #[cfg(feature = "to_bytes")] impl ToBytes<'_> for RingSignature {}
