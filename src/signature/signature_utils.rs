/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::internal_common::*;

///hash to point, specific for key images: `H_G(P)`
pub(crate) fn key_image_base(public_key: &RistrettoPoint) -> RistrettoPoint {
    return domain_h_point(&encode_point(public_key), domains::SIGNATURE_KEY_IMAGE);
}

///return the key image bases for every member of a ring
pub(crate) fn key_image_bases(ring: &[RingMember]) -> Vec<RistrettoPoint> {
    return ring.iter()
        .map(|member| key_image_base(&member.public_key)).collect();
}

///Given a private key, return its key image
pub(crate) fn get_key_image(private_key: &Scalar) -> KeyImage {
    let public_key = private_key * G;
    return KeyImage(private_key * key_image_base(&public_key))
}

///`H_p(message)`
pub(crate) fn hash_message(msg: &[u8]) -> Scalar {
    return Transcript::new(domains::SIGNATURE_MESSAGE).append(msg).to_scalar()
}

///Check whether any public key appears twice in a ring
pub(crate) fn ring_has_duplicate_keys(ring: &[RingMember]) -> bool {
    let mut encoded: Vec<[u8; 32]> = ring.iter()
        .map(|member| encode_point(&member.public_key)).collect();
    encoded.sort_unstable();
    return encoded.windows(2)
        .any(|keys| keys[0] == keys[1])
}

///The fixed part of every challenge in a signature:
///`c_{i+1} = H_p(message_hash, ring, key_image, L_i, R_i)`
pub(crate) struct ChallengeChain {
    prefix: Transcript

} impl ChallengeChain {
    pub(crate) fn new(message_hash: &Scalar, ring: &[RingMember], key_image: &KeyImage) -> Self {
        let prefix = Transcript::new(domains::SIGNATURE_CHALLENGE)
            .append(message_hash)
            .append(ring)
            .append(&key_image.0);
        return Self{prefix}
    }

    ///Compute the next challenge from the commitments `L_i` and `R_i`.
    pub(crate) fn next(&self, left: &RistrettoPoint, right: &RistrettoPoint) -> Scalar {
        return self.prefix.clone()
            .append(left)
            .append(right)
            .to_scalar()
    }
}
