/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//!Linkable ring signatures
//!
//!Given a private key and a ring containing its public key (along with decoys),
//!create a ring signature which proves that:
//! 1. one of the ring's members authorized the message, without revealing which one
//! 2. the key image (accessible with `signature.key_image`) belongs to that member,
//!    so a second signature by the same key is recognizable

mod lsag;
mod decoys;
mod proof;
mod signature_utils;

pub use lsag::RingSignature;
pub use decoys::{
    DecoyPool,
    calculate_anonymity_set,
    BASE_ANONYMITY_SET,
    MAX_ANONYMITY_SET
};
pub use proof::{
    generate_ring_proof,
    parse_ring_proof,
    encode_ring_signature,
    decode_ring_signature
};

pub(crate) use signature_utils::{
    get_key_image,
    key_image_base
};
