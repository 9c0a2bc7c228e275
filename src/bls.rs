/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! BLS12-381 G1 functions for the VRF.
//!
//! Points are exchanged in their 48 byte compressed form and scalars
//! as 32 byte little-endian canonical encodings, following `ark-serialize`.

pub use ark_bls12_381::{
    Fr,
    G1Affine,
    G1Projective,
    g1::Config as G1Config
};
pub use ark_ec::{AffineRepr, CurveGroup};
pub use ark_ff::{PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::{RngCore, CryptoRng};

use crate::errors::VrfError;

///Size of a compressed G1 point.
pub const G1_BYTES: usize = 48;
///Size of an encoded scalar.
pub const FR_BYTES: usize = 32;

///The G1 generator.
pub fn g1_generator() -> G1Affine {
    return G1Affine::generator()
}

///Return a uniformly random non-zero scalar.
pub fn random_fr<R: RngCore + CryptoRng>(rng: &mut R) -> Fr {
    loop {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        let scalar = Fr::from_le_bytes_mod_order(&bytes);
        if !scalar.is_zero() {
            return scalar
        }
    }
}

///Check that a point is usable as a public value:
///on the curve, in the prime-order subgroup, and not the identity.
pub fn is_valid_g1(point: &G1Affine) -> bool {
    return !point.infinity
        && point.is_on_curve()
        && point.is_in_correct_subgroup_assuming_on_curve()
}

///Encode a G1 point to its compressed form.
pub fn encode_g1(point: &G1Affine) -> [u8; G1_BYTES] {
    let mut bytes = [0u8; G1_BYTES];
    point.serialize_compressed(&mut bytes[..])
        .expect("Compressed G1 points are 48 bytes");
    return bytes
}

///Decode a compressed G1 point.
///
///Rejects wrong lengths, points off the curve or outside the subgroup, and the identity.
pub fn decode_g1(bytes: &[u8]) -> Result<G1Affine, VrfError> {
    if bytes.len() != G1_BYTES {
        return Err(VrfError::Decoding)
    }
    let point = G1Affine::deserialize_compressed(bytes)
        .map_err(|_| VrfError::InvalidPoint)?;
    if !is_valid_g1(&point) {
        return Err(VrfError::InvalidPoint)
    }
    return Ok(point)
}

///Encode a scalar.
pub fn encode_fr(scalar: &Fr) -> [u8; FR_BYTES] {
    let mut bytes = [0u8; FR_BYTES];
    scalar.serialize_compressed(&mut bytes[..])
        .expect("Scalars are 32 bytes");
    return bytes
}

///Decode a canonical scalar, values `>= r` are rejected.
pub fn decode_fr(bytes: &[u8]) -> Result<Fr, VrfError> {
    if bytes.len() != FR_BYTES {
        return Err(VrfError::Decoding)
    }
    return Fr::deserialize_compressed(bytes)
        .map_err(|_| VrfError::Decoding)
}
