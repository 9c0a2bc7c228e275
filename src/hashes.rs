/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Domain separated hashing to bytes, scalars and curve points.
//!
//! Everything that gets hashed implements [`Encode`], and is absorbed into a [`Transcript`]
//! as `tag || length || body`, so that two different argument lists can never
//! produce the same hasher input.

use ark_ec::hashing::{
    HashToCurve,
    curve_maps::wb::WBMap,
    map_to_curve_hasher::MapToCurveBasedHasher
};
use ark_ff::field_hashers::DefaultFieldHasher;
use blake2::{
    Blake2b,
    Digest,
    digest::consts::{U32, U64}
};
use sha2::Sha256;

use crate::bls::*;
use crate::curve::*;
use crate::errors::VrfError;
use crate::types::{Ring, RingMember};

type Blake2b256 = Blake2b<U32>;
type Blake2b512 = Blake2b<U64>;

type G1Hasher = MapToCurveBasedHasher<G1Projective, DefaultFieldHasher<Sha256, 128>, WBMap<G1Config>>;

///Hash-to-curve suite for G1, see RFC 9380 section 8.8.1.
pub const G1_HASH_TO_CURVE_DST: &[u8] = b"RINGVRM-V01-CS01-with-BLS12381G1_XMD:SHA-256_SSWU_RO_";

pub mod tags {
    //! Type tags prepended to every transcript item

    pub const DOMAIN: u8 = 0x00;
    pub const BYTES: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const INTEGER: u8 = 0x03;
    pub const SCALAR: u8 = 0x10;
    pub const POINT: u8 = 0x11;
    pub const RING_MEMBER: u8 = 0x12;
    pub const RING: u8 = 0x13;
    pub const BLS_SCALAR: u8 = 0x20;
    pub const BLS_POINT: u8 = 0x21;
}

///A value with a fixed, canonical byte representation for hashing.
pub trait Encode {
    ///Tag identifying what kind of value this is.
    const TAG: u8;

    ///Append the canonical body of this value to `out`.
    fn encode_to(&self, out: &mut Vec<u8>);
}

impl Encode for [u8] {
    const TAG: u8 = tags::BYTES;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl<const N: usize> Encode for [u8; N] {
    const TAG: u8 = tags::BYTES;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl Encode for str {
    const TAG: u8 = tags::STRING;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Encode for u32 {
    const TAG: u8 = tags::INTEGER;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(*self as u64).to_le_bytes());
    }
}

impl Encode for u64 {
    const TAG: u8 = tags::INTEGER;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Encode for Scalar {
    const TAG: u8 = tags::SCALAR;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Encode for RistrettoPoint {
    const TAG: u8 = tags::POINT;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&encode_point(self));
    }
}

impl Encode for RingMember {
    const TAG: u8 = tags::RING_MEMBER;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.address.len() as u64).to_le_bytes());
        out.extend_from_slice(self.address.as_bytes());
        out.extend_from_slice(&encode_point(&self.public_key));
    }
}

impl Encode for [RingMember] {
    const TAG: u8 = tags::RING;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for member in self {
            let mut body = Vec::new();
            member.encode_to(&mut body);
            out.extend_from_slice(&(body.len() as u64).to_le_bytes());
            out.extend_from_slice(&body);
        }
    }
}

impl Encode for Ring {
    const TAG: u8 = tags::RING;
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.0.as_slice().encode_to(out);
    }
}

impl Encode for Fr {
    const TAG: u8 = tags::BLS_SCALAR;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&encode_fr(self));
    }
}

impl Encode for G1Affine {
    const TAG: u8 = tags::BLS_POINT;
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&encode_g1(self));
    }
}

impl Encode for G1Projective {
    const TAG: u8 = tags::BLS_POINT;
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.into_affine().encode_to(out);
    }
}

///Append `item` to `out` framed exactly as a transcript absorbs it, `tag || length || body`.
///
///Useful for building messages that are later signed or hashed as a whole.
pub fn encode_framed<T: Encode + ?Sized>(item: &T, out: &mut Vec<u8>) {
    let mut body = Vec::new();
    item.encode_to(&mut body);
    out.push(T::TAG);
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&body);
}

///A domain separated hash over a typed list of inputs.
///
///```ignore
///let c = Transcript::new(domains::SIGNATURE_CHALLENGE)
///    .append(&message_hash)
///    .append(&ring)
///    .to_scalar();
///```
#[derive(Clone)]
pub struct Transcript {
    hasher: Blake2b512
} impl Transcript {
    ///Start a transcript in the given domain.
    pub fn new(domain: &[u8]) -> Self {
        let mut transcript = Self{hasher: Blake2b512::default()};
        transcript.absorb(tags::DOMAIN, domain);
        return transcript
    }

    fn absorb(&mut self, tag: u8, body: &[u8]) {
        self.hasher.update([tag]);
        self.hasher.update((body.len() as u64).to_le_bytes());
        self.hasher.update(body);
    }

    ///Absorb one more argument.
    pub fn append<T: Encode + ?Sized>(mut self, item: &T) -> Self {
        self.append_mut(item);
        return self
    }

    ///Absorb one more argument, in place.
    pub fn append_mut<T: Encode + ?Sized>(&mut self, item: &T) {
        let mut body = Vec::new();
        item.encode_to(&mut body);
        self.absorb(T::TAG, &body);
    }

    ///Finish the transcript, returning the raw 64 byte digest.
    pub fn finalize(self) -> [u8; 64] {
        let mut digest = [0u8; 64];
        digest.copy_from_slice(self.hasher.finalize().as_slice());
        return digest
    }

    ///Finish the transcript as a Ristretto scalar (wide reduction, always `< l`).
    pub fn to_scalar(self) -> Scalar {
        return Scalar::from_bytes_mod_order_wide(&self.finalize());
    }

    ///Finish the transcript as a BLS12-381 scalar (wide reduction, always `< r`).
    pub fn to_bls_scalar(self) -> Fr {
        return Fr::from_le_bytes_mod_order(&self.finalize());
    }

    ///Finish the transcript as a Ristretto point with unknown discrete log.
    pub fn to_point(self) -> RistrettoPoint {
        return RistrettoPoint::from_uniform_bytes(&self.finalize());
    }
}

///Hash bytes to bytes, domain separated.
pub fn domain_h_bytes(msg: &[u8], domain: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::default();
    hasher.update([tags::DOMAIN]);
    hasher.update((domain.len() as u64).to_le_bytes());
    hasher.update(domain);
    hasher.update(msg);
    return hasher.finalize().as_slice().try_into()
        .expect("Wrong digest length");
}

///Hash bytes to elliptic curve point, domain separated.
pub fn domain_h_point(msg: &[u8], domain: &[u8]) -> RistrettoPoint {
    return Transcript::new(domain).append(msg).to_point()
}

///Hash bytes to scalar, domain separated.
pub fn domain_h_scalar(msg: &[u8], domain: &[u8]) -> Scalar {
    return Transcript::new(domain).append(msg).to_scalar()
}

///Hash bytes to bytes.
pub fn h_bytes(msg: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::default();
    hasher.update(msg);
    return hasher.finalize().as_slice().try_into()
        .expect("Wrong digest length");
}

///Hash bytes to a point in the prime-order subgroup of BLS12-381 G1.
pub fn hash_to_g1(msg: &[u8]) -> Result<G1Affine, VrfError> {
    let hasher = G1Hasher::new(G1_HASH_TO_CURVE_DST)
        .map_err(|err| VrfError::HashToCurve(err.to_string()))?;
    return hasher.hash(msg)
        .map_err(|err| VrfError::HashToCurve(err.to_string()))
}

pub mod domains {
    //! Pre-defined hash domains

    pub const SIGNATURE_KEY_IMAGE: &[u8] =              "ringvrm_key_img".as_bytes();
    pub const SIGNATURE_MESSAGE: &[u8] =                "ringvrm_lsag_msg".as_bytes();
    pub const SIGNATURE_CHALLENGE: &[u8] =              "ringvrm_lsag_chal".as_bytes();

    pub const VRF_CHALLENGE: &[u8] =                    "ringvrm_vrf_chal".as_bytes();
    pub const VRF_OUTPUT: &[u8] =                       "ringvrm_vrf_out".as_bytes();

    pub const MIX_REQUEST: &[u8] =                      "ringvrm_mix_request".as_bytes();
}
