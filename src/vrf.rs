/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Verifiable random function over BLS12-381 G1.
//!
//! The prover shows that `preout = sk * H_G(input)` shares its discrete log with `pk = sk * G1`,
//! using a Fiat-Shamir challenge over every public value:
//!
//! `c = H_p(G1, H, pk, preout, r1 * G1, r1 * H)`, `s1 = r1 - c * sk`
//!
//! and the random output is a hash of `preout`.

use std::fmt::{Debug, Formatter};

use log::*;
use rand::{thread_rng, RngCore, CryptoRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::de::Error as _;
use zeroize::Zeroize;

use crate::bls::*;
use crate::errors::VrfError;
use crate::hashes::*;

///Length of a VRF output.
pub const VRF_OUTPUT_BYTES: usize = 32;
///Length of an encoded proof, `c || s1 || preout`.
pub const VRF_PROOF_BYTES: usize = FR_BYTES * 2 + G1_BYTES;

///A VRF secret key, a scalar in `[1, r)`.
///
///**This should never leave the prover.** It is overwritten when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct VrfSecretKey(Fr);
impl VrfSecretKey {
    ///Wrap a scalar, rejecting zero.
    pub fn from_scalar(scalar: Fr) -> Result<Self, VrfError> {
        if scalar.is_zero() {
            return Err(VrfError::ZeroScalar)
        }
        return Ok(Self(scalar))
    }

    pub fn as_scalar(&self) -> &Fr {
        return &self.0
    }

    ///Return the public key, `sk * G1`.
    pub fn to_public(&self) -> VrfPublicKey {
        return VrfPublicKey((g1_generator() * self.0).into_affine())
    }

    pub fn to_bytes(&self) -> [u8; FR_BYTES] {
        return encode_fr(&self.0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VrfError> {
        return Self::from_scalar(decode_fr(bytes)?)
    }

} impl Debug for VrfSecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "VrfSecretKey(..)")
    }

} impl Zeroize for VrfSecretKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }

} impl Drop for VrfSecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

///A VRF public key, a point in G1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VrfPublicKey(pub G1Affine);
impl VrfPublicKey {
    pub fn to_bytes(&self) -> [u8; G1_BYTES] {
        return encode_g1(&self.0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VrfError> {
        return Ok(Self(decode_g1(bytes)?))
    }
}

///A VRF key pair.
#[derive(Debug, Clone)]
pub struct VrfKeyPair {
    pub secret: VrfSecretKey,
    pub public: VrfPublicKey

} impl VrfKeyPair {
    ///Generate a key pair with `sk` uniform in `[1, r)`.
    pub fn generate() -> Self {
        return Self::generate_with_rng(&mut thread_rng())
    }

    ///Same as `generate`, drawing from `rng`.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = VrfSecretKey(random_fr(rng));
        let public = secret.to_public();
        return Self{secret, public}
    }
}

///A VRF proof.
///
///Self-contained: verification needs only the public key, the input, and this proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VrfProof {
    pub c: Fr,
    pub s1: Fr,
    pub preout: G1Affine

} impl VrfProof {
    ///Encode as `c || s1 || preout`.
    pub fn to_bytes(&self) -> [u8; VRF_PROOF_BYTES] {
        let mut bytes = [0u8; VRF_PROOF_BYTES];
        bytes[..FR_BYTES].copy_from_slice(&encode_fr(&self.c));
        bytes[FR_BYTES..2 * FR_BYTES].copy_from_slice(&encode_fr(&self.s1));
        bytes[2 * FR_BYTES..].copy_from_slice(&encode_g1(&self.preout));
        return bytes
    }

    ///Decode `c || s1 || preout`, validating the scalars and the point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VrfError> {
        if bytes.len() != VRF_PROOF_BYTES {
            return Err(VrfError::Decoding)
        }
        return Ok(Self{
            c: decode_fr(&bytes[..FR_BYTES])?,
            s1: decode_fr(&bytes[FR_BYTES..2 * FR_BYTES])?,
            preout: decode_g1(&bytes[2 * FR_BYTES..])?
        })
    }

    ///The random output this proof attests to, `Hash(preout)`.
    ///
    ///Only meaningful once the proof has been verified.
    pub fn output(&self) -> [u8; VRF_OUTPUT_BYTES] {
        return domain_h_bytes(&encode_g1(&self.preout), domains::VRF_OUTPUT)
    }
}

///Fiat-Shamir challenge binding every public value of the proof.
fn challenge(h: &G1Affine, pk: &G1Affine, preout: &G1Affine, u: &G1Projective, v: &G1Projective) -> Fr {
    return Transcript::new(domains::VRF_CHALLENGE)
        .append(&g1_generator())
        .append(h)
        .append(pk)
        .append(preout)
        .append(u)
        .append(v)
        .to_bls_scalar()
}

///Prove the VRF evaluation of `input` under `sk`, with a nonce from the thread CSPRNG.
pub fn prove(sk: &VrfSecretKey, pk: &VrfPublicKey, input: &[u8]) -> Result<VrfProof, VrfError> {
    return prove_with_rng(&mut thread_rng(), sk, pk, input)
}

///Same as `prove`, drawing the nonce from `rng`.
pub fn prove_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R, sk: &VrfSecretKey, pk: &VrfPublicKey, input: &[u8]
) -> Result<VrfProof, VrfError> {
    let r1 = random_fr(rng);
    return prove_with_nonce(sk, pk, input, &r1)
}

///Same as `prove`, with a caller supplied nonce `r1`.
///
///Identical arguments give byte-identical proofs. Reusing `r1` for two different inputs
///reveals `sk`, so callers should derive it, e.g. as `H_p(sk, input)`.
pub fn prove_with_nonce(
    sk: &VrfSecretKey, pk: &VrfPublicKey, input: &[u8], r1: &Fr
) -> Result<VrfProof, VrfError> {
    if r1.is_zero() {
        return Err(VrfError::ZeroScalar)
    }
    if sk.to_public() != *pk {
        return Err(VrfError::KeyMismatch)
    }

    let h = hash_to_g1(input)?;
    let preout = (h * sk.0).into_affine();
    let u = g1_generator() * *r1;
    let v = h * *r1;

    let c = challenge(&h, &pk.0, &preout, &u, &v);
    let s1 = *r1 - (c * sk.0);

    return Ok(VrfProof{c, s1, preout})
}

///Verify `proof` for `input` under `pk`.
///
///Returns the 32 byte output if the proof is valid and `None` if it is not.
///Points which are not valid G1 subgroup elements are malformed input,
///and give `VrfError::InvalidPoint` instead.
pub fn verify(pk: &VrfPublicKey, input: &[u8], proof: &VrfProof) -> Result<Option<[u8; VRF_OUTPUT_BYTES]>, VrfError> {
    if !is_valid_g1(&pk.0) || !is_valid_g1(&proof.preout) {
        return Err(VrfError::InvalidPoint)
    }

    let h = hash_to_g1(input)?;
    //s1 * G1 + c * pk
    let u = g1_generator() * proof.s1 + pk.0 * proof.c;
    //s1 * H + c * preout
    let v = h * proof.s1 + proof.preout * proof.c;

    let c = challenge(&h, &pk.0, &proof.preout, &u, &v);
    if c != proof.c {
        debug!("VRF proof rejected: challenge mismatch");
        return Ok(None)
    }
    return Ok(Some(proof.output()))
}

macro_rules! hex_serde {
    ($type:ty) => {
        impl Serialize for $type {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                return serializer.serialize_str(&hex::encode(self.to_bytes()))
            }
        }

        impl<'de> Deserialize<'de> for $type {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let encoded = String::deserialize(deserializer)?;
                let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
                return Self::from_bytes(&bytes).map_err(D::Error::custom)
            }
        }
    };
}

hex_serde!(VrfSecretKey);
hex_serde!(VrfPublicKey);
hex_serde!(VrfProof);
