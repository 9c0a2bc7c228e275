/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Elliptic curve functions and constants for ring signatures.
//!
//! Ring signatures live in the Ristretto group, which has prime order:
//! every successfully decoded point is already in the correct subgroup.

#[cfg(feature = "to_bytes")]
use crate::errors::SerializationError;
#[cfg(feature = "to_bytes")]
use crate::tobytes::*;

pub use curve25519_dalek::{
    constants,
    scalar::Scalar,
    ristretto::{
        RistrettoPoint,
        CompressedRistretto,
        RistrettoBasepointTable,
        VartimeRistrettoPrecomputation
    },
    traits::{
        Identity,
        IsIdentity,
        MultiscalarMul,
        VartimeMultiscalarMul,
        VartimePrecomputedMultiscalarMul
    }
};
use rand::{thread_rng, RngCore, CryptoRng};

///The basepoint of the elliptic curve.
///`G` is a precomputed table of values, not an EC point, in order to speed up operations.
///To access the EC point itself, use `G_POINT`.
pub const G: &RistrettoBasepointTable = &constants::RISTRETTO_BASEPOINT_TABLE;
///The basepoint of the elliptic curve.
///`G_POINT` is the actual EC point, whereas `G` is a precomputed table of values for faster operations.
pub const G_POINT: RistrettoPoint = constants::RISTRETTO_BASEPOINT_POINT;

lazy_static! {
    pub(crate) static ref G_MULTISCALAR_MUL: VartimeRistrettoPrecomputation = VartimeRistrettoPrecomputation::new(vec!(G_POINT));
}

///Encode a point to its canonical 32 byte compressed form.
pub fn encode_point(point: &RistrettoPoint) -> [u8; 32] {
    return point.compress().to_bytes()
}

///Decode a canonical 32 byte compressed point.
///
///Returns `None` for wrong lengths or bytes which are not a valid Ristretto encoding.
pub fn decode_point(bytes: &[u8]) -> Option<RistrettoPoint> {
    if bytes.len() != 32 {
        return None
    }
    return CompressedRistretto::from_slice(bytes).decompress()
}

///Decode a canonical (fully reduced) 32 byte scalar.
pub fn decode_scalar(bytes: &[u8]) -> Option<Scalar> {
    let bytes: [u8; 32] = bytes.try_into().ok()?;
    return Scalar::from_canonical_bytes(bytes)
}

///return a random scalar drawn from `rng`
pub fn random_scalar_with<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut scalar_bytes = [0u8; 64];
    rng.fill_bytes(&mut scalar_bytes);
    return Scalar::from_bytes_mod_order_wide(&scalar_bytes);
}

///return a random scalar
pub fn random_scalar() -> Scalar {
    return random_scalar_with(&mut thread_rng());
}

///return a random point on the curve
pub fn random_point() -> RistrettoPoint {
    return &random_scalar() * G;
}

#[cfg(feature = "to_bytes")]
impl ToBytes<'_> for Scalar {
    fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        return Ok(self.reduce().to_bytes().to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        return match decode_scalar(bytes) {
            Some(scalar) => Ok(scalar),
            None => Err(SerializationError::DecodingError)
        }
    }
}

#[cfg(feature = "to_bytes")]
impl ToBytes<'_> for RistrettoPoint {
    fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        return Ok(encode_point(self).to_vec());
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        return match decode_point(bytes) {
            Some(point) => Ok(point),
            None => Err(SerializationError::DecodingError)
        };
    }
}
