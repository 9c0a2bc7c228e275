/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::types::PoolId;

///Encoding/serialization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    ///Failure to serialize.
    #[error("Encoding error.")]
    EncodingError,
    ///Failure to deserialize.
    #[error("Decoding error.")]
    DecodingError,
}

///Ring signature errors.
///
///These are precondition failures raised by the signer or the decoy selector.
///A signature which simply does not verify is never an error, see `RingSignature::verify`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    ///Rings need at least two members to hide the signer.
    #[error("Ring has {0} member(s), at least 2 are required.")]
    RingTooSmall(usize),
    ///The signer's index does not point into the ring.
    #[error("Signer index {index} is out of range for a ring of {size}.")]
    SignerIndexOutOfRange { index: usize, size: usize },
    ///The public key at the signer's index is not `sk * G`.
    #[error("The private key does not match the signer's public key.")]
    KeyMismatch,
    ///The same public key appears more than once in the ring.
    #[error("Ring contains a duplicate public key.")]
    DuplicateRingMember,
    ///The decoy pool cannot supply the requested number of distinct members.
    #[error("Requested {requested} decoys but only {available} are available.")]
    NotEnoughDecoys { requested: usize, available: usize },
}

///VRF errors.
///
///A proof which does not verify is `Ok(None)`, these are reserved for malformed inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VrfError {
    ///A point is off the curve, outside the prime-order subgroup, or the identity.
    #[error("Invalid curve point.")]
    InvalidPoint,
    ///A secret scalar or nonce was zero.
    #[error("Scalar must be non-zero.")]
    ZeroScalar,
    ///The public key is not `sk * G1`.
    #[error("The secret key does not match the public key.")]
    KeyMismatch,
    ///The hash-to-curve suite failed.
    #[error("Hash to curve failed: {0}")]
    HashToCurve(String),
    ///Bytes could not be decoded.
    #[error("Malformed VRF encoding.")]
    Decoding,
}

///Expected, recoverable reasons for turning a mix away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RejectReason {
    #[error("Ring signature is invalid.")]
    InvalidSignature,
    #[error("Key image has already been used in this pool.")]
    DuplicateKeyImage,
    #[error("Amount is outside the pool's range.")]
    AmountOutOfRange,
    #[error("Pool is not open.")]
    PoolNotOpen,
    #[error("Pool has expired.")]
    PoolExpired,
    #[error("Proof verification failed.")]
    ProofVerificationFailed,
    #[error("Ring is smaller than the pool requires.")]
    RingTooSmall,
}

///Mix pool errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixError {
    #[error("Pool {0} does not exist.")]
    PoolNotFound(PoolId),
    #[error("Invalid pool parameters: {0}")]
    InvalidPool(String),
    #[error("Malformed mix request: {0}")]
    MalformedRequest(String),
    #[error("Mix rejected: {0}")]
    Rejected(RejectReason),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Vrf(#[from] VrfError),
}

///Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
