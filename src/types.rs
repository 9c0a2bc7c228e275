/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use rand::{thread_rng, Rng, RngCore, CryptoRng};
use zeroize::Zeroize;

use crate::tobytes::*;
use crate::curve::*;
use crate::signature::{get_key_image, key_image_base};

///A participant in a ring: a public address and the key which may sign for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RingMember {
    pub address: String,
    pub public_key: RistrettoPoint

} impl RingMember {
    ///Create a ring member from an address and its public key.
    pub fn new(address: impl Into<String>, public_key: RistrettoPoint) -> Self {
        return Self{address: address.into(), public_key}
    }

} #[cfg(feature = "to_bytes")] impl ToBytes<'_> for RingMember {}

///A Ring is the ordered list of members in a ring signature.
///
///This is a wrapper type for `Vec<RingMember>`.
///The internal `Vec` can be accessed with `ring.0`.
///Order matters: a signature only verifies against the exact order it was signed with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ring(pub Vec<RingMember>);
impl Ring {
    ///Creates a new, empty ring.
    pub fn new() -> Self {
        return Self(Vec::new());
    }

    ///Appends a member to the ring.
    pub fn push(&mut self, value: RingMember) {
        self.0.push(value);
    }

    ///Inserts a member at position `index` within the ring, shifting all members after it to the right.
    pub fn insert(&mut self, index: usize, element: RingMember) {
        self.0.insert(index, element);
    }

    ///Number of members in the ring.
    pub fn len(&self) -> usize {
        return self.0.len()
    }

    ///True if the ring has no members.
    pub fn is_empty(&self) -> bool {
        return self.0.is_empty()
    }

    ///The members' public keys, in ring order.
    pub fn public_keys(&self) -> Vec<RistrettoPoint> {
        return self.0.iter().map(|member| member.public_key).collect()
    }

    ///Position of the member with this address, if any.
    pub fn position(&self, address: &str) -> Option<usize> {
        return self.0.iter().position(|member| member.address == address)
    }

    ///Build a ring from `decoys` with `signer` inserted at a random position.
    ///
    ///Returns the ring and the signer's index.
    pub fn with_signer<R: RngCore + CryptoRng>(rng: &mut R, decoys: Vec<RingMember>, signer: RingMember) -> (Self, usize) {
        let index = rng.gen_range(0..=decoys.len());
        let mut ring = Self(decoys);
        ring.insert(index, signer);
        return (ring, index)
    }

} impl From<Vec<RingMember>> for Ring {
    fn from(members: Vec<RingMember>) -> Self {
        return Self(members)
    }
}

///A key image, `x * H_G(P)`.
///
///Every signature made with the same private key carries the same key image,
///no matter the message or the ring, which is what makes double mixing detectable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyImage(pub RistrettoPoint);
impl KeyImage {
    ///Canonical compressed encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        return encode_point(&self.0)
    }

} impl Hash for KeyImage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

///The private key of a ring member.
///
///**This should never leave the signer.**
#[derive(Clone)]
pub struct SigningKey(Scalar);
impl SigningKey {
    ///Generate a new random key.
    pub fn generate() -> Self {
        return Self::generate_with(&mut thread_rng())
    }

    ///Generate a new random key from `rng`.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        return Self(random_scalar_with(rng))
    }

    ///Wrap an existing private scalar.
    pub fn from_scalar(scalar: Scalar) -> Self {
        return Self(scalar)
    }

    pub fn as_scalar(&self) -> &Scalar {
        return &self.0
    }

    ///Return the public key, `x * G`.
    pub fn to_public(&self) -> RistrettoPoint {
        return &self.0 * G
    }

    ///Return the ring member for this key under `address`.
    pub fn to_member(&self, address: impl Into<String>) -> RingMember {
        return RingMember::new(address, self.to_public())
    }

    ///Return the key image of this key.
    pub fn key_image(&self) -> KeyImage {
        return get_key_image(&self.0)
    }

    ///Return the key image this key produces for a given public key,
    ///which is only meaningful if `public_key` belongs to this key.
    pub(crate) fn key_image_for(&self, public_key: &RistrettoPoint) -> KeyImage {
        return KeyImage(self.0 * key_image_base(public_key))
    }

} impl Zeroize for SigningKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }

} impl Drop for SigningKey {
    fn drop(&mut self) {
        //clear the key from memory
        self.zeroize()
    }
}

///Identifies a mix pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub String);
impl PoolId {
    ///A fresh random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; 8];
        thread_rng().fill_bytes(&mut bytes);
        return Self(format!("pool-{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        return &self.0
    }

} impl Display for PoolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }

} impl From<&str> for PoolId {
    fn from(id: &str) -> Self {
        return Self(id.to_string())
    }
}

///Identifies a mix transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub String);
impl TransactionId {
    ///A fresh random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; 12];
        thread_rng().fill_bytes(&mut bytes);
        return Self(format!("tx-{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        return &self.0
    }

} impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
