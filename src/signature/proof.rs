/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//!Canonical byte and hex encodings of ring signatures.
//!
//!Layout, all integers big-endian:
//!`ring_size (u32) || message_hash || c_0 || s[0..n] || key_image || n * (address_len (u16) || address || public_key)`

use crate::internal_common::*;
use super::lsag::RingSignature;

const PROOF_PREFIX: &str = "0x";

///Encode a signature in its canonical byte layout.
///
///Fails if the signature's lengths disagree or an address is longer than `u16::MAX` bytes,
///since such a signature could not be decoded again.
pub fn encode_ring_signature(signature: &RingSignature) -> Result<Vec<u8>, SerializationError> {
    let n = signature.ring_size as usize;
    if signature.s.len() != n || signature.ring_members.len() != n {
        return Err(SerializationError::EncodingError)
    }

    let mut bytes: Vec<u8> = Vec::with_capacity(4 + 32 * (3 + 2 * n));
    bytes.extend_from_slice(&signature.ring_size.to_be_bytes());
    bytes.extend_from_slice(signature.message_hash.as_bytes());
    bytes.extend_from_slice(signature.c_0.as_bytes());
    for s in &signature.s {
        bytes.extend_from_slice(s.as_bytes());
    }
    bytes.extend_from_slice(&signature.key_image.to_bytes());
    for member in &signature.ring_members {
        let address_len: u16 = match member.address.len().try_into() {
            Ok(len) => len,
            Err(_) => return Err(SerializationError::EncodingError)
        };
        bytes.extend_from_slice(&address_len.to_be_bytes());
        bytes.extend_from_slice(member.address.as_bytes());
        bytes.extend_from_slice(&encode_point(&member.public_key));
    }
    return Ok(bytes)
}

///Decode a signature from its canonical byte layout.
///
///Non-canonical scalars, invalid points and trailing bytes are all rejected.
pub fn decode_ring_signature(bytes: &[u8]) -> Result<RingSignature, SerializationError> {
    let mut reader = ByteReader::new(bytes);

    let ring_size = u32::from_be_bytes(reader.take_array()?);
    let n = ring_size as usize;
    //every member needs at least 32 + 32 + 2 bytes, refuse sizes the input cannot hold
    if n > bytes.len() / 66 {
        return Err(SerializationError::DecodingError)
    }

    let message_hash = reader.take_scalar()?;
    let c_0 = reader.take_scalar()?;
    let mut s: Vec<Scalar> = Vec::with_capacity(n);
    for _ in 0..n {
        s.push(reader.take_scalar()?);
    }
    let key_image = KeyImage(reader.take_point()?);

    let mut ring_members: Vec<RingMember> = Vec::with_capacity(n);
    for _ in 0..n {
        let address_len = u16::from_be_bytes(reader.take_array()?) as usize;
        let address = match String::from_utf8(reader.take(address_len)?.to_vec()) {
            Ok(address) => address,
            Err(_) => return Err(SerializationError::DecodingError)
        };
        let public_key = reader.take_point()?;
        ring_members.push(RingMember{address, public_key});
    }

    if !reader.is_empty() {
        return Err(SerializationError::DecodingError)
    }

    return Ok(RingSignature{ring_size, message_hash, c_0, s, key_image, ring_members})
}

///Serialize a signature into an opaque `0x`-prefixed hex proof blob.
pub fn generate_ring_proof(signature: &RingSignature) -> Result<String, SerializationError> {
    return Ok(format!("{PROOF_PREFIX}{}", hex::encode(encode_ring_signature(signature)?)))
}

///Inverse of `generate_ring_proof`.
pub fn parse_ring_proof(proof: &str) -> Result<RingSignature, SerializationError> {
    let encoded = match proof.strip_prefix(PROOF_PREFIX) {
        Some(encoded) => encoded,
        None => return Err(SerializationError::DecodingError)
    };
    return match hex::decode(encoded) {
        Ok(bytes) => decode_ring_signature(&bytes),
        Err(_) => Err(SerializationError::DecodingError)
    }
}

///Cursor over a byte slice which fails instead of panicking on short input.
struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize

} impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        return Self{bytes, position: 0}
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SerializationError> {
        let end = match self.position.checked_add(len) {
            Some(end) if end <= self.bytes.len() => end,
            _ => return Err(SerializationError::DecodingError)
        };
        let taken = &self.bytes[self.position..end];
        self.position = end;
        return Ok(taken)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], SerializationError> {
        return self.take(N)?.try_into()
            .map_err(|_| SerializationError::DecodingError)
    }

    fn take_scalar(&mut self) -> Result<Scalar, SerializationError> {
        return decode_scalar(self.take(32)?)
            .ok_or(SerializationError::DecodingError)
    }

    fn take_point(&mut self) -> Result<RistrettoPoint, SerializationError> {
        return decode_point(self.take(32)?)
            .ok_or(SerializationError::DecodingError)
    }

    fn is_empty(&self) -> bool {
        return self.position == self.bytes.len()
    }
}
