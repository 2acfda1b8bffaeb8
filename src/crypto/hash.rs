//! Hashing utilities for the multisig wallet
//!
//! Every committed value in the wallet (signer roots, action commitments,
//! state snapshots, signed messages) is a 32-byte SHA-256 [`Digest`].
//! Structured values are hashed as fixed-arity sequences of digests with
//! [`hash_fields`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Size in bytes of every digest and field element
pub const DIGEST_LEN: usize = 32;

/// A 32-byte hash value, also used as a field element
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// The all-zero digest. Doubles as the "absent" leaf value.
    pub const ZERO: Digest = Digest([0u8; DIGEST_LEN]);

    /// Encode an integer as a big-endian field element
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes[DIGEST_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Digest(bytes)
    }

    /// The "present" leaf value
    pub fn one() -> Self {
        Self::from_u64(1)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Read bit `index` counting from the most significant bit of byte 0
    pub fn bit(&self, index: usize) -> bool {
        (self.0[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// Set bit `index` counting from the most significant bit of byte 0
    pub fn set_bit(&mut self, index: usize, value: bool) {
        let mask = 1u8 << (7 - index % 8);
        if value {
            self.0[index / 8] |= mask;
        } else {
            self.0[index / 8] &= !mask;
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let array: [u8; DIGEST_LEN] = bytes.try_into().ok()?;
        Some(Digest(array))
    }

    /// Short form used in logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid digest: {}", s)))
    }
}

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest(hasher.finalize().into())
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    sha256(data).to_hex()
}

/// Hash an ordered sequence of field elements
///
/// The field count is absorbed first so sequences of different arity never
/// collide.
pub fn hash_fields(fields: &[Digest]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update((fields.len() as u32).to_be_bytes());
    for field in fields {
        hasher.update(field.0);
    }
    Digest(hasher.finalize().into())
}

/// Hash two child nodes of the sparse Merkle map
pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(left.0);
    hasher.update(right.0);
    Digest(hasher.finalize().into())
}
