//! Client-side view of a signer set
//!
//! The wallet only commits to a root. Whoever submits operations keeps the
//! full map, mirrors committed changes into it and cuts witnesses from it.

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{identity_hash, Digest, MerkleMapWitness, SparseMerkleMap};

use super::error::MultisigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSet {
    map: SparseMerkleMap,
}

impl SignerSet {
    pub fn new() -> Self {
        Self {
            map: SparseMerkleMap::new(),
        }
    }

    /// Build a set from public keys, rejecting duplicates
    pub fn from_public_keys(keys: &[PublicKey]) -> Result<Self, MultisigError> {
        let mut set = Self::new();
        for key in keys {
            set.insert(identity_hash(key))?;
        }
        Ok(set)
    }

    pub fn root(&self) -> Digest {
        self.map.root()
    }

    pub fn count(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn contains(&self, identity: &Digest) -> bool {
        self.map.get(identity) != Digest::ZERO
    }

    pub fn is_signer(&self, key: &PublicKey) -> bool {
        self.contains(&identity_hash(key))
    }

    pub fn identities(&self) -> impl Iterator<Item = &Digest> {
        self.map.keys()
    }

    /// Membership or absence witness for `identity`
    pub fn witness(&self, identity: &Digest) -> MerkleMapWitness {
        self.map.witness(identity)
    }

    pub fn witness_for(&self, key: &PublicKey) -> MerkleMapWitness {
        self.witness(&identity_hash(key))
    }

    pub fn insert(&mut self, identity: Digest) -> Result<(), MultisigError> {
        if self.contains(&identity) {
            return Err(MultisigError::PolicyViolation(format!(
                "duplicate signer {}",
                identity.short()
            )));
        }
        self.map.set(identity, Digest::one());
        Ok(())
    }

    pub fn remove(&mut self, identity: &Digest) -> Result<(), MultisigError> {
        if !self.contains(identity) {
            return Err(MultisigError::AuthFailure(format!(
                "{} is not a signer",
                identity.short()
            )));
        }
        self.map.set(*identity, Digest::ZERO);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.map = SparseMerkleMap::new();
    }
}
