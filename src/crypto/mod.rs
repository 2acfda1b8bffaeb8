//! Cryptographic primitives for the wallet
//!
//! This module provides:
//! - SHA-256 digests and fixed-arity field hashing
//! - ECDSA signer keys (secp256k1)
//! - The sparse Merkle map backing the signer set

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{hash_fields, hash_pair, sha256, sha256_hex, Digest, DIGEST_LEN};
pub use keys::{
    identity_hash, public_key_from_hex, public_key_to_address, sign_message, verify_signature,
    KeyError, KeyPair,
};
pub use merkle::{
    empty_root, membership_proof_verify, MerkleError, MerkleMapWitness, SparseMerkleMap, MAP_DEPTH,
};
