//! Merkle-multisig: a threshold multisig wallet in Rust
//!
//! The wallet commits to its signers through the root of a sparse Merkle
//! map instead of storing them. This crate provides:
//! - SHA-256 sparse Merkle map with membership and non-membership witnesses
//! - ECDSA approvals (secp256k1) bound to a replay nonce and an action
//! - Approval tally with a pending action commitment
//! - State machine guarded by an optimistic-concurrency snapshot
//! - Event log and pluggable ledger for executed balance changes
//! - JSON persistence with backups
//!
//! # Example
//!
//! ```rust
//! use merkle_multisig::crypto::KeyPair;
//! use merkle_multisig::multisig::{AccountLedger, Action, MultisigWallet, Policy};
//!
//! let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
//! let pubkeys: Vec<_> = keys.iter().map(|k| k.public_key).collect();
//!
//! // Create a 2-of-3 wallet holding 100
//! let mut wallet = MultisigWallet::new(Policy::default(), AccountLedger::with_balance(100), None);
//! wallet.setup(&pubkeys, 2).unwrap();
//!
//! // Two signers approve a withdrawal of 40
//! let action = Action::new(-40);
//! wallet.approve(&keys[0], action).unwrap();
//! wallet.approve(&keys[1], action).unwrap();
//!
//! wallet.execute(action).unwrap();
//! assert_eq!(wallet.host().ledger().balance(), 60);
//! ```

pub mod cli;
pub mod crypto;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use crypto::{Digest, KeyPair, MerkleMapWitness, SparseMerkleMap};
pub use multisig::{
    AccountLedger, Action, Approval, MultisigError, MultisigWallet, Operation, Policy,
    StateMachine, WalletHost, WalletState,
};
pub use storage::{Storage, StorageConfig};
