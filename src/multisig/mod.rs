//! Threshold multisig over an authenticated signer set
//!
//! The wallet never stores its signers. It commits to the root of a sparse
//! Merkle map of signer identities, and every operation that depends on
//! membership carries a witness against that root.
//!
//! # Example
//!
//! ```ignore
//! use merkle_multisig::multisig::{Action, AccountLedger, MultisigWallet, Policy};
//!
//! // Create a 2-of-3 wallet
//! let mut wallet = MultisigWallet::new(Policy::default(), AccountLedger::with_balance(100), None);
//! wallet.setup(&[pk1, pk2, pk3], 2)?;
//!
//! // Collect approvals, then execute
//! wallet.approve(&key1, Action::new(-40))?;
//! wallet.approve(&key2, Action::new(-40))?;
//! wallet.execute(Action::new(-40))?;
//! ```

pub mod action;
pub mod approval;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod ledger;
pub mod machine;
pub mod nonce;
pub mod signers;
pub mod state;
pub mod tally;
pub mod wallet;

pub use action::Action;
pub use approval::{approval_message, Approval};
pub use config::{validate_threshold, Policy, ThresholdConfig};
pub use error::{ErrorKind, MultisigError};
pub use events::{MultisigEvent, RecordedEvent};
pub use host::WalletHost;
pub use ledger::{AccountLedger, Ledger, LedgerError};
pub use machine::{Operation, StateMachine, Transition};
pub use nonce::Nonce;
pub use signers::SignerSet;
pub use state::{Phase, WalletState};
pub use tally::ApprovalTally;
pub use wallet::MultisigWallet;
