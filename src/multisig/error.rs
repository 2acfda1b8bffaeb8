//! Rejection reasons for wallet operations
//!
//! Every variant is terminal for the call that produced it: the committed
//! state is left exactly as it was and the wallet stays usable.

use crate::crypto::{Digest, KeyError, MerkleError};
use crate::multisig::ledger::LedgerError;
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("State conflict: claimed snapshot {claimed} but committed is {committed}")]
    StateConflict { claimed: Digest, committed: Digest },
    #[error("Policy violation: {0}")]
    PolicyViolation(String),
    #[error("Authentication failed: {0}")]
    AuthFailure(String),
    #[error("Replay rejected: approval nonce {got}, expected {expected}")]
    ReplayRejected { expected: u64, got: u64 },
    #[error("Wallet is not initialized")]
    NotInitialized,
    #[error("Wallet is already initialized")]
    AlreadyInitialized,
    #[error("Action mismatch: pending {pending:?}, got {got}")]
    ActionMismatch { pending: Option<Digest>, got: Digest },
    #[error("Insufficient approvals: have {have}, need {need}")]
    InsufficientApprovals { have: u64, need: u64 },
    #[error("Signer {0} already approved this action")]
    DuplicateApproval(Digest),
    #[error("Ledger rejected action: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
}

impl From<MerkleError> for MultisigError {
    fn from(err: MerkleError) -> Self {
        MultisigError::AuthFailure(format!("malformed witness: {}", err))
    }
}

/// Coarse classification of a rejection, for callers deciding how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Re-fetch state and resubmit
    StateConflict,
    PolicyViolation,
    AuthFailure,
    ReplayRejected,
    Lifecycle,
    ActionMismatch,
    InsufficientApprovals,
    Ledger,
}

impl MultisigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultisigError::StateConflict { .. } => ErrorKind::StateConflict,
            MultisigError::PolicyViolation(_) => ErrorKind::PolicyViolation,
            MultisigError::AuthFailure(_)
            | MultisigError::DuplicateApproval(_)
            | MultisigError::Crypto(_) => ErrorKind::AuthFailure,
            MultisigError::ReplayRejected { .. } => ErrorKind::ReplayRejected,
            MultisigError::NotInitialized | MultisigError::AlreadyInitialized => {
                ErrorKind::Lifecycle
            }
            MultisigError::ActionMismatch { .. } => ErrorKind::ActionMismatch,
            MultisigError::InsufficientApprovals { .. } => ErrorKind::InsufficientApprovals,
            MultisigError::Ledger(_) => ErrorKind::Ledger,
        }
    }
}
