//! Committed wallet state
//!
//! The whole of the wallet's persistent state is one small record. Operations
//! take it by reference and produce a replacement; nothing mutates it in
//! place. Its [`snapshot`](WalletState::snapshot) hash is what callers claim
//! when they submit an operation.

use serde::{Deserialize, Serialize};

use crate::crypto::{empty_root, hash_fields, Digest};

use super::config::ThresholdConfig;
use super::error::MultisigError;
use super::nonce::Nonce;
use super::tally::ApprovalTally;

/// Where the wallet is in its approval lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Uninitialized,
    /// Configured with no approvals in flight
    Idle,
    AwaitingApprovals { approvals: u64 },
    ReadyToExecute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Number of committed transitions; bumps on every successful operation
    pub version: u64,
    pub initialized: bool,
    /// Root of the authenticated signer set
    pub signer_root: Digest,
    pub signer_count: u64,
    pub threshold: u64,
    pub nonce: Nonce,
    pub tally: ApprovalTally,
}

impl Default for WalletState {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl WalletState {
    pub fn uninitialized() -> Self {
        Self {
            version: 0,
            initialized: false,
            signer_root: empty_root(),
            signer_count: 0,
            threshold: 0,
            nonce: Nonce::default(),
            tally: ApprovalTally::empty(),
        }
    }

    /// Hash over every committed field
    pub fn snapshot(&self) -> Digest {
        hash_fields(&[
            Digest::from_u64(self.version),
            Digest::from_u64(u64::from(self.initialized)),
            self.signer_root,
            Digest::from_u64(self.signer_count),
            Digest::from_u64(self.threshold),
            self.nonce.to_field(),
            Digest::from_u64(self.tally.count),
            Digest::from_u64(u64::from(self.tally.pending.is_some())),
            self.tally.pending.unwrap_or(Digest::ZERO),
            self.tally.approvers_root,
        ])
    }

    /// Optimistic concurrency check: the caller must have seen this exact state
    pub fn ensure_snapshot(&self, claimed: &Digest) -> Result<(), MultisigError> {
        let committed = self.snapshot();
        if *claimed != committed {
            return Err(MultisigError::StateConflict {
                claimed: *claimed,
                committed,
            });
        }
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<(), MultisigError> {
        if !self.initialized {
            return Err(MultisigError::NotInitialized);
        }
        Ok(())
    }

    /// Signer count and threshold as a validated configuration
    pub fn config(&self) -> Result<ThresholdConfig, MultisigError> {
        self.ensure_initialized()?;
        ThresholdConfig::new(self.signer_count, self.threshold)
    }

    pub fn phase(&self) -> Phase {
        if !self.initialized {
            Phase::Uninitialized
        } else if self.tally.count == 0 {
            Phase::Idle
        } else if self.tally.is_ready(self.threshold) {
            Phase::ReadyToExecute
        } else {
            Phase::AwaitingApprovals {
                approvals: self.tally.count,
            }
        }
    }

    /// Copy of this state with the version bumped, ready to be modified
    pub(crate) fn next(&self) -> WalletState {
        WalletState {
            version: self.version.wrapping_add(1),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized() {
        let state = WalletState::default();
        assert_eq!(state.phase(), Phase::Uninitialized);
        assert!(matches!(
            state.ensure_initialized(),
            Err(MultisigError::NotInitialized)
        ));
        assert!(state.config().is_err());
    }

    #[test]
    fn test_snapshot_covers_fields() {
        let state = WalletState::default();
        let base = state.snapshot();

        let mut changed = state;
        changed.nonce = Nonce::new(1);
        assert_ne!(changed.snapshot(), base);

        let mut changed = state;
        changed.tally.pending = Some(Digest::ZERO);
        assert_ne!(changed.snapshot(), base);

        assert_ne!(state.next().snapshot(), base);
    }

    #[test]
    fn test_ensure_snapshot() {
        let state = WalletState::default();
        assert!(state.ensure_snapshot(&state.snapshot()).is_ok());
        assert!(matches!(
            state.ensure_snapshot(&Digest::ZERO),
            Err(MultisigError::StateConflict { .. })
        ));
    }

    #[test]
    fn test_phases() {
        let mut state = WalletState::default();
        state.initialized = true;
        state.signer_count = 3;
        state.threshold = 2;
        assert_eq!(state.phase(), Phase::Idle);
        state.tally.count = 1;
        assert_eq!(state.phase(), Phase::AwaitingApprovals { approvals: 1 });
        state.tally.count = 2;
        assert_eq!(state.phase(), Phase::ReadyToExecute);
    }
}
