//! Approval tally for the pending action
//!
//! The tally counts approvals collected in the current round and binds them
//! to one action commitment. Under [`Policy::DISTINCT_APPROVERS`] it also
//! commits to the set of signers who already approved, as a second sparse
//! Merkle map, so one signer cannot be counted twice.
//!
//! [`Policy::DISTINCT_APPROVERS`]: super::config::Policy::DISTINCT_APPROVERS

use serde::{Deserialize, Serialize};

use crate::crypto::{empty_root, Digest, MerkleMapWitness};

use super::error::MultisigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTally {
    /// Approvals collected for the pending action
    pub count: u64,
    /// Commitment to the action being approved, set by the first approval
    pub pending: Option<Digest>,
    /// Root of the map of signers who approved in this round
    pub approvers_root: Digest,
}

impl Default for ApprovalTally {
    fn default() -> Self {
        Self::empty()
    }
}

impl ApprovalTally {
    pub fn empty() -> Self {
        Self {
            count: 0,
            pending: None,
            approvers_root: empty_root(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.pending.is_none()
    }

    pub fn is_ready(&self, threshold: u64) -> bool {
        self.count >= threshold
    }

    /// Tally after one more approval for `commitment`
    ///
    /// `approver` carries the signer's identity and a witness against
    /// `approvers_root` when distinct approvers are enforced.
    pub fn record(
        &self,
        commitment: Digest,
        approver: Option<(&Digest, &MerkleMapWitness)>,
    ) -> Result<ApprovalTally, MultisigError> {
        if let Some(pending) = self.pending {
            if pending != commitment {
                return Err(MultisigError::ActionMismatch {
                    pending: Some(pending),
                    got: commitment,
                });
            }
        }

        let approvers_root = match approver {
            Some((identity, witness)) => self.mark_approver(identity, witness)?,
            None => self.approvers_root,
        };

        let count = self.count.checked_add(1).ok_or_else(|| {
            MultisigError::PolicyViolation("approval count overflow".to_string())
        })?;

        Ok(ApprovalTally {
            count,
            pending: Some(commitment),
            approvers_root,
        })
    }

    fn mark_approver(
        &self,
        identity: &Digest,
        witness: &MerkleMapWitness,
    ) -> Result<Digest, MultisigError> {
        let (absent_root, key) = witness.compute_root_and_key(&Digest::ZERO)?;
        if key != *identity {
            return Err(MultisigError::AuthFailure(
                "approver witness is for a different signer".to_string(),
            ));
        }
        if absent_root == self.approvers_root {
            return Ok(witness.root_after_update(identity, &Digest::one())?);
        }

        let (present_root, _) = witness.compute_root_and_key(&Digest::one())?;
        if present_root == self.approvers_root {
            return Err(MultisigError::DuplicateApproval(*identity));
        }
        Err(MultisigError::AuthFailure(
            "approver witness does not match the committed approvals".to_string(),
        ))
    }

    /// Consume the tally for execution of the action with `commitment`
    pub fn consume(&self, commitment: Digest, threshold: u64) -> Result<ApprovalTally, MultisigError> {
        if !self.is_ready(threshold) {
            return Err(MultisigError::InsufficientApprovals {
                have: self.count,
                need: threshold,
            });
        }
        if self.pending != Some(commitment) {
            return Err(MultisigError::ActionMismatch {
                pending: self.pending,
                got: commitment,
            });
        }
        Ok(ApprovalTally::empty())
    }
}
