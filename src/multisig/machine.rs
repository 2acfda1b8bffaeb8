//! The multisig state machine
//!
//! [`StateMachine::apply`] is the only way to move a [`WalletState`] forward.
//! It checks the caller's claimed snapshot against the committed state, runs
//! the operation's preconditions and returns a [`Transition`] holding the
//! replacement state. It never mutates its input, so a rejected operation
//! leaves the committed state untouched by construction.
//!
//! ```text
//! Uninitialized --setup--> Idle --sign--> AwaitingApprovals --sign--> ReadyToExecute
//!                           ^                                              |
//!                           +------------------execute---------------------+
//! ```

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    identity_hash, membership_proof_verify, Digest, MerkleMapWitness, SparseMerkleMap,
};

use super::action::Action;
use super::approval::Approval;
use super::config::{Policy, ThresholdConfig};
use super::error::MultisigError;
use super::events::MultisigEvent;
use super::state::WalletState;
use super::tally::ApprovalTally;

/// An operation submitted against a claimed state snapshot
#[derive(Debug, Clone)]
pub enum Operation {
    /// `members`, when given, must be exactly the identities under
    /// `signer_root`; each one is announced with a `SignerAdded` event
    Setup {
        signer_root: Digest,
        signer_count: u64,
        threshold: u64,
        members: Vec<Digest>,
    },
    /// `witness` must show the signer absent under the committed root
    AddSigner {
        signer: PublicKey,
        witness: MerkleMapWitness,
    },
    /// `witness` must show the signer present under the committed root
    RemoveSigner {
        signer: PublicKey,
        witness: MerkleMapWitness,
    },
    SetThreshold {
        threshold: u64,
    },
    Sign {
        approval: Approval,
        /// Signer's membership witness against the signer root
        membership: MerkleMapWitness,
        /// Absence witness against the approvers root, required under
        /// [`Policy::DISTINCT_APPROVERS`]
        approver_witness: Option<MerkleMapWitness>,
    },
    Execute {
        action: Action,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Setup { .. } => "setup",
            Operation::AddSigner { .. } => "add-signer",
            Operation::RemoveSigner { .. } => "remove-signer",
            Operation::SetThreshold { .. } => "set-threshold",
            Operation::Sign { .. } => "sign",
            Operation::Execute { .. } => "execute",
        }
    }
}

/// Outcome of an accepted operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: WalletState,
    pub events: Vec<MultisigEvent>,
    /// Action the host must apply before committing `state`
    pub effect: Option<Action>,
}

impl Transition {
    fn new(state: WalletState, events: Vec<MultisigEvent>) -> Self {
        Self {
            state,
            events,
            effect: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    policy: Policy,
}

impl StateMachine {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Validate `op` against `current` and compute the next state
    pub fn apply(
        &self,
        current: &WalletState,
        claimed: &Digest,
        op: &Operation,
    ) -> Result<Transition, MultisigError> {
        current.ensure_snapshot(claimed)?;

        match op {
            Operation::Setup {
                signer_root,
                signer_count,
                threshold,
                members,
            } => self.setup(current, *signer_root, *signer_count, *threshold, members),
            Operation::AddSigner { signer, witness } => self.add_signer(current, signer, witness),
            Operation::RemoveSigner { signer, witness } => {
                self.remove_signer(current, signer, witness)
            }
            Operation::SetThreshold { threshold } => self.set_threshold(current, *threshold),
            Operation::Sign {
                approval,
                membership,
                approver_witness,
            } => self.sign(current, approval, membership, approver_witness.as_ref()),
            Operation::Execute { action } => self.execute(current, action),
        }
    }

    fn setup(
        &self,
        current: &WalletState,
        signer_root: Digest,
        signer_count: u64,
        threshold: u64,
        members: &[Digest],
    ) -> Result<Transition, MultisigError> {
        if current.initialized {
            return Err(MultisigError::AlreadyInitialized);
        }
        let config = ThresholdConfig::new(signer_count, threshold)?;

        if !members.is_empty() {
            let mut map = SparseMerkleMap::new();
            for identity in members {
                map.set(*identity, Digest::one());
            }
            if map.len() as u64 != signer_count || map.root() != signer_root {
                return Err(MultisigError::AuthFailure(
                    "initial signers do not match the signer root".to_string(),
                ));
            }
        }

        let mut state = current.next();
        state.initialized = true;
        state.signer_root = signer_root;
        state.signer_count = config.signer_count();
        state.threshold = config.threshold();
        state.nonce = Default::default();
        state.tally = ApprovalTally::empty();

        let mut events = vec![MultisigEvent::WalletCreated {
            signer_root,
            signer_count,
            threshold,
        }];
        events.extend(
            members
                .iter()
                .map(|identity| MultisigEvent::SignerAdded { identity: *identity }),
        );
        Ok(Transition::new(state, events))
    }

    fn add_signer(
        &self,
        current: &WalletState,
        signer: &PublicKey,
        witness: &MerkleMapWitness,
    ) -> Result<Transition, MultisigError> {
        let config = current.config()?;
        let identity = identity_hash(signer);

        let signer_root =
            transition_root(&current.signer_root, &identity, witness, Digest::ZERO, Digest::one())?;
        let config = config.after_addition()?;

        let mut state = current.next();
        state.signer_root = signer_root;
        state.signer_count = config.signer_count();

        let mut events = vec![MultisigEvent::SignerAdded { identity }];
        self.reset_on_reconfigure(&mut state, &mut events);
        Ok(Transition::new(state, events))
    }

    fn remove_signer(
        &self,
        current: &WalletState,
        signer: &PublicKey,
        witness: &MerkleMapWitness,
    ) -> Result<Transition, MultisigError> {
        let config = current.config()?;
        let identity = identity_hash(signer);

        let signer_root =
            transition_root(&current.signer_root, &identity, witness, Digest::one(), Digest::ZERO)?;
        // Threshold is checked against the reduced count
        let config = config.after_removal()?;

        let mut state = current.next();
        state.signer_root = signer_root;
        state.signer_count = config.signer_count();

        let mut events = vec![MultisigEvent::SignerRemoved { identity }];
        self.reset_on_reconfigure(&mut state, &mut events);
        Ok(Transition::new(state, events))
    }

    fn set_threshold(
        &self,
        current: &WalletState,
        threshold: u64,
    ) -> Result<Transition, MultisigError> {
        let config = current.config()?.with_threshold(threshold)?;

        let mut state = current.next();
        state.threshold = config.threshold();

        let mut events = vec![MultisigEvent::ThresholdChanged { threshold }];
        self.reset_on_reconfigure(&mut state, &mut events);
        Ok(Transition::new(state, events))
    }

    fn sign(
        &self,
        current: &WalletState,
        approval: &Approval,
        membership: &MerkleMapWitness,
        approver_witness: Option<&MerkleMapWitness>,
    ) -> Result<Transition, MultisigError> {
        current.ensure_initialized()?;
        current.nonce.check(approval.nonce)?;

        let identity = approval.identity();
        if !membership_proof_verify(&current.signer_root, &identity, &Digest::one(), membership) {
            return Err(MultisigError::AuthFailure(format!(
                "{} is not a member of the signer set",
                identity.short()
            )));
        }
        approval.verify(self.policy)?;

        let approver = if self.policy.distinct_approvers() {
            let witness = approver_witness.ok_or_else(|| {
                MultisigError::AuthFailure("approver witness required".to_string())
            })?;
            Some((&identity, witness))
        } else {
            None
        };
        let tally = current.tally.record(approval.action.commitment(), approver)?;
        let nonce = current.nonce.advance()?;

        let mut state = current.next();
        state.tally = tally;
        state.nonce = nonce;

        Ok(Transition::new(
            state,
            vec![MultisigEvent::ApprovalRecorded {
                identity,
                nonce: approval.nonce,
                approvals: tally.count,
            }],
        ))
    }

    fn execute(&self, current: &WalletState, action: &Action) -> Result<Transition, MultisigError> {
        current.ensure_initialized()?;
        let commitment = action.commitment();
        let tally = current.tally.consume(commitment, current.threshold)?;

        let mut state = current.next();
        state.tally = tally;

        Ok(Transition {
            state,
            events: vec![MultisigEvent::TransactionExecuted {
                action: commitment,
                balance_change: action.balance_change,
            }],
            effect: Some(*action),
        })
    }

    fn reset_on_reconfigure(&self, state: &mut WalletState, events: &mut Vec<MultisigEvent>) {
        if self.policy.resets_on_reconfigure() && !state.tally.is_empty() {
            events.push(MultisigEvent::ApprovalsReset {
                discarded: state.tally.count,
            });
            state.tally = ApprovalTally::empty();
        }
    }
}

/// Verify `witness` shows `identity` holding `from` under `root` and return
/// the root with `identity` set to `to`
fn transition_root(
    root: &Digest,
    identity: &Digest,
    witness: &MerkleMapWitness,
    from: Digest,
    to: Digest,
) -> Result<Digest, MultisigError> {
    let (root_before, key) = witness.compute_root_and_key(&from)?;
    if key != *identity {
        return Err(MultisigError::AuthFailure(format!(
            "witness is for {}, not {}",
            key.short(),
            identity.short()
        )));
    }
    if root_before != *root {
        log::debug!(
            "witness root {} does not match signer root {}",
            root_before.short(),
            root.short()
        );
        let state = if from == Digest::ZERO { "absent" } else { "present" };
        return Err(MultisigError::AuthFailure(format!(
            "witness does not show {} {} under the committed root",
            identity.short(),
            state
        )));
    }
    Ok(witness.root_after_update(identity, &to)?)
}
