//! Execution host for a wallet
//!
//! The host owns the single committed [`WalletState`], the ledger approved
//! actions are applied to, and the event log. Submissions go through
//! `&mut self`, so writers are serialized; two submissions built on the
//! same snapshot cannot both commit because the first one moves the
//! snapshot and the second fails its snapshot check.

use serde::{Deserialize, Serialize};

use crate::crypto::Digest;

use super::config::Policy;
use super::error::MultisigError;
use super::events::RecordedEvent;
use super::ledger::Ledger;
use super::machine::{Operation, StateMachine};
use super::state::WalletState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletHost<L> {
    machine: StateMachine,
    state: WalletState,
    ledger: L,
    events: Vec<RecordedEvent>,
}

impl<L: Ledger> WalletHost<L> {
    /// Create a host for a fresh, uninitialized wallet
    pub fn new(policy: Policy, ledger: L) -> Self {
        Self {
            machine: StateMachine::new(policy),
            state: WalletState::uninitialized(),
            ledger,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// Snapshot hash callers must claim on their next submission
    pub fn snapshot(&self) -> Digest {
        self.state.snapshot()
    }

    pub fn policy(&self) -> Policy {
        self.machine.policy()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Run `op` against the committed state and commit the result
    ///
    /// Any effect is applied to the ledger first; if the ledger refuses it,
    /// nothing is committed.
    pub fn submit(&mut self, claimed: &Digest, op: Operation) -> Result<&WalletState, MultisigError> {
        let name = op.name();

        let transition = match self.machine.apply(&self.state, claimed, &op) {
            Ok(transition) => transition,
            Err(e) => {
                log::warn!("Rejected {} at version {}: {}", name, self.state.version, e);
                return Err(e);
            }
        };

        if let Some(action) = &transition.effect {
            if let Err(e) = self.ledger.apply(action) {
                log::warn!("Ledger refused {} for {}: {}", action, name, e);
                return Err(e.into());
            }
        }

        self.state = transition.state;
        let version = self.state.version;
        self.events.extend(
            transition
                .events
                .into_iter()
                .map(|event| RecordedEvent::new(version, event)),
        );

        log::info!(
            "Committed {} as version {} (snapshot {})",
            name,
            version,
            self.state.snapshot().short()
        );
        Ok(&self.state)
    }
}
