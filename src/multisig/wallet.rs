//! Multi-signature wallet client
//!
//! [`MultisigWallet`] pairs a [`WalletHost`] with the client-side signer and
//! approver maps needed to build witnesses. Each method claims the host's
//! current snapshot, submits one operation and, once it commits, mirrors the
//! change into the local maps.

use chrono::{DateTime, Utc};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{identity_hash, KeyPair};

use super::action::Action;
use super::approval::Approval;
use super::config::Policy;
use super::error::MultisigError;
use super::host::WalletHost;
use super::ledger::{AccountLedger, Ledger};
use super::machine::Operation;
use super::signers::SignerSet;
use super::state::WalletState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigWallet<L = AccountLedger> {
    /// Optional human-readable label
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    host: WalletHost<L>,
    signers: SignerSet,
    /// Signers who approved in the current round
    approvers: SignerSet,
}

impl<L: Ledger> MultisigWallet<L> {
    pub fn new(policy: Policy, ledger: L, label: Option<String>) -> Self {
        Self {
            label,
            created_at: Utc::now(),
            host: WalletHost::new(policy, ledger),
            signers: SignerSet::new(),
            approvers: SignerSet::new(),
        }
    }

    pub fn host(&self) -> &WalletHost<L> {
        &self.host
    }

    pub fn state(&self) -> &WalletState {
        self.host.state()
    }

    pub fn signers(&self) -> &SignerSet {
        &self.signers
    }

    pub fn approvers(&self) -> &SignerSet {
        &self.approvers
    }

    pub fn is_signer(&self, key: &PublicKey) -> bool {
        self.signers.is_signer(key)
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        let state = self.state();
        format!("{}-of-{}", state.threshold, state.signer_count)
    }

    /// Initialize the wallet with `keys` as its signers
    pub fn setup(&mut self, keys: &[PublicKey], threshold: u64) -> Result<WalletState, MultisigError> {
        let signers = SignerSet::from_public_keys(keys)?;
        let state = self.submit(Operation::Setup {
            signer_root: signers.root(),
            signer_count: signers.count(),
            threshold,
            members: keys.iter().map(identity_hash).collect(),
        })?;
        self.signers = signers;
        Ok(state)
    }

    pub fn add_signer(&mut self, key: &PublicKey) -> Result<WalletState, MultisigError> {
        let state = self.submit(Operation::AddSigner {
            signer: *key,
            witness: self.signers.witness_for(key),
        })?;
        self.signers.insert(identity_hash(key))?;
        Ok(state)
    }

    pub fn remove_signer(&mut self, key: &PublicKey) -> Result<WalletState, MultisigError> {
        let state = self.submit(Operation::RemoveSigner {
            signer: *key,
            witness: self.signers.witness_for(key),
        })?;
        self.signers.remove(&identity_hash(key))?;
        Ok(state)
    }

    pub fn set_threshold(&mut self, threshold: u64) -> Result<WalletState, MultisigError> {
        self.submit(Operation::SetThreshold { threshold })
    }

    /// Sign an approval of `action` at the current nonce and submit it
    pub fn approve(&mut self, key_pair: &KeyPair, action: Action) -> Result<WalletState, MultisigError> {
        let policy = self.host.policy();
        let approval = Approval::create(key_pair, self.state().nonce.value(), action, policy)?;
        self.submit_approval(approval)
    }

    /// Submit an approval signed elsewhere
    pub fn submit_approval(&mut self, approval: Approval) -> Result<WalletState, MultisigError> {
        let identity = approval.identity();
        let approver_witness = self
            .host
            .policy()
            .distinct_approvers()
            .then(|| self.approvers.witness(&identity));

        let state = self.submit(Operation::Sign {
            membership: self.signers.witness(&identity),
            approval,
            approver_witness,
        })?;
        if self.host.policy().distinct_approvers() {
            self.approvers.insert(identity)?;
        }
        Ok(state)
    }

    pub fn execute(&mut self, action: Action) -> Result<WalletState, MultisigError> {
        self.submit(Operation::Execute { action })
    }

    fn submit(&mut self, op: Operation) -> Result<WalletState, MultisigError> {
        let claimed = self.host.snapshot();
        let state = *self.host.submit(&claimed, op)?;
        if state.tally.is_empty() {
            self.approvers.clear();
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::events::MultisigEvent;
    use crate::multisig::state::Phase;

    fn create_test_wallet(threshold: u64) -> (MultisigWallet, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let pubkeys: Vec<PublicKey> = keys.iter().map(|k| k.public_key).collect();

        let mut wallet = MultisigWallet::new(
            Policy::default(),
            AccountLedger::with_balance(1_000),
            Some("Test".to_string()),
        );
        wallet.setup(&pubkeys, threshold).unwrap();
        (wallet, keys)
    }

    #[test]
    fn test_wallet_setup() {
        let (wallet, keys) = create_test_wallet(2);
        assert_eq!(wallet.description(), "2-of-3");
        assert!(keys.iter().all(|k| wallet.is_signer(&k.public_key)));
        assert_eq!(wallet.state().signer_root, wallet.signers().root());
    }

    #[test]
    fn test_setup_records_each_signer() {
        let (wallet, keys) = create_test_wallet(2);
        let events = wallet.host().events();
        assert_eq!(events.len(), 1 + keys.len());
        for (recorded, key) in events[1..].iter().zip(&keys) {
            assert_eq!(
                recorded.event,
                MultisigEvent::SignerAdded {
                    identity: key.identity()
                }
            );
        }
    }

    #[test]
    fn test_failed_setup_keeps_signers() {
        let mut wallet = MultisigWallet::new(Policy::default(), AccountLedger::default(), None);
        let key = KeyPair::generate().public_key;
        assert!(wallet.setup(&[key], 2).is_err());
        assert_eq!(wallet.signers().count(), 0);
        assert_eq!(wallet.state().phase(), Phase::Uninitialized);
    }

    #[test]
    fn test_signature_collection() {
        let (mut wallet, keys) = create_test_wallet(2);
        let action = Action::new(-250);

        wallet.approve(&keys[0], action).unwrap();
        assert_eq!(wallet.state().phase(), Phase::AwaitingApprovals { approvals: 1 });
        assert_eq!(wallet.approvers().count(), 1);

        wallet.approve(&keys[1], action).unwrap();
        assert_eq!(wallet.state().phase(), Phase::ReadyToExecute);

        wallet.execute(action).unwrap();
        assert_eq!(wallet.host().ledger().balance(), 750);
        assert_eq!(wallet.approvers().count(), 0);
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let (mut wallet, keys) = create_test_wallet(2);
        wallet.approve(&keys[0], Action::new(-1)).unwrap();
        let result = wallet.approve(&keys[0], Action::new(-1));
        assert!(matches!(result, Err(MultisigError::DuplicateApproval(_))));
    }

    #[test]
    fn test_unauthorized_signer_rejected() {
        let (mut wallet, _) = create_test_wallet(2);
        let result = wallet.approve(&KeyPair::generate(), Action::new(-1));
        assert!(matches!(result, Err(MultisigError::AuthFailure(_))));
    }

    #[test]
    fn test_membership_changes() {
        let (mut wallet, keys) = create_test_wallet(2);
        let newcomer = KeyPair::generate();
        wallet.add_signer(&newcomer.public_key).unwrap();
        assert_eq!(wallet.description(), "2-of-4");

        wallet.remove_signer(&keys[0].public_key).unwrap();
        wallet.remove_signer(&keys[1].public_key).unwrap();
        assert!(matches!(
            wallet.remove_signer(&keys[2].public_key),
            Err(MultisigError::PolicyViolation(_))
        ));
        assert_eq!(wallet.description(), "2-of-2");
        assert!(wallet.is_signer(&keys[2].public_key));
        assert_eq!(wallet.state().signer_root, wallet.signers().root());
    }
}
