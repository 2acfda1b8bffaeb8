//! Signed approval payloads
//!
//! An approval is a signer's signature over the wallet nonce (and, under
//! [`Policy::BIND_ACTION`], the action fields). The nonce travels with the
//! payload so a stale approval is recognised as a replay before any
//! signature work is done.

use secp256k1::PublicKey;

use crate::crypto::{hash_fields, identity_hash, verify_signature, Digest, KeyPair};

use super::action::Action;
use super::config::Policy;
use super::error::MultisigError;

/// A single signer's approval of an action at a given nonce
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Approval {
    /// Public key of the signer
    pub signer: PublicKey,
    /// Nonce the signature was produced for
    pub nonce: u64,
    pub action: Action,
    /// Compact secp256k1 signature over [`approval_message`]
    pub signature: Vec<u8>,
}

/// Message a signer signs to approve `action` at `nonce`
pub fn approval_message(nonce: u64, action: &Action, policy: Policy) -> Digest {
    let nonce = Digest::from_u64(nonce);
    if policy.binds_action() {
        let [magnitude, sign] = action.to_fields();
        hash_fields(&[nonce, magnitude, sign])
    } else {
        hash_fields(&[nonce])
    }
}

impl Approval {
    /// Sign an approval with a signer's key pair
    pub fn create(
        key_pair: &KeyPair,
        nonce: u64,
        action: Action,
        policy: Policy,
    ) -> Result<Self, MultisigError> {
        let message = approval_message(nonce, &action, policy);
        let signature = key_pair.sign(&message)?;

        Ok(Self {
            signer: key_pair.public_key,
            nonce,
            action,
            signature,
        })
    }

    /// Identity hash of the signer
    pub fn identity(&self) -> Digest {
        identity_hash(&self.signer)
    }

    /// Check the signature over the message for this approval's own nonce
    pub fn verify(&self, policy: Policy) -> Result<(), MultisigError> {
        let message = approval_message(self.nonce, &self.action, policy);
        if !verify_signature(&self.signer, &message, &self.signature)? {
            return Err(MultisigError::AuthFailure(format!(
                "signature by {} does not verify",
                self.identity().short()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify() {
        let kp = KeyPair::generate();
        let approval = Approval::create(&kp, 0, Action::new(-10), Policy::default()).unwrap();
        assert!(approval.verify(Policy::default()).is_ok());
        assert_eq!(approval.identity(), kp.identity());
    }

    #[test]
    fn test_redirected_action_fails() {
        let kp = KeyPair::generate();
        let mut approval = Approval::create(&kp, 0, Action::new(-10), Policy::default()).unwrap();
        approval.action = Action::new(-1000);
        assert!(matches!(
            approval.verify(Policy::default()),
            Err(MultisigError::AuthFailure(_))
        ));
    }

    #[test]
    fn test_nonce_only_binding() {
        let kp = KeyPair::generate();
        let policy = Policy::default() - Policy::BIND_ACTION;
        let mut approval = Approval::create(&kp, 3, Action::new(1), policy).unwrap();
        // Without action binding the signature only covers the nonce
        approval.action = Action::new(2);
        assert!(approval.verify(policy).is_ok());
        approval.nonce = 4;
        assert!(approval.verify(policy).is_err());
    }

    #[test]
    fn test_garbled_signature() {
        let kp = KeyPair::generate();
        let mut approval = Approval::create(&kp, 0, Action::new(1), Policy::default()).unwrap();
        approval.signature.truncate(10);
        assert!(matches!(
            approval.verify(Policy::default()),
            Err(MultisigError::Crypto(_))
        ));
    }
}
