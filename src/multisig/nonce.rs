//! Replay guard
//!
//! The nonce is part of every signed approval message and moves forward by
//! one each time an approval is consumed, so a signature is only ever good
//! for a single protocol step.

use serde::{Deserialize, Serialize};

use crate::crypto::Digest;

use super::error::MultisigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(u64);

impl Nonce {
    pub fn new(value: u64) -> Self {
        Nonce(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Field encoding used in signed messages
    pub fn to_field(&self) -> Digest {
        Digest::from_u64(self.0)
    }

    /// Reject any payload not signed for exactly this nonce
    pub fn check(&self, presented: u64) -> Result<(), MultisigError> {
        if presented != self.0 {
            return Err(MultisigError::ReplayRejected {
                expected: self.0,
                got: presented,
            });
        }
        Ok(())
    }

    pub fn advance(&self) -> Result<Nonce, MultisigError> {
        self.0
            .checked_add(1)
            .map(Nonce)
            .ok_or_else(|| MultisigError::PolicyViolation("nonce exhausted".to_string()))
    }
}
