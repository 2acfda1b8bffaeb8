//! The guarded action a wallet collects approvals for

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{hash_fields, Digest};

/// A balance change to apply to the wallet's ledger account once approved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub balance_change: i64,
}

impl Action {
    pub fn new(balance_change: i64) -> Self {
        Self { balance_change }
    }

    /// Field encoding: magnitude, then 1 for a debit or 0 for a credit
    pub fn to_fields(&self) -> [Digest; 2] {
        [
            Digest::from_u64(self.balance_change.unsigned_abs()),
            Digest::from_u64(u64::from(self.balance_change < 0)),
        ]
    }

    /// Binding commitment recorded as the pending action
    pub fn commitment(&self) -> Digest {
        hash_fields(&self.to_fields())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "balance change {:+}", self.balance_change)
    }
}
