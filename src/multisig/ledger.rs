//! Ledger the wallet's approved actions are applied to

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::action::Action;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Balance overflow")]
    Overflow,
}

/// Execution host for authorized actions
///
/// `apply` must either apply the whole action or leave the ledger untouched.
pub trait Ledger {
    fn apply(&mut self, action: &Action) -> Result<(), LedgerError>;
}

/// Single-account in-memory ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    balance: u64,
}

impl AccountLedger {
    pub fn with_balance(balance: u64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }
}

impl Ledger for AccountLedger {
    fn apply(&mut self, action: &Action) -> Result<(), LedgerError> {
        let amount = action.balance_change.unsigned_abs();
        self.balance = if action.balance_change < 0 {
            self.balance
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientFunds {
                    have: self.balance,
                    need: amount,
                })?
        } else {
            self.balance
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let mut ledger = AccountLedger::with_balance(100);
        ledger.apply(&Action::new(-40)).unwrap();
        ledger.apply(&Action::new(15)).unwrap();
        assert_eq!(ledger.balance(), 75);
    }

    #[test]
    fn test_overdraft_leaves_balance() {
        let mut ledger = AccountLedger::with_balance(10);
        assert_eq!(
            ledger.apply(&Action::new(-11)),
            Err(LedgerError::InsufficientFunds { have: 10, need: 11 })
        );
        assert_eq!(ledger.balance(), 10);
    }
}
