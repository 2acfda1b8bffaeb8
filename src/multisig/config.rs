//! Wallet configuration: policy flags and the signer-count/threshold pair

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::error::MultisigError;

bitflags! {
    /// Rule variants the state machine can run under
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Policy: u8 {
        /// Signed approval messages cover the action fields as well as the nonce
        const BIND_ACTION = 0b0001;
        /// Threshold and membership changes discard an in-flight tally
        const RESET_ON_RECONFIGURE = 0b0010;
        /// A signer counts at most once per approval round
        const DISTINCT_APPROVERS = 0b0100;
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::all()
    }
}

impl Policy {
    pub fn binds_action(&self) -> bool {
        self.contains(Policy::BIND_ACTION)
    }

    pub fn resets_on_reconfigure(&self) -> bool {
        self.contains(Policy::RESET_ON_RECONFIGURE)
    }

    pub fn distinct_approvers(&self) -> bool {
        self.contains(Policy::DISTINCT_APPROVERS)
    }
}

/// Signer count and approval threshold (M-of-N)
///
/// Constructors enforce `0 < threshold <= signer_count`, so a value of this
/// type is always a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    signer_count: u64,
    threshold: u64,
}

impl ThresholdConfig {
    pub fn new(signer_count: u64, threshold: u64) -> Result<Self, MultisigError> {
        validate_threshold(threshold, signer_count)?;
        Ok(Self {
            signer_count,
            threshold,
        })
    }

    pub fn signer_count(&self) -> u64 {
        self.signer_count
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn with_threshold(&self, threshold: u64) -> Result<Self, MultisigError> {
        Self::new(self.signer_count, threshold)
    }

    pub fn after_addition(&self) -> Result<Self, MultisigError> {
        let signer_count = self.signer_count.checked_add(1).ok_or_else(|| {
            MultisigError::PolicyViolation("signer count overflow".to_string())
        })?;
        Self::new(signer_count, self.threshold)
    }

    /// Configuration after one signer leaves; checked against the reduced count
    pub fn after_removal(&self) -> Result<Self, MultisigError> {
        let signer_count = self.signer_count.checked_sub(1).ok_or_else(|| {
            MultisigError::PolicyViolation("no signers left to remove".to_string())
        })?;
        Self::new(signer_count, self.threshold)
    }

    /// Human-readable form like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.signer_count)
    }
}

/// Check `0 < threshold <= signer_count`
pub fn validate_threshold(threshold: u64, signer_count: u64) -> Result<(), MultisigError> {
    if threshold == 0 {
        return Err(MultisigError::PolicyViolation(
            "threshold must be at least 1".to_string(),
        ));
    }
    if threshold > signer_count {
        return Err(MultisigError::PolicyViolation(format!(
            "threshold {} exceeds signer count {}",
            threshold, signer_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(ThresholdConfig::new(3, 2).is_ok());
        assert!(ThresholdConfig::new(3, 3).is_ok());
        assert!(ThresholdConfig::new(3, 0).is_err());
        assert!(ThresholdConfig::new(3, 4).is_err());
        assert!(ThresholdConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_removal_checks_post_count() {
        let config = ThresholdConfig::new(3, 2).unwrap();
        let config = config.after_removal().unwrap();
        assert_eq!(config.description(), "2-of-2");
        assert!(matches!(
            config.after_removal(),
            Err(MultisigError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_addition_and_threshold() {
        let config = ThresholdConfig::new(1, 1).unwrap().after_addition().unwrap();
        assert_eq!(config.signer_count(), 2);
        assert_eq!(config.with_threshold(2).unwrap().threshold(), 2);
        assert!(config.with_threshold(3).is_err());
    }

    #[test]
    fn test_policy_default_and_serde() {
        let policy = Policy::default();
        assert!(policy.binds_action());
        assert!(policy.resets_on_reconfigure());
        assert!(policy.distinct_approvers());

        let json = serde_json::to_string(&Policy::BIND_ACTION).unwrap();
        let back: Policy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Policy::BIND_ACTION);
    }
}
