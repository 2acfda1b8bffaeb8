//! Events emitted by committed transitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Digest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MultisigEvent {
    WalletCreated {
        signer_root: Digest,
        signer_count: u64,
        threshold: u64,
    },
    SignerAdded {
        identity: Digest,
    },
    SignerRemoved {
        identity: Digest,
    },
    ThresholdChanged {
        threshold: u64,
    },
    /// An in-flight tally was discarded by a reconfiguration
    ApprovalsReset {
        discarded: u64,
    },
    ApprovalRecorded {
        identity: Digest,
        nonce: u64,
        approvals: u64,
    },
    TransactionExecuted {
        action: Digest,
        balance_change: i64,
    },
}

/// An event as stored in the host's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// State version the event was committed at
    pub version: u64,
    pub event: MultisigEvent,
    pub recorded_at: DateTime<Utc>,
}

impl RecordedEvent {
    pub fn new(version: u64, event: MultisigEvent) -> Self {
        Self {
            version,
            event,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = MultisigEvent::ThresholdChanged { threshold: 2 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "threshold-changed");
        assert_eq!(json["threshold"], 2);
    }
}
