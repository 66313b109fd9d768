// crowdsale/src/events.rs

use chain_core::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Events emitted by the sale controller for external observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum CrowdsaleEvent {
    TokenPurchase {
        purchaser: Address,
        beneficiary: Address,
        value: Amount,
        amount: Amount,
    },
    Finalized,
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(CrowdsaleEvent::Finalized).unwrap();
        assert_eq!(json["event"], "Finalized");
    }
}
