// token/src/events.rs

use chain_core::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Observable ledger events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    Mint {
        to: Address,
        amount: Amount,
    },
    Burn {
        burner: Address,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    MintFinished,
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}
