// token/src/lib.rs

//! Mintable, burnable token ledger
//!
//! The ledger is owned by a single address (the sale controller during the
//! sale, the beneficiary fund afterwards). Only the owner may mint; any
//! holder may burn their own balance.

pub mod burning;
pub mod events;
pub mod ledger;

pub use burning::{BurnHistory, BurnRecord};
pub use events::TokenEvent;
pub use ledger::{MintableToken, TokenMetadata};

use chain_core::{Address, Amount};

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Errors that can occur in token operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Unauthorized: {caller} is not the token owner")]
    Unauthorized { caller: Address },

    #[error("Minting has finished")]
    MintingFinished,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(Address),
}
