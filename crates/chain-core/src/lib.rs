// chain-core/src/lib.rs

//! Shared primitives for the token sale workspace
//!
//! This crate provides:
//! - Fixed-point token / value amounts
//! - Account addresses and contract address derivation
//! - Injectable clocks
//! - The native-value account book with checkpoint/rollback

pub mod address;
pub mod clock;
pub mod state;
pub mod types;

pub use address::Address;
pub use clock::{Clock, ManualClock, SystemClock};
pub use state::ValueLedger;
pub use types::*;

/// Result type for core operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors that can occur in core operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
