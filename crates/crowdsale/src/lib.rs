// crowdsale/src/lib.rs

//! Time-phased, capped, refundable token sale
//!
//! This crate implements the sale controller:
//! - Sale window and phase resolution (presale / token sale / general)
//! - Tiered rate schedule with single-tier volume discounts
//! - Value cap and token supply cap enforcement
//! - Refund vault escrowing contributions until finalization
//! - One-shot finalization: forward funds to the wallet or open refunds

pub mod config;
pub mod controller;
pub mod events;
pub mod rate;
pub mod service;
pub mod vault;
pub mod window;

pub use config::CrowdsaleConfig;
pub use controller::{
    Crowdsale, CrowdsaleParams, FinalizationState, PurchaseReceipt, Quote, Settlement,
};
pub use events::CrowdsaleEvent;
pub use rate::{PricingPhase, Rate, RateSchedule, VolumeTier};
pub use service::SaleService;
pub use vault::{RefundVault, VaultError, VaultEvent, VaultState};
pub use window::{SalePhase, SaleWindow};

use chain_core::{Address, Amount, ChainError, Timestamp};
use token::TokenError;

/// Result type for crowdsale operations
pub type CrowdsaleResult<T> = Result<T, CrowdsaleError>;

/// Errors that can occur in crowdsale operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrowdsaleError {
    #[error("Sale not open at {now} (window {start}..{end})")]
    NotOpen {
        now: Timestamp,
        start: Timestamp,
        end: Timestamp,
    },

    #[error("Invalid purchase: {0}")]
    InvalidPurchase(String),

    #[error("Value cap exceeded: raised {raised} + {value} > cap {cap}")]
    CapExceeded {
        raised: Amount,
        value: Amount,
        cap: Amount,
    },

    #[error("Token cap exceeded: supply {supply} + {amount} > cap {cap}")]
    TokenCapExceeded {
        supply: Amount,
        amount: Amount,
        cap: Amount,
    },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Sale no longer accepting contributions (vault {0:?})")]
    InvalidState(VaultState),

    #[error("Sale has not ended")]
    NotEnded,

    #[error("Sale already finalized")]
    AlreadyFinalized,

    #[error("Unauthorized: {caller}")]
    Unauthorized { caller: Address },

    #[error("Refunds not allowed")]
    RefundsNotAllowed,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Ledger error: {0}")]
    Chain(#[from] ChainError),
}
