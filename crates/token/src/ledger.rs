// token/src/ledger.rs

use crate::{burning::BurnHistory, events::TokenEvent, TokenError, TokenResult};
use chain_core::{Address, Amount, DECIMALS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Sale Token".into(),
            symbol: "SALE".into(),
            decimals: DECIMALS,
        }
    }
}

/// Owner-gated mintable token with holder-initiated burning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintableToken {
    /// Token metadata
    metadata: TokenMetadata,
    /// Address that may mint
    owner: Address,
    /// Holder balances
    balances: HashMap<Address, Amount>,
    /// Total supply
    total_supply: Amount,
    /// One-way flag; once set no more minting
    minting_finished: bool,
    /// Burn history
    burns: BurnHistory,
    /// Pending events
    events: Vec<TokenEvent>,
}

impl MintableToken {
    /// Create new token owned by `owner` with zero supply
    pub fn new(metadata: TokenMetadata, owner: Address) -> Self {
        Self {
            metadata,
            owner,
            balances: HashMap::new(),
            total_supply: Amount::zero(),
            minting_finished: false,
            burns: BurnHistory::new(),
            events: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn total_supply(&self) -> &Amount {
        &self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances
            .get(holder)
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    pub fn minting_finished(&self) -> bool {
        self.minting_finished
    }

    pub fn burn_history(&self) -> &BurnHistory {
        &self.burns
    }

    /// Check that `caller` could mint right now
    pub fn ensure_can_mint(&self, caller: &Address) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if self.minting_finished {
            return Err(TokenError::MintingFinished);
        }
        Ok(())
    }

    /// Mint `amount` new tokens to `to`
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: &Amount) -> TokenResult<()> {
        self.ensure_can_mint(caller)?;
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient(*to));
        }

        self.total_supply = self.total_supply.clone() + amount.clone();
        let balance = self.balance_of(to) + amount.clone();
        self.balances.insert(*to, balance);

        tracing::debug!(%to, %amount, supply = %self.total_supply, "tokens minted");
        self.events.push(TokenEvent::Mint {
            to: *to,
            amount: amount.clone(),
        });
        Ok(())
    }

    /// Burn `amount` from the caller's own balance
    pub fn burn(&mut self, caller: &Address, amount: &Amount) -> TokenResult<()> {
        let balance = self.balance_of(caller);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                required: amount.clone(),
                available: balance.clone(),
            })?;

        self.balances.insert(*caller, remaining);
        self.total_supply = self.total_supply.saturating_sub(amount);
        self.burns
            .record(*caller, amount.clone(), self.total_supply.clone());

        tracing::info!(burner = %caller, %amount, supply = %self.total_supply, "tokens burned");
        self.events.push(TokenEvent::Burn {
            burner: *caller,
            amount: amount.clone(),
        });
        Ok(())
    }

    /// Move tokens between holders
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: &Amount) -> TokenResult<()> {
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient(*to));
        }
        let balance = self.balance_of(from);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                required: amount.clone(),
                available: balance.clone(),
            })?;

        self.balances.insert(*from, remaining);
        let to_balance = self.balance_of(to) + amount.clone();
        self.balances.insert(*to, to_balance);

        self.events.push(TokenEvent::Transfer {
            from: *from,
            to: *to,
            amount: amount.clone(),
        });
        Ok(())
    }

    /// Permanently stop minting
    pub fn finish_minting(&mut self, caller: &Address) -> TokenResult<()> {
        self.ensure_can_mint(caller)?;
        self.minting_finished = true;

        tracing::info!(owner = %caller, "minting finished");
        self.events.push(TokenEvent::MintFinished);
        Ok(())
    }

    /// Hand minting rights to `new_owner`
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: &Address) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(TokenError::InvalidRecipient(*new_owner));
        }

        let previous_owner = self.owner;
        self.owner = *new_owner;

        tracing::info!(%previous_owner, new_owner = %self.owner, "token ownership transferred");
        self.events.push(TokenEvent::OwnershipTransferred {
            previous_owner,
            new_owner: *new_owner,
        });
        Ok(())
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_owner(&self, caller: &Address) -> TokenResult<()> {
        if caller != &self.owner {
            return Err(TokenError::Unauthorized { caller: *caller });
        }
        Ok(())
    }
}
