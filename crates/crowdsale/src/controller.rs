// crowdsale/src/controller.rs

use crate::{
    events::CrowdsaleEvent,
    rate::{PricingPhase, Rate, RateSchedule},
    vault::{RefundVault, VaultState},
    window::{SalePhase, SaleWindow},
    CrowdsaleError, CrowdsaleResult,
};
use chain_core::{Address, Amount, Timestamp, ValueLedger};
use serde::{Deserialize, Serialize};
use token::{MintableToken, TokenMetadata};

/// The fourteen resolved construction values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrowdsaleParams {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub presale_start_time: Timestamp,
    pub presale_end_time: Timestamp,
    pub tokensale_start_time: Timestamp,
    pub tokensale_end_time: Timestamp,
    /// General sale rate, tokens per unit
    pub base_rate: u64,
    /// Beneficiary fund: receives forwarded value and the initial fund allocation
    pub wallet: Address,
    pub premium_wallet: Address,
    /// Value cap, smallest units
    pub cap: Amount,
    /// Supply cap, smallest units, pre-allocations included
    pub token_cap: Amount,
    pub initial_fund_balance: Amount,
    pub initial_premium_balance: Amount,
    pub goal: Amount,
}

/// One-way sale lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizationState {
    Open,
    Finalized,
}

/// Outcome of finalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    /// Goal reached; escrow forwarded to the wallet
    Forwarded { amount: Amount },
    /// Goal missed; contributors may claim refunds
    RefundsEnabled,
}

/// Price of a prospective contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub phase: PricingPhase,
    pub rate: Rate,
    pub amount: Amount,
}

/// Accepted contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub purchaser: Address,
    pub beneficiary: Address,
    pub value: Amount,
    pub amount: Amount,
    pub phase: PricingPhase,
    pub rate: Rate,
}

/// Sale controller.
///
/// Owns the token (as its minter until finalization) and the refund vault.
/// Native value lives in a [`ValueLedger`] passed to each value-moving call;
/// every operation checks all of its preconditions before the first
/// mutation, so a rejected call leaves value, balances and supply untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crowdsale {
    /// Account of the sale contract itself; minter of the token
    address: Address,
    owner: Address,
    window: SaleWindow,
    schedule: RateSchedule,
    wallet: Address,
    premium_wallet: Address,
    cap: Amount,
    token_cap: Amount,
    goal: Amount,
    raised: Amount,
    token: MintableToken,
    vault: RefundVault,
    state: FinalizationState,
    events: Vec<CrowdsaleEvent>,
}

impl Crowdsale {
    /// Deploy with default token metadata as `owner`'s first contract
    pub fn new(owner: Address, params: CrowdsaleParams) -> CrowdsaleResult<Self> {
        Self::deploy(owner, 0, params, TokenMetadata::default())
    }

    /// Validate `params`, create the token and vault, and mint the two
    /// pre-allocations
    pub fn deploy(
        owner: Address,
        nonce: u64,
        params: CrowdsaleParams,
        metadata: TokenMetadata,
    ) -> CrowdsaleResult<Self> {
        let window = SaleWindow::new(
            params.start_time,
            params.end_time,
            params.presale_start_time,
            params.presale_end_time,
            params.tokensale_start_time,
            params.tokensale_end_time,
        )?;
        let schedule = RateSchedule::new(params.base_rate)?;

        if params.wallet.is_zero() || params.premium_wallet.is_zero() {
            return Err(CrowdsaleError::InvalidConfiguration(
                "wallets must not be the zero address".into(),
            ));
        }
        if params.cap.is_zero() {
            return Err(CrowdsaleError::InvalidConfiguration(
                "cap must be positive".into(),
            ));
        }
        if params.goal.is_zero() {
            return Err(CrowdsaleError::InvalidConfiguration(
                "goal must be positive".into(),
            ));
        }
        let preallocated = params
            .initial_fund_balance
            .checked_add(&params.initial_premium_balance)
            .ok_or(CrowdsaleError::Overflow)?;
        if params.token_cap < preallocated {
            return Err(CrowdsaleError::InvalidConfiguration(format!(
                "token cap {} below initial allocations {}",
                params.token_cap, preallocated
            )));
        }

        let address = Address::contract(&owner, nonce);
        let vault = RefundVault::new(Address::contract(&address, 1), address, params.wallet);

        let mut token = MintableToken::new(metadata, address);
        token.mint(&address, &params.wallet, &params.initial_fund_balance)?;
        token.mint(&address, &params.premium_wallet, &params.initial_premium_balance)?;

        tracing::info!(
            sale = %address,
            %owner,
            start = window.start(),
            end = window.end(),
            rate = schedule.base_rate(),
            cap = %params.cap,
            token_cap = %params.token_cap,
            goal = %params.goal,
            supply = %token.total_supply(),
            "crowdsale deployed"
        );

        Ok(Self {
            address,
            owner,
            window,
            schedule,
            wallet: params.wallet,
            premium_wallet: params.premium_wallet,
            cap: params.cap,
            token_cap: params.token_cap,
            goal: params.goal,
            raised: Amount::zero(),
            token,
            vault,
            state: FinalizationState::Open,
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn window(&self) -> &SaleWindow {
        &self.window
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    pub fn wallet(&self) -> &Address {
        &self.wallet
    }

    pub fn premium_wallet(&self) -> &Address {
        &self.premium_wallet
    }

    pub fn cap(&self) -> &Amount {
        &self.cap
    }

    pub fn token_cap(&self) -> &Amount {
        &self.token_cap
    }

    pub fn goal(&self) -> &Amount {
        &self.goal
    }

    /// General sale rate
    pub fn rate(&self) -> u64 {
        self.schedule.base_rate()
    }

    /// Cumulative value accepted
    pub fn raised(&self) -> &Amount {
        &self.raised
    }

    pub fn goal_reached(&self) -> bool {
        self.raised >= self.goal
    }

    pub fn state(&self) -> FinalizationState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == FinalizationState::Finalized
    }

    pub fn token(&self) -> &MintableToken {
        &self.token
    }

    /// The token stays independently owner-gated, so handing out mutable
    /// access only lets its current owner mint
    pub fn token_mut(&mut self) -> &mut MintableToken {
        &mut self.token
    }

    pub fn vault(&self) -> &RefundVault {
        &self.vault
    }

    /// Tokens still mintable before the supply cap
    pub fn remaining_offering(&self) -> Amount {
        self.token_cap.saturating_sub(self.token.total_supply())
    }

    pub fn current_phase(&self, now: Timestamp) -> SalePhase {
        self.window.phase_at(now)
    }

    /// Price `value` at `now` without touching any state
    pub fn quote(&self, value: &Amount, now: Timestamp) -> CrowdsaleResult<Quote> {
        let phase = self.window.phase_at(now).pricing().ok_or(CrowdsaleError::NotOpen {
            now,
            start: self.window.start(),
            end: self.window.end(),
        })?;

        Ok(Quote {
            phase,
            rate: self.schedule.rate_for(phase, value),
            amount: self.schedule.token_amount(phase, value),
        })
    }

    /// Past the end time, or the supply cap has been reached
    pub fn has_ended(&self, now: Timestamp) -> bool {
        self.window.is_over(now) || self.token.total_supply() >= &self.token_cap
    }

    /// Accept `value` from `purchaser` and mint the priced tokens to
    /// `beneficiary`
    pub fn buy_tokens(
        &mut self,
        funds: &mut ValueLedger,
        purchaser: &Address,
        beneficiary: &Address,
        value: &Amount,
        now: Timestamp,
    ) -> CrowdsaleResult<PurchaseReceipt> {
        let result = funds
            .atomically(|funds| self.try_buy_tokens(funds, purchaser, beneficiary, value, now));
        if let Err(e) = &result {
            tracing::warn!(%purchaser, %beneficiary, %value, now, error = %e, "purchase rejected");
        }
        result
    }

    /// Plain value transfer: buy for the sender
    pub fn receive(
        &mut self,
        funds: &mut ValueLedger,
        sender: &Address,
        value: &Amount,
        now: Timestamp,
    ) -> CrowdsaleResult<PurchaseReceipt> {
        self.buy_tokens(funds, sender, sender, value, now)
    }

    fn try_buy_tokens(
        &mut self,
        funds: &mut ValueLedger,
        purchaser: &Address,
        beneficiary: &Address,
        value: &Amount,
        now: Timestamp,
    ) -> CrowdsaleResult<PurchaseReceipt> {
        let quote = self.quote(value, now)?;

        // The window can still be open after an early, cap-triggered finalize
        if self.is_finalized() {
            return Err(CrowdsaleError::InvalidState(self.vault.state()));
        }
        if value.is_zero() {
            return Err(CrowdsaleError::InvalidPurchase(
                "contribution must be positive".into(),
            ));
        }
        if beneficiary.is_zero() {
            return Err(CrowdsaleError::InvalidPurchase(
                "beneficiary is the zero address".into(),
            ));
        }

        let raised_after = self
            .raised
            .checked_add(value)
            .ok_or(CrowdsaleError::Overflow)?;
        if raised_after > self.cap {
            return Err(CrowdsaleError::CapExceeded {
                raised: self.raised.clone(),
                value: value.clone(),
                cap: self.cap.clone(),
            });
        }

        let supply = self.token.total_supply();
        let supply_after = supply
            .checked_add(&quote.amount)
            .ok_or(CrowdsaleError::Overflow)?;
        if supply_after > self.token_cap {
            return Err(CrowdsaleError::TokenCapExceeded {
                supply: supply.clone(),
                amount: quote.amount.clone(),
                cap: self.token_cap.clone(),
            });
        }

        self.token.ensure_can_mint(&self.address)?;
        self.vault.ensure_active()?;

        let available = funds.balance_of(purchaser);
        if &available < value {
            return Err(CrowdsaleError::InsufficientBalance {
                required: value.clone(),
                available,
            });
        }

        self.vault.deposit(funds, &self.address, purchaser, value)?;
        self.token.mint(&self.address, beneficiary, &quote.amount)?;
        self.raised = raised_after;

        tracing::info!(
            %purchaser,
            %beneficiary,
            %value,
            amount = %quote.amount,
            phase = ?quote.phase,
            rate = %quote.rate,
            raised = %self.raised,
            "token purchase"
        );
        self.events.push(CrowdsaleEvent::TokenPurchase {
            purchaser: *purchaser,
            beneficiary: *beneficiary,
            value: value.clone(),
            amount: quote.amount.clone(),
        });

        Ok(PurchaseReceipt {
            purchaser: *purchaser,
            beneficiary: *beneficiary,
            value: value.clone(),
            amount: quote.amount,
            phase: quote.phase,
            rate: quote.rate,
        })
    }

    /// Settle the sale once it has ended: forward the escrow if the goal was
    /// reached, otherwise open refunds. Token ownership passes to the wallet;
    /// minting stays enabled.
    pub fn finalize(
        &mut self,
        funds: &mut ValueLedger,
        caller: &Address,
        now: Timestamp,
    ) -> CrowdsaleResult<Settlement> {
        funds.atomically(|funds| self.try_finalize(funds, caller, now))
    }

    fn try_finalize(
        &mut self,
        funds: &mut ValueLedger,
        caller: &Address,
        now: Timestamp,
    ) -> CrowdsaleResult<Settlement> {
        if caller != &self.owner {
            tracing::warn!(%caller, "finalize rejected: not the owner");
            return Err(CrowdsaleError::Unauthorized { caller: *caller });
        }
        if self.is_finalized() {
            return Err(CrowdsaleError::AlreadyFinalized);
        }
        if !self.has_ended(now) {
            return Err(CrowdsaleError::NotEnded);
        }

        let settlement = if self.goal_reached() {
            let amount = self.vault.close(funds, &self.address)?;
            Settlement::Forwarded { amount }
        } else {
            self.vault.enable_refunds(&self.address)?;
            Settlement::RefundsEnabled
        };

        self.token.transfer_ownership(&self.address, &self.wallet)?;
        self.state = FinalizationState::Finalized;

        tracing::info!(
            raised = %self.raised,
            goal = %self.goal,
            ?settlement,
            "crowdsale finalized"
        );
        self.events.push(CrowdsaleEvent::Finalized);
        Ok(settlement)
    }

    /// Pay back `caller`'s contribution after a failed sale. Pays zero to
    /// anyone with nothing left to claim.
    pub fn claim_refund(
        &mut self,
        funds: &mut ValueLedger,
        caller: &Address,
    ) -> CrowdsaleResult<Amount> {
        if !self.is_finalized() || self.vault.state() != VaultState::Refunding {
            return Err(CrowdsaleError::RefundsNotAllowed);
        }
        let sale = self.address;
        funds.atomically(|funds| {
            self.vault
                .refund(funds, &sale, caller)
                .map_err(CrowdsaleError::from)
        })
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> CrowdsaleResult<()> {
        if caller != &self.owner {
            return Err(CrowdsaleError::Unauthorized { caller: *caller });
        }
        if new_owner.is_zero() {
            return Err(CrowdsaleError::InvalidConfiguration(
                "new owner is the zero address".into(),
            ));
        }

        let previous_owner = self.owner;
        self.owner = *new_owner;

        tracing::info!(%previous_owner, %new_owner, "crowdsale ownership transferred");
        self.events.push(CrowdsaleEvent::OwnershipTransferred {
            previous_owner,
            new_owner: *new_owner,
        });
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<CrowdsaleEvent> {
        std::mem::take(&mut self.events)
    }
}
