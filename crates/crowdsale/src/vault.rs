// crowdsale/src/vault.rs

use chain_core::{Address, Amount, ChainError, ValueLedger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vault lifecycle: `Active` until settlement, then exactly one of the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultState {
    Active,
    /// Funds forwarded to the wallet
    Closed,
    Refunding,
}

/// Errors raised by the vault
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Unauthorized vault caller: {caller}")]
    Unauthorized { caller: Address },

    #[error("Vault not accepting deposits (state {0:?})")]
    InvalidState(VaultState),

    #[error("Vault already settled (state {0:?})")]
    AlreadyFinalized(VaultState),

    #[error("Refunds not allowed (state {0:?})")]
    RefundsNotAllowed(VaultState),

    #[error("Ledger error: {0}")]
    Chain(#[from] ChainError),
}

/// Vault events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Closed { wallet: Address, amount: Amount },
    RefundsEnabled,
    Refunded { beneficiary: Address, amount: Amount },
}

/// Escrow for contributions until the sale settles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundVault {
    /// Account in the value ledger holding escrowed funds
    address: Address,
    /// Only the owner (the sale controller) may drive the vault
    owner: Address,
    /// Receives all funds on close
    wallet: Address,
    state: VaultState,
    deposited: HashMap<Address, Amount>,
    total_deposited: Amount,
    events: Vec<VaultEvent>,
}

impl RefundVault {
    pub fn new(address: Address, owner: Address, wallet: Address) -> Self {
        Self {
            address,
            owner,
            wallet,
            state: VaultState::Active,
            deposited: HashMap::new(),
            total_deposited: Amount::zero(),
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn wallet(&self) -> &Address {
        &self.wallet
    }

    pub fn state(&self) -> VaultState {
        self.state
    }

    /// Value still owed to `contributor` (zero once refunded)
    pub fn deposited_of(&self, contributor: &Address) -> Amount {
        self.deposited
            .get(contributor)
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    /// Cumulative deposits, unaffected by refunds
    pub fn total_deposited(&self) -> &Amount {
        &self.total_deposited
    }

    /// Fails unless deposits are currently accepted
    pub fn ensure_active(&self) -> Result<(), VaultError> {
        if self.state != VaultState::Active {
            return Err(VaultError::InvalidState(self.state));
        }
        Ok(())
    }

    /// Move `amount` from `contributor` into escrow and record it
    pub fn deposit(
        &mut self,
        funds: &mut ValueLedger,
        caller: &Address,
        contributor: &Address,
        amount: &Amount,
    ) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        self.ensure_active()?;

        funds.transfer(contributor, &self.address, amount)?;

        let recorded = self.deposited_of(contributor) + amount.clone();
        self.deposited.insert(*contributor, recorded);
        self.total_deposited = self.total_deposited.clone() + amount.clone();
        Ok(())
    }

    /// Forward everything escrowed to the wallet
    pub fn close(&mut self, funds: &mut ValueLedger, caller: &Address) -> Result<Amount, VaultError> {
        self.ensure_owner(caller)?;
        self.ensure_unsettled()?;

        let amount = self.total_deposited.clone();
        funds.transfer(&self.address, &self.wallet, &amount)?;
        self.state = VaultState::Closed;

        tracing::info!(wallet = %self.wallet, %amount, "vault closed, funds forwarded");
        self.events.push(VaultEvent::Closed {
            wallet: self.wallet,
            amount: amount.clone(),
        });
        Ok(amount)
    }

    pub fn enable_refunds(&mut self, caller: &Address) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        self.ensure_unsettled()?;

        self.state = VaultState::Refunding;

        tracing::info!(total = %self.total_deposited, "vault refunds enabled");
        self.events.push(VaultEvent::RefundsEnabled);
        Ok(())
    }

    /// Pay `contributor` back exactly what they deposited. A second claim,
    /// or a claim by someone who never deposited, pays zero.
    pub fn refund(
        &mut self,
        funds: &mut ValueLedger,
        caller: &Address,
        contributor: &Address,
    ) -> Result<Amount, VaultError> {
        self.ensure_owner(caller)?;
        if self.state != VaultState::Refunding {
            return Err(VaultError::RefundsNotAllowed(self.state));
        }

        let amount = self.deposited_of(contributor);
        if amount.is_zero() {
            return Ok(amount);
        }

        funds.transfer(&self.address, contributor, &amount)?;
        self.deposited.insert(*contributor, Amount::zero());

        tracing::info!(beneficiary = %contributor, %amount, "refunded");
        self.events.push(VaultEvent::Refunded {
            beneficiary: *contributor,
            amount: amount.clone(),
        });
        Ok(amount)
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), VaultError> {
        if caller != &self.owner {
            return Err(VaultError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    fn ensure_unsettled(&self) -> Result<(), VaultError> {
        if self.state != VaultState::Active {
            return Err(VaultError::AlreadyFinalized(self.state));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        vault: RefundVault,
        funds: ValueLedger,
        owner: Address,
        wallet: Address,
        investor: Address,
    }

    fn fixture() -> Fixture {
        let owner = Address::from_index(10);
        let wallet = Address::from_index(11);
        let investor = Address::from_index(12);
        let vault = RefundVault::new(Address::from_index(99), owner, wallet);

        let mut funds = ValueLedger::new();
        funds.credit(&investor, &Amount::from_whole(100));

        Fixture {
            vault,
            funds,
            owner,
            wallet,
            investor,
        }
    }

    #[test]
    fn test_deposit_records_and_escrows() {
        let mut f = fixture();
        f.vault
            .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(10))
            .unwrap();
        f.vault
            .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(5))
            .unwrap();

        assert_eq!(f.vault.deposited_of(&f.investor), Amount::from_whole(15));
        assert_eq!(f.vault.total_deposited(), &Amount::from_whole(15));
        assert_eq!(f.funds.balance_of(f.vault.address()), Amount::from_whole(15));
        assert_eq!(f.funds.balance_of(&f.investor), Amount::from_whole(85));
    }

    #[test]
    fn test_deposit_requires_owner() {
        let mut f = fixture();
        let err = f
            .vault
            .deposit(&mut f.funds, &f.investor, &f.investor, &Amount::from_whole(1))
            .unwrap_err();
        assert_eq!(err, VaultError::Unauthorized { caller: f.investor });
    }

    #[test]
    fn test_deposit_without_funds_changes_nothing() {
        let mut f = fixture();
        let err = f
            .vault
            .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(101))
            .unwrap_err();
        assert!(matches!(err, VaultError::Chain(ChainError::InsufficientBalance { .. })));
        assert!(f.vault.deposited_of(&f.investor).is_zero());
        assert_eq!(f.funds.balance_of(&f.investor), Amount::from_whole(100));
    }

    #[test]
    fn test_close_forwards_everything() {
        let mut f = fixture();
        f.vault
            .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(10))
            .unwrap();

        let forwarded = f.vault.close(&mut f.funds, &f.owner).unwrap();
        assert_eq!(forwarded, Amount::from_whole(10));
        assert_eq!(f.funds.balance_of(&f.wallet), Amount::from_whole(10));
        assert!(f.funds.balance_of(f.vault.address()).is_zero());
        assert_eq!(f.vault.state(), VaultState::Closed);
        assert_eq!(
            f.vault.drain_events(),
            vec![VaultEvent::Closed {
                wallet: f.wallet,
                amount: Amount::from_whole(10)
            }]
        );
    }

    #[test]
    fn test_settlement_is_one_shot() {
        let mut f = fixture();
        f.vault.close(&mut f.funds, &f.owner).unwrap();

        assert_eq!(
            f.vault.close(&mut f.funds, &f.owner),
            Err(VaultError::AlreadyFinalized(VaultState::Closed))
        );
        assert_eq!(
            f.vault.enable_refunds(&f.owner),
            Err(VaultError::AlreadyFinalized(VaultState::Closed))
        );
        assert_eq!(
            f.vault
                .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(1)),
            Err(VaultError::InvalidState(VaultState::Closed))
        );
    }

    #[test]
    fn test_refund_exactly_once() {
        let mut f = fixture();
        f.vault
            .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(9))
            .unwrap();
        f.vault.enable_refunds(&f.owner).unwrap();

        let paid = f.vault.refund(&mut f.funds, &f.owner, &f.investor).unwrap();
        assert_eq!(paid, Amount::from_whole(9));
        assert_eq!(f.funds.balance_of(&f.investor), Amount::from_whole(100));

        let again = f.vault.refund(&mut f.funds, &f.owner, &f.investor).unwrap();
        assert!(again.is_zero());
        assert_eq!(f.funds.balance_of(&f.investor), Amount::from_whole(100));
    }

    #[test]
    fn test_refund_to_non_contributor_pays_zero() {
        let mut f = fixture();
        f.vault.enable_refunds(&f.owner).unwrap();

        let stranger = Address::from_index(77);
        let paid = f.vault.refund(&mut f.funds, &f.owner, &stranger).unwrap();
        assert!(paid.is_zero());
        assert!(f.funds.balance_of(&stranger).is_zero());
    }

    #[test]
    fn test_vault_json_round_trip() {
        let mut f = fixture();
        f.vault
            .deposit(&mut f.funds, &f.owner, &f.investor, &Amount::from_whole(3))
            .unwrap();

        let json = serde_json::to_string(&f.vault).unwrap();
        let back: RefundVault = serde_json::from_str(&json).unwrap();
        assert_eq!(back.deposited_of(&f.investor), Amount::from_whole(3));
        assert_eq!(back.state(), VaultState::Active);
    }

    #[test]
    fn test_refund_not_allowed_unless_refunding() {
        let mut f = fixture();
        assert_eq!(
            f.vault.refund(&mut f.funds, &f.owner, &f.investor),
            Err(VaultError::RefundsNotAllowed(VaultState::Active))
        );

        f.vault.close(&mut f.funds, &f.owner).unwrap();
        assert_eq!(
            f.vault.refund(&mut f.funds, &f.owner, &f.investor),
            Err(VaultError::RefundsNotAllowed(VaultState::Closed))
        );
    }
}
