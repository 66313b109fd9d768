// chain-core/src/state.rs

use crate::{types::*, Address, ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Native-currency account book.
///
/// Holds the value balances that contributions are paid from and refunds
/// are paid back to. Every mutation is journaled so a failed operation can
/// be rolled back to the last checkpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueLedger {
    /// Balances mapping
    balances: HashMap<Address, Amount>,
    /// Journal of balance changes since the outermost checkpoint
    modifications: Vec<LedgerModification>,
}

impl ValueLedger {
    /// Create new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Get balance (zero for unknown addresses)
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances
            .get(address)
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    /// Sum of every balance
    pub fn total(&self) -> Amount {
        self.balances.values().cloned().sum()
    }

    /// Add value to an account out of thin air (genesis funding)
    pub fn credit(&mut self, address: &Address, amount: &Amount) {
        let new_balance = self.balance_of(address) + amount.clone();
        self.set_balance(*address, new_balance);
    }

    /// Move value between accounts
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: &Amount) -> ChainResult<()> {
        let from_balance = self.balance_of(from);
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or_else(|| ChainError::InsufficientBalance {
                required: amount.clone(),
                available: from_balance.clone(),
            })?;

        self.set_balance(*from, new_from);
        let new_to = self.balance_of(to) + amount.clone();
        self.set_balance(*to, new_to);

        tracing::trace!(%from, %to, %amount, "value transferred");
        Ok(())
    }

    /// Begin transaction (checkpoint)
    pub fn checkpoint(&mut self) {
        self.modifications.push(LedgerModification::Checkpoint);
    }

    /// Commit transaction.
    ///
    /// Entries of a nested checkpoint are folded into the enclosing one so an
    /// outer rollback still restores them; the journal empties once the
    /// outermost checkpoint commits.
    pub fn commit(&mut self) {
        let last = self
            .modifications
            .iter()
            .rposition(|entry| matches!(entry, LedgerModification::Checkpoint));
        if let Some(index) = last {
            self.modifications.remove(index);
        }
        if !self
            .modifications
            .iter()
            .any(|entry| matches!(entry, LedgerModification::Checkpoint))
        {
            self.modifications.clear();
        }
    }

    /// Rollback transaction
    pub fn rollback(&mut self) {
        while let Some(entry) = self.modifications.pop() {
            match entry {
                LedgerModification::Checkpoint => break,
                LedgerModification::BalanceSet { address, old_balance } => {
                    match old_balance {
                        Some(old) => self.balances.insert(address, old),
                        None => self.balances.remove(&address),
                    };
                }
            }
        }
    }

    /// Run `op` inside a checkpoint: commit on success, roll back on error
    pub fn atomically<T, E>(
        &mut self,
        op: impl FnOnce(&mut ValueLedger) -> Result<T, E>,
    ) -> Result<T, E> {
        self.checkpoint();
        match op(self) {
            Ok(value) => {
                self.commit();
                Ok(value)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn set_balance(&mut self, address: Address, balance: Amount) {
        self.record_modification(address);
        self.balances.insert(address, balance);
    }

    /// Record the pre-checkpoint balance of `address` unless already recorded.
    /// Nothing is journaled outside a checkpoint.
    fn record_modification(&mut self, address: Address) {
        if self.modifications.is_empty() {
            return;
        }
        for entry in self.modifications.iter().rev() {
            match entry {
                LedgerModification::Checkpoint => break,
                LedgerModification::BalanceSet { address: a, .. } if *a == address => return,
                _ => {}
            }
        }

        let old = self.balances.get(&address).cloned();
        self.modifications.push(LedgerModification::BalanceSet {
            address,
            old_balance: old,
        });
    }
}

/// Journal entry for rollback support
#[derive(Debug, Clone, Serialize, Deserialize)]
enum LedgerModification {
    Checkpoint,
    BalanceSet {
        address: Address,
        old_balance: Option<Amount>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer() {
        let mut ledger = ValueLedger::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);

        ledger.credit(&a, &Amount::from_u64(1000));
        ledger.transfer(&a, &b, &Amount::from_u64(300)).unwrap();

        assert_eq!(ledger.balance_of(&a), Amount::from_u64(700));
        assert_eq!(ledger.balance_of(&b), Amount::from_u64(300));
        assert_eq!(ledger.total(), Amount::from_u64(1000));
    }

    #[test]
    fn test_transfer_insufficient() {
        let mut ledger = ValueLedger::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        ledger.credit(&a, &Amount::from_u64(10));

        let err = ledger.transfer(&a, &b, &Amount::from_u64(11)).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(&a), Amount::from_u64(10));
        assert!(ledger.balance_of(&b).is_zero());
    }

    #[test]
    fn test_rollback_restores_balances() {
        let mut ledger = ValueLedger::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        ledger.credit(&a, &Amount::from_u64(100));

        ledger.checkpoint();
        ledger.transfer(&a, &b, &Amount::from_u64(40)).unwrap();
        ledger.transfer(&a, &b, &Amount::from_u64(40)).unwrap();
        ledger.rollback();

        assert_eq!(ledger.balance_of(&a), Amount::from_u64(100));
        assert!(ledger.balance_of(&b).is_zero());
    }

    #[test]
    fn test_outer_rollback_undoes_committed_inner_checkpoint() {
        let mut ledger = ValueLedger::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        ledger.credit(&a, &Amount::from_u64(100));

        ledger.checkpoint();
        ledger.checkpoint();
        ledger.transfer(&a, &b, &Amount::from_u64(40)).unwrap();
        ledger.commit();
        ledger.rollback();

        assert_eq!(ledger.balance_of(&a), Amount::from_u64(100));
        assert!(ledger.balance_of(&b).is_zero());
    }

    #[test]
    fn test_nested_rollback_keeps_outer_changes() {
        let mut ledger = ValueLedger::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        ledger.credit(&a, &Amount::from_u64(100));

        ledger.checkpoint();
        ledger.transfer(&a, &b, &Amount::from_u64(10)).unwrap();
        ledger.checkpoint();
        ledger.transfer(&a, &b, &Amount::from_u64(20)).unwrap();
        ledger.rollback();
        assert_eq!(ledger.balance_of(&b), Amount::from_u64(10));

        ledger.commit();
        assert!(ledger.modifications.is_empty());
        assert_eq!(ledger.balance_of(&a), Amount::from_u64(90));
    }

    #[test]
    fn test_atomically_commits_and_rolls_back() {
        let mut ledger = ValueLedger::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);
        ledger.credit(&a, &Amount::from_u64(100));

        let ok: ChainResult<()> =
            ledger.atomically(|l| l.transfer(&a, &b, &Amount::from_u64(30)));
        assert!(ok.is_ok());
        assert_eq!(ledger.balance_of(&b), Amount::from_u64(30));

        let failed: ChainResult<()> = ledger.atomically(|l| {
            l.transfer(&a, &b, &Amount::from_u64(50))?;
            l.transfer(&a, &b, &Amount::from_u64(50))
        });
        assert!(failed.is_err());
        assert_eq!(ledger.balance_of(&a), Amount::from_u64(70));
        assert_eq!(ledger.balance_of(&b), Amount::from_u64(30));
    }
}
