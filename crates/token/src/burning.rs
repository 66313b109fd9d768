// token/src/burning.rs

use chain_core::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Burn record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRecord {
    /// Holder whose balance was burned
    pub burner: Address,
    /// Amount destroyed
    pub amount: Amount,
    /// Total supply right after the burn
    pub supply_after: Amount,
}

/// Append-only log of burns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurnHistory {
    records: Vec<BurnRecord>,
    total_burned: Amount,
}

impl BurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, burner: Address, amount: Amount, supply_after: Amount) {
        self.total_burned = self.total_burned.clone() + amount.clone();
        self.records.push(BurnRecord {
            burner,
            amount,
            supply_after,
        });
    }

    /// Get total burned amount
    pub fn total_burned(&self) -> &Amount {
        &self.total_burned
    }

    pub fn records(&self) -> &[BurnRecord] {
        &self.records
    }

    /// Sum of burns by a single holder
    pub fn burned_by(&self, burner: &Address) -> Amount {
        self.records
            .iter()
            .filter(|r| &r.burner == burner)
            .map(|r| r.amount.clone())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_history_totals() {
        let mut history = BurnHistory::new();
        let a = Address::from_index(1);
        let b = Address::from_index(2);

        history.record(a, Amount::from_u64(10), Amount::from_u64(90));
        history.record(b, Amount::from_u64(5), Amount::from_u64(85));
        history.record(a, Amount::from_u64(1), Amount::from_u64(84));

        assert_eq!(history.total_burned(), &Amount::from_u64(16));
        assert_eq!(history.burned_by(&a), Amount::from_u64(11));
        assert_eq!(history.records().len(), 3);
        assert_eq!(history.records()[2].supply_after, Amount::from_u64(84));
    }
}
