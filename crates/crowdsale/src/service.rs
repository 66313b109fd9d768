// crowdsale/src/service.rs

use crate::{
    controller::{Crowdsale, PurchaseReceipt, Quote, Settlement},
    events::CrowdsaleEvent,
    window::SalePhase,
    CrowdsaleResult,
};
use chain_core::{Address, Amount, Clock, ValueLedger};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Controller plus the value ledger it settles against
#[derive(Debug)]
struct SaleState {
    sale: Crowdsale,
    funds: ValueLedger,
}

/// Shared handle to one sale.
///
/// Every operation takes the single lock, reads the clock once and runs the
/// synchronous controller operation to completion, so cap checks and the
/// mutations that follow them can never interleave.
#[derive(Clone)]
pub struct SaleService {
    state: Arc<Mutex<SaleState>>,
    clock: Arc<dyn Clock>,
}

impl SaleService {
    pub fn new(sale: Crowdsale, funds: ValueLedger, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SaleState { sale, funds })),
            clock,
        }
    }

    pub async fn buy_tokens(
        &self,
        purchaser: Address,
        beneficiary: Address,
        value: Amount,
    ) -> CrowdsaleResult<PurchaseReceipt> {
        let mut guard = self.state.lock().await;
        let now = self.clock.now();
        let SaleState { sale, funds } = &mut *guard;
        sale.buy_tokens(funds, &purchaser, &beneficiary, &value, now)
    }

    pub async fn receive(&self, sender: Address, value: Amount) -> CrowdsaleResult<PurchaseReceipt> {
        self.buy_tokens(sender, sender, value).await
    }

    pub async fn finalize(&self, caller: Address) -> CrowdsaleResult<Settlement> {
        let mut guard = self.state.lock().await;
        let now = self.clock.now();
        let SaleState { sale, funds } = &mut *guard;
        sale.finalize(funds, &caller, now)
    }

    pub async fn claim_refund(&self, caller: Address) -> CrowdsaleResult<Amount> {
        let mut guard = self.state.lock().await;
        let SaleState { sale, funds } = &mut *guard;
        sale.claim_refund(funds, &caller)
    }

    pub async fn burn(&self, caller: Address, amount: Amount) -> CrowdsaleResult<()> {
        let mut guard = self.state.lock().await;
        guard.sale.token_mut().burn(&caller, &amount)?;
        Ok(())
    }

    pub async fn quote(&self, value: Amount) -> CrowdsaleResult<Quote> {
        let guard = self.state.lock().await;
        guard.sale.quote(&value, self.clock.now())
    }

    pub async fn has_ended(&self) -> bool {
        let guard = self.state.lock().await;
        guard.sale.has_ended(self.clock.now())
    }

    pub async fn current_phase(&self) -> SalePhase {
        let guard = self.state.lock().await;
        guard.sale.current_phase(self.clock.now())
    }

    pub async fn raised(&self) -> Amount {
        self.state.lock().await.sale.raised().clone()
    }

    pub async fn total_supply(&self) -> Amount {
        self.state.lock().await.sale.token().total_supply().clone()
    }

    pub async fn token_balance(&self, holder: Address) -> Amount {
        self.state.lock().await.sale.token().balance_of(&holder)
    }

    pub async fn value_balance(&self, account: Address) -> Amount {
        self.state.lock().await.funds.balance_of(&account)
    }

    /// Fund an account in the value ledger
    pub async fn credit(&self, account: Address, amount: Amount) {
        self.state.lock().await.funds.credit(&account, &amount);
    }

    pub async fn drain_events(&self) -> Vec<CrowdsaleEvent> {
        self.state.lock().await.sale.drain_events()
    }

    /// Clone of the controller as it stands
    pub async fn snapshot(&self) -> Crowdsale {
        self.state.lock().await.sale.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CrowdsaleError, CrowdsaleParams};
    use chain_core::ManualClock;

    fn params(cap_units: u64) -> CrowdsaleParams {
        CrowdsaleParams {
            start_time: 1_000,
            end_time: 5_000,
            presale_start_time: 1_000,
            presale_end_time: 2_000,
            tokensale_start_time: 3_000,
            tokensale_end_time: 4_000,
            base_rate: 1100,
            wallet: Address::from_index(2),
            premium_wallet: Address::from_index(3),
            cap: Amount::from_whole(cap_units),
            token_cap: Amount::from_whole(1_000_000_000),
            initial_fund_balance: Amount::from_whole(700_000_000),
            initial_premium_balance: Amount::from_whole(30_000_000),
            goal: Amount::from_whole(10),
        }
    }

    fn service(cap_units: u64, clock: Arc<ManualClock>) -> SaleService {
        let sale = Crowdsale::new(Address::from_index(1), params(cap_units)).unwrap();
        SaleService::new(sale, ValueLedger::new(), clock)
    }

    #[tokio::test]
    async fn test_concurrent_buyers_never_exceed_cap() {
        let clock = Arc::new(ManualClock::new(1_000));
        let service = service(10, clock);

        let buyers: Vec<Address> = (100..120).map(Address::from_index).collect();
        for buyer in &buyers {
            service.credit(*buyer, Amount::from_whole(1)).await;
        }

        let handles: Vec<_> = buyers
            .iter()
            .map(|buyer| {
                let service = service.clone();
                let buyer = *buyer;
                tokio::spawn(async move { service.receive(buyer, Amount::from_whole(1)).await })
            })
            .collect();

        let mut accepted = 0;
        let mut capped = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(CrowdsaleError::CapExceeded { .. }) => capped += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(capped, 10);
        assert_eq!(service.raised().await, Amount::from_whole(10));
        assert_eq!(
            service.total_supply().await,
            Amount::from_whole(730_000_000 + 10 * 1650)
        );
    }

    #[tokio::test]
    async fn test_clock_drives_lifecycle() {
        let clock = Arc::new(ManualClock::new(500));
        let service = service(245_454, clock.clone());
        let investor = Address::from_index(4);
        service.credit(investor, Amount::from_whole(20)).await;

        assert_eq!(service.current_phase().await, SalePhase::BeforeStart);
        assert!(matches!(
            service.receive(investor, Amount::from_whole(1)).await,
            Err(CrowdsaleError::NotOpen { .. })
        ));

        clock.set(3_500);
        assert_eq!(service.current_phase().await, SalePhase::Tokensale);
        service.receive(investor, Amount::from_whole(10)).await.unwrap();
        assert_eq!(
            service.finalize(Address::from_index(1)).await,
            Err(CrowdsaleError::NotEnded)
        );

        clock.advance(1_500);
        assert!(service.has_ended().await);
        assert_eq!(
            service.finalize(Address::from_index(1)).await,
            Ok(Settlement::Forwarded {
                amount: Amount::from_whole(10)
            })
        );
        assert_eq!(
            service.value_balance(Address::from_index(2)).await,
            Amount::from_whole(10)
        );
        assert_eq!(
            service.drain_events().await.last(),
            Some(&CrowdsaleEvent::Finalized)
        );
    }

    #[tokio::test]
    async fn test_burn_own_balance() {
        let clock = Arc::new(ManualClock::new(1_000));
        let service = service(245_454, clock);
        let premium = Address::from_index(3);

        service.burn(premium, Amount::from_whole(1_000)).await.unwrap();
        assert_eq!(
            service.token_balance(premium).await,
            Amount::from_whole(29_999_000)
        );
        assert!(service
            .burn(Address::from_index(9), Amount::from_whole(1))
            .await
            .is_err());
    }
}
