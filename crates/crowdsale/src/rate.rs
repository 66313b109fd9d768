// crowdsale/src/rate.rs

use crate::{CrowdsaleError, CrowdsaleResult};
use chain_core::Amount;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Basis points denominator
pub const BPS: u64 = 10_000;

/// Rates carry two basis-point factors, so they are scaled by 10^8
pub const RATE_SCALE: u64 = BPS * BPS;

/// Presale base rate is the general rate × 1.5
pub const PRESALE_PREMIUM_BPS: u64 = 15_000;

/// Pricing tier of an accepted contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingPhase {
    Presale,
    Tokensale,
    General,
}

/// Volume discount tier: contributions of at least `threshold` are priced
/// entirely at `multiplier_bps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub threshold: Amount,
    pub multiplier_bps: u64,
}

impl VolumeTier {
    pub fn new(threshold: Amount, multiplier_bps: u64) -> Self {
        Self {
            threshold,
            multiplier_bps,
        }
    }
}

/// Tokens per smallest value unit, scaled by [`RATE_SCALE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rate(u128);

impl Rate {
    pub fn from_scaled(scaled: u128) -> Self {
        Self(scaled)
    }

    /// Whole-number rate (e.g. 1650 tokens per unit)
    pub fn from_whole(tokens_per_unit: u64) -> Self {
        Self(tokens_per_unit as u128 * RATE_SCALE as u128)
    }

    pub fn scaled(&self) -> u128 {
        self.0
    }

    /// Exact decimal form, e.g. `1815` or `1815.5`
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.0 as i128, 8).normalize()
    }

    /// `value × rate`, truncated to the smallest token unit
    pub fn apply(&self, value: &Amount) -> Amount {
        Amount::new(value.inner() * BigUint::from(self.0) / BigUint::from(RATE_SCALE))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Maps (phase, contribution) to a token rate.
///
/// Pure: quoting never mutates anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSchedule {
    base_rate: u64,
    presale_premium_bps: u64,
    /// Sorted by descending threshold
    tiers: Vec<VolumeTier>,
}

impl RateSchedule {
    /// Schedule with the standard volume tiers:
    /// ≥300 units → ×1.2, ≥150 units → ×1.1
    pub fn new(base_rate: u64) -> CrowdsaleResult<Self> {
        Self::with_tiers(
            base_rate,
            PRESALE_PREMIUM_BPS,
            vec![
                VolumeTier::new(Amount::from_whole(300), 12_000),
                VolumeTier::new(Amount::from_whole(150), 11_000),
            ],
        )
    }

    pub fn with_tiers(
        base_rate: u64,
        presale_premium_bps: u64,
        mut tiers: Vec<VolumeTier>,
    ) -> CrowdsaleResult<Self> {
        if base_rate == 0 {
            return Err(CrowdsaleError::InvalidConfiguration(
                "base rate must be positive".into(),
            ));
        }
        if presale_premium_bps == 0 || tiers.iter().any(|t| t.multiplier_bps == 0) {
            return Err(CrowdsaleError::InvalidConfiguration(
                "rate multipliers must be positive".into(),
            ));
        }
        tiers.sort_by(|a, b| b.threshold.cmp(&a.threshold));

        Ok(Self {
            base_rate,
            presale_premium_bps,
            tiers,
        })
    }

    /// General / token sale rate in tokens per unit
    pub fn base_rate(&self) -> u64 {
        self.base_rate
    }

    pub fn tiers(&self) -> &[VolumeTier] {
        &self.tiers
    }

    /// Phase multiplier applied before any volume discount
    pub fn phase_multiplier_bps(&self, phase: PricingPhase) -> u64 {
        match phase {
            PricingPhase::Presale => self.presale_premium_bps,
            PricingPhase::Tokensale | PricingPhase::General => BPS,
        }
    }

    /// Largest tier whose threshold is ≤ `value`. The general window
    /// outside both sub-phases gets no volume discount.
    pub fn volume_multiplier_bps(&self, phase: PricingPhase, value: &Amount) -> u64 {
        if phase == PricingPhase::General {
            return BPS;
        }
        self.tiers
            .iter()
            .find(|tier| value >= &tier.threshold)
            .map(|tier| tier.multiplier_bps)
            .unwrap_or(BPS)
    }

    /// Rate for a single contribution of `value`
    pub fn rate_for(&self, phase: PricingPhase, value: &Amount) -> Rate {
        let scaled = self.base_rate as u128
            * self.phase_multiplier_bps(phase) as u128
            * self.volume_multiplier_bps(phase, value) as u128;
        Rate::from_scaled(scaled)
    }

    /// Tokens minted for a contribution of `value`
    pub fn token_amount(&self, phase: PricingPhase, value: &Amount) -> Amount {
        let rate = self.rate_for(phase, value);
        let amount = rate.apply(value);
        tracing::debug!(?phase, %value, %rate, %amount, "priced contribution");
        amount
    }
}
