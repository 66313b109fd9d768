// chain-core/src/types.rs

use crate::{ChainError, ChainResult};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::str::FromStr;

/// Timestamp in Unix epoch seconds
pub type Timestamp = u64;

/// Decimal places of both the sale currency and the token
pub const DECIMALS: u32 = 18;

/// Amount in the smallest unit (arbitrary precision)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(BigUint);

impl Amount {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(BigUint::from(value))
    }

    /// Whole units scaled by 10^18 (1 token = 10^18 base units)
    pub fn from_whole(units: u64) -> Self {
        Self(BigUint::from(units) * BigUint::from(10u64).pow(DECIMALS))
    }

    /// Exact conversion of a decimal whole-unit quantity into base units.
    ///
    /// Fails for negative values and for values carrying more fractional
    /// digits than `decimals`.
    pub fn from_decimal(value: Decimal, decimals: u32) -> ChainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ChainError::InvalidAmount(format!("negative amount {}", value)));
        }
        let scale = value.scale();
        if scale > decimals {
            return Err(ChainError::InvalidAmount(format!(
                "{} has more than {} fractional digits",
                value, decimals
            )));
        }
        let mantissa = value.mantissa().unsigned_abs();
        let factor = BigUint::from(10u64).pow(decimals - scale);
        Ok(Self(BigUint::from(mantissa) * factor))
    }

    /// Parse a decimal whole-unit string such as `"149.99"` into base units
    pub fn parse_whole(s: &str) -> ChainResult<Self> {
        let value = Decimal::from_str(s)
            .map_err(|e| ChainError::InvalidAmount(format!("{}: {}", s, e)))?;
        Self::from_decimal(value, DECIMALS)
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Some(Amount(&self.0 + &other.0))
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or_else(Amount::zero)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc + a)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
