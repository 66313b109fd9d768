// crowdsale/src/window.rs

use crate::{rate::PricingPhase, CrowdsaleError, CrowdsaleResult};
use chain_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a timestamp falls relative to the sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalePhase {
    BeforeStart,
    Presale,
    Tokensale,
    General,
    Ended,
}

impl SalePhase {
    /// Pricing tier for an open phase
    pub fn pricing(&self) -> Option<PricingPhase> {
        match self {
            SalePhase::Presale => Some(PricingPhase::Presale),
            SalePhase::Tokensale => Some(PricingPhase::Tokensale),
            SalePhase::General => Some(PricingPhase::General),
            SalePhase::BeforeStart | SalePhase::Ended => None,
        }
    }
}

impl fmt::Display for SalePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SalePhase::BeforeStart => "before-start",
            SalePhase::Presale => "presale",
            SalePhase::Tokensale => "tokensale",
            SalePhase::General => "general",
            SalePhase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Sale timing, fixed at construction.
///
/// All windows are half-open `[from, to)`. The presale and token sale are
/// sub-windows of the overall `[start, end)` span:
/// `start <= presale_start <= presale_end <= tokensale_start <= tokensale_end <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWindow {
    start: Timestamp,
    end: Timestamp,
    presale_start: Timestamp,
    presale_end: Timestamp,
    tokensale_start: Timestamp,
    tokensale_end: Timestamp,
}

impl SaleWindow {
    pub fn new(
        start: Timestamp,
        end: Timestamp,
        presale_start: Timestamp,
        presale_end: Timestamp,
        tokensale_start: Timestamp,
        tokensale_end: Timestamp,
    ) -> CrowdsaleResult<Self> {
        if end <= start {
            return Err(CrowdsaleError::InvalidConfiguration(format!(
                "end time {} must be after start time {}",
                end, start
            )));
        }

        let ordered = [
            ("start", start),
            ("presale start", presale_start),
            ("presale end", presale_end),
            ("tokensale start", tokensale_start),
            ("tokensale end", tokensale_end),
            ("end", end),
        ];
        for pair in ordered.windows(2) {
            let (earlier_name, earlier) = pair[0];
            let (later_name, later) = pair[1];
            if earlier > later {
                return Err(CrowdsaleError::InvalidConfiguration(format!(
                    "{} ({}) is after {} ({})",
                    earlier_name, earlier, later_name, later
                )));
            }
        }

        Ok(Self {
            start,
            end,
            presale_start,
            presale_end,
            tokensale_start,
            tokensale_end,
        })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn presale(&self) -> (Timestamp, Timestamp) {
        (self.presale_start, self.presale_end)
    }

    pub fn tokensale(&self) -> (Timestamp, Timestamp) {
        (self.tokensale_start, self.tokensale_end)
    }

    /// `start <= now < end`
    pub fn is_open(&self, now: Timestamp) -> bool {
        self.start <= now && now < self.end
    }

    pub fn in_presale(&self, now: Timestamp) -> bool {
        self.presale_start <= now && now < self.presale_end
    }

    pub fn in_tokensale(&self, now: Timestamp) -> bool {
        self.tokensale_start <= now && now < self.tokensale_end
    }

    pub fn is_over(&self, now: Timestamp) -> bool {
        now >= self.end
    }

    /// Resolve the phase at `now`; sub-windows take precedence over the
    /// general span
    pub fn phase_at(&self, now: Timestamp) -> SalePhase {
        if now < self.start {
            SalePhase::BeforeStart
        } else if self.is_over(now) {
            SalePhase::Ended
        } else if self.in_presale(now) {
            SalePhase::Presale
        } else if self.in_tokensale(now) {
            SalePhase::Tokensale
        } else {
            SalePhase::General
        }
    }
}
