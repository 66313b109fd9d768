// crowdsale/src/config.rs

use crate::{controller::CrowdsaleParams, CrowdsaleResult};
use chain_core::{Address, Amount, Timestamp, DECIMALS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use token::TokenMetadata;

/// Network whose start times are pulled forward to "now + 60s"
pub const DEVELOPMENT_NETWORK: &str = "development";

/// Delay applied to development start times
pub const DEVELOPMENT_START_DELAY: u64 = 60;

/// File names looked up inside a resolved config directory, in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["crowdsale.json", "crowdsale.toml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfig {
    /// General sale tokens per unit
    pub base: u64,
}

/// Per-network deployment parameters.
///
/// Monetary quantities are decimal whole units (`cap = 245454` means
/// 245454 × 10^18 base units); token quantities are scaled by the token's
/// decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdsaleConfig {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub presale_start_time: Timestamp,
    pub presale_end_time: Timestamp,
    pub tokensale_start_time: Timestamp,
    pub tokensale_end_time: Timestamp,
    pub cap: Decimal,
    pub token_cap: Decimal,
    pub initial_fund_balance: Decimal,
    pub initial_premium_balance: Decimal,
    pub goal: Decimal,
    pub rate: RateConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenMetadata>,
}

impl CrowdsaleConfig {
    /// Parse a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") => toml::from_str(&contents)?,
            _ => anyhow::bail!("unsupported config format: {}", path.display()),
        };
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            _ => anyhow::bail!("unsupported config format: {}", path.display()),
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `<config_dir>/<network>` when that directory exists, else `config_dir`
    pub fn resolve_dir(config_dir: impl AsRef<Path>, network: &str) -> PathBuf {
        let config_dir = config_dir.as_ref();
        let network_dir = config_dir.join(network);
        if network_dir.is_dir() {
            network_dir
        } else {
            config_dir.to_path_buf()
        }
    }

    /// Resolve the network directory, read the first config file found there
    /// and apply the development overrides when `network` asks for them
    pub fn load(
        config_dir: impl AsRef<Path>,
        network: &str,
        now: Timestamp,
    ) -> anyhow::Result<Self> {
        let dir = Self::resolve_dir(config_dir, network);
        tracing::info!(config_dir = %dir.display(), network, "loading crowdsale config");

        let path = CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| anyhow::anyhow!("no crowdsale config in {}", dir.display()))?;

        let mut config = Self::from_file(&path)?;
        if network == DEVELOPMENT_NETWORK {
            config.apply_development_overrides(now);
        }
        Ok(config)
    }

    /// Open the sale (and its presale) a minute from `now`
    pub fn apply_development_overrides(&mut self, now: Timestamp) {
        let start = now + DEVELOPMENT_START_DELAY;
        self.start_time = start;
        self.presale_start_time = start;
        tracing::info!(start_time = start, "development start time override");
    }

    pub fn metadata(&self) -> TokenMetadata {
        self.token.clone().unwrap_or_default()
    }

    /// Resolve into construction values for the given wallets
    pub fn to_params(
        &self,
        wallet: Address,
        premium_wallet: Address,
    ) -> CrowdsaleResult<CrowdsaleParams> {
        let token_decimals = self.metadata().decimals;

        Ok(CrowdsaleParams {
            start_time: self.start_time,
            end_time: self.end_time,
            presale_start_time: self.presale_start_time,
            presale_end_time: self.presale_end_time,
            tokensale_start_time: self.tokensale_start_time,
            tokensale_end_time: self.tokensale_end_time,
            base_rate: self.rate.base,
            wallet,
            premium_wallet,
            cap: Amount::from_decimal(self.cap, DECIMALS)?,
            token_cap: Amount::from_decimal(self.token_cap, token_decimals)?,
            initial_fund_balance: Amount::from_decimal(self.initial_fund_balance, token_decimals)?,
            initial_premium_balance: Amount::from_decimal(
                self.initial_premium_balance,
                token_decimals,
            )?,
            goal: Amount::from_decimal(self.goal, DECIMALS)?,
        })
    }
}
