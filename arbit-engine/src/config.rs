use arbit_execution::SwapperConfig;
use arbit_instrument::{Currency, ExchangeId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read engine config: {0}")]
    Io(#[from] std::io::Error),
    #[error("'ex' entry {0:?} is not a known venue or alias")]
    UnknownExchange(String),
}

/// Top-level run mode (spec §6 `mode`), grounded on `original_source`'s `--mode` CLI switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Tri,
    Bf,
    Balance,
    Health,
}

/// Bellman-Ford detector tuning (the `bf_*` keys of spec §6, minus the universe's own anchor
/// list which lives on [`EngineConfig::quote`]/`bf_allowed_quotes`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BfSettings {
    pub fee: Decimal,
    pub min_net: Decimal,
    pub min_net_per_hop: Decimal,
    pub require_topofbook: bool,
    pub min_quote_vol: Decimal,
    pub currencies_limit: usize,
    pub min_hops: usize,
    pub max_hops: usize,
    pub require_quote: bool,
    pub require_dual_quote: bool,
    pub rank_by_liquidity: bool,
    pub revalidate_depth: bool,
    pub depth_levels: usize,
    pub use_ws: bool,
    pub max_book_age_ms: u64,
    pub latency_penalty_bps: Decimal,
    pub top: usize,
}

impl Default for BfSettings {
    fn default() -> Self {
        Self {
            fee: dec!(0.001),
            min_net: dec!(0.1),
            min_net_per_hop: Decimal::ZERO,
            require_topofbook: true,
            min_quote_vol: Decimal::ZERO,
            currencies_limit: 40,
            min_hops: 2,
            max_hops: 4,
            require_quote: true,
            require_dual_quote: false,
            rank_by_liquidity: false,
            revalidate_depth: false,
            depth_levels: 20,
            use_ws: false,
            max_book_age_ms: 1_000,
            latency_penalty_bps: Decimal::ZERO,
            top: 5,
        }
    }
}

/// Triangular detector tuning (the `tri_*` keys of spec §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriSettings {
    pub fee: Decimal,
    pub min_net_bps: Decimal,
    pub require_topofbook: bool,
    pub min_quote_vol: Decimal,
    pub currencies_limit: usize,
    pub fee_bps_per_hop: Decimal,
    pub latency_penalty_bps: Decimal,
}

impl Default for TriSettings {
    fn default() -> Self {
        Self {
            fee: dec!(0.001),
            min_net_bps: dec!(10),
            require_topofbook: true,
            min_quote_vol: Decimal::ZERO,
            currencies_limit: 40,
            fee_bps_per_hop: dec!(10),
            latency_penalty_bps: Decimal::ZERO,
        }
    }
}

/// Dispatcher scheduling tuning (spec §4.8): `min_amounts` is keyed by venue name (matching the
/// config file's flat string keys) rather than [`ExchangeId`] directly, so an unrecognized venue
/// name in the file doesn't fail the whole config load — it's simply never looked up.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    pub per_exchange_concurrency: usize,
    pub max_workers: usize,
    pub min_amounts: HashMap<String, Decimal>,
    pub emergency_on_negative: bool,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            per_exchange_concurrency: 1,
            max_workers: 4,
            min_amounts: HashMap::new(),
            emergency_on_negative: true,
        }
    }
}

impl DispatcherSettings {
    pub fn min_amount_for(&self, exchange: ExchangeId) -> Decimal {
        self.min_amounts
            .get(&exchange.to_string())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// The full engine configuration tree (spec §6), assembled as one hierarchical document rather
/// than per-component files — every `bf_*`/`tri_*`/Swapper/Mirror/Sizing/dispatcher key in the
/// spec lands under one of this struct's nested settings groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: RunMode,
    /// Raw `ex` value (`"trusted"` / `"all"` / a comma list); resolve with
    /// [`EngineConfig::resolve_exchanges`] rather than reading this field directly.
    pub ex: String,
    pub quote: Currency,
    pub bf_allowed_quotes: Vec<Currency>,
    pub bf: BfSettings,
    pub tri: TriSettings,
    pub swapper: SwapperConfig,
    pub dispatcher: DispatcherSettings,
    pub iter_timeout_sec: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Bf,
            ex: "trusted".to_string(),
            quote: Currency::new("USDT"),
            bf_allowed_quotes: vec![Currency::new("USDT"), Currency::new("USDC")],
            bf: BfSettings::default(),
            tri: TriSettings::default(),
            swapper: SwapperConfig::default(),
            dispatcher: DispatcherSettings::default(),
            iter_timeout_sec: 30,
        }
    }
}

impl EngineConfig {
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ConfigError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Resolve the `ex` field into a concrete venue list, grounded on
    /// `original_source::resolve_exchanges`: `"trusted"` is the original's fixed four-venue
    /// subset, `"all"` is every venue this engine has an adapter for (excluding the test-only
    /// [`ExchangeId::Mock`]), anything else is a comma-separated list of names/aliases resolved
    /// through [`ExchangeId::normalize`].
    pub fn resolve_exchanges(&self) -> Result<Vec<ExchangeId>, ConfigError> {
        let arg = self.ex.trim().to_ascii_lowercase();
        match arg.as_str() {
            "" | "trusted" | "trusted-plus" | "trusted_plus" | "trustedplus" => Ok(vec![
                ExchangeId::Binance,
                ExchangeId::Bitget,
                ExchangeId::Bybit,
                ExchangeId::Coinbase,
            ]),
            "all" => Ok(vec![
                ExchangeId::Binance,
                ExchangeId::Bitget,
                ExchangeId::Bybit,
                ExchangeId::Coinbase,
                ExchangeId::Gateio,
                ExchangeId::Hyperliquid,
                ExchangeId::Kraken,
                ExchangeId::Kucoin,
                ExchangeId::Mexc,
                ExchangeId::Okx,
            ]),
            _ => arg
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| ExchangeId::normalize(entry).ok_or_else(|| ConfigError::UnknownExchange(entry.to_string())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_source_fallbacks() {
        let config = EngineConfig::default();
        assert_eq!(config.mode, RunMode::Bf);
        assert_eq!(config.bf.min_hops, 2);
        assert_eq!(config.bf.max_hops, 4);
    }

    #[test]
    fn trusted_preset_resolves_to_the_four_original_venues() {
        let config = EngineConfig {
            ex: "trusted".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(
            config.resolve_exchanges().unwrap(),
            vec![ExchangeId::Binance, ExchangeId::Bitget, ExchangeId::Bybit, ExchangeId::Coinbase]
        );
    }

    #[test]
    fn comma_list_resolves_aliases() {
        let config = EngineConfig {
            ex: "gateio, okex, coinbasepro".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(
            config.resolve_exchanges().unwrap(),
            vec![ExchangeId::Gateio, ExchangeId::Okx, ExchangeId::Coinbase]
        );
    }

    #[test]
    fn unknown_exchange_name_is_an_error() {
        let config = EngineConfig {
            ex: "not-a-venue".to_string(),
            ..EngineConfig::default()
        };
        assert!(config.resolve_exchanges().is_err());
    }

    #[test]
    fn deserializes_a_partial_yaml_document_with_defaults() {
        let yaml = "mode: tri\nquote: USDC\nbf:\n  min_hops: 3\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.mode, RunMode::Tri);
        assert_eq!(config.quote, Currency::new("USDC"));
        assert_eq!(config.bf.min_hops, 3);
        assert_eq!(config.bf.max_hops, 4, "unspecified bf keys keep their default");
    }
}
