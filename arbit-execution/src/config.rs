use arbit_instrument::{OrderType, TimeInForce};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

/// Which of [`crate::swapper::Swapper`]'s two code paths `run` takes, grounded on
/// `original_source::Swapper.mode` (`"test"` / else real).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapMode {
    #[default]
    Test,
    Real,
}

/// Per-exchange/per-symbol overrides of [`SizingConfig`]'s auto-cap parameters, grounded on
/// `original_source`'s `sizing.overrides.<exchange>` / `.<exchange>.<SYMBOL>` nesting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SizingOverride {
    pub alpha_tob: Option<Decimal>,
    pub beta_dv_pct: Option<Decimal>,
    pub min_usd: Option<Decimal>,
    pub max_usd: Option<Decimal>,
}

/// Auto-sizing configuration for the first hop's cap, grounded on
/// `original_source::_compute_auto_cap_usdt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// `"auto"` enables the computation below; anything else (including absent) means the
    /// Swapper relies on `SwapPlan::amount` or a plain wallet read.
    pub mode: String,
    pub alpha_tob: Decimal,
    pub beta_dv_pct: Decimal,
    pub min_usd: Decimal,
    pub max_usd: Decimal,
    #[serde(default)]
    pub overrides: HashMap<String, HashMap<String, SizingOverride>>,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            mode: String::new(),
            alpha_tob: Decimal::ZERO,
            beta_dv_pct: Decimal::ZERO,
            min_usd: Decimal::ZERO,
            max_usd: Decimal::ZERO,
            overrides: HashMap::new(),
        }
    }
}

/// Full Swapper configuration, grounded field-for-field on `original_source::Swapper.__init__`.
/// Loaded as part of `arbit-engine::config::EngineConfig`'s tree rather than its own standalone
/// file, per spec §6.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwapperConfig {
    pub mode: SwapMode,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub max_slippage_bps: Decimal,
    pub min_notional: Decimal,
    pub dry_run: bool,

    pub roundtrip_mirror_last_leg: bool,
    pub roundtrip_mirror_price_offset_bps: Decimal,
    pub roundtrip_mirror_amount_tolerance_bps: Decimal,

    pub mirror_reemit_ttl_sec: u64,
    pub mirror_reemit_safety_bps: Decimal,
    pub mirror_reemit_max: u32,

    pub mirror_relax_after_sec: u64,
    pub mirror_relax_bps_per_ttl: Decimal,
    pub mirror_relax_max_bps: Decimal,

    pub mirror_close_timeout_sec: u64,
    pub roundtrip_allow_max_loss_bps: Decimal,

    pub settle_sleep_ms: u64,
    pub confirm_fill: bool,

    pub sizing: SizingConfig,

    #[serde(default)]
    pub test_min_amounts: HashMap<String, Decimal>,
}

impl Default for SwapperConfig {
    fn default() -> Self {
        Self {
            mode: SwapMode::Test,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Ioc,
            max_slippage_bps: dec!(25),
            min_notional: dec!(1),
            dry_run: false,
            roundtrip_mirror_last_leg: false,
            roundtrip_mirror_price_offset_bps: Decimal::ZERO,
            roundtrip_mirror_amount_tolerance_bps: Decimal::ZERO,
            mirror_reemit_ttl_sec: 0,
            mirror_reemit_safety_bps: Decimal::ZERO,
            mirror_reemit_max: 0,
            mirror_relax_after_sec: 0,
            mirror_relax_bps_per_ttl: Decimal::ZERO,
            mirror_relax_max_bps: Decimal::ZERO,
            mirror_close_timeout_sec: 0,
            roundtrip_allow_max_loss_bps: Decimal::ZERO,
            settle_sleep_ms: 0,
            confirm_fill: false,
            sizing: SizingConfig::default(),
            test_min_amounts: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_source_fallbacks() {
        let config = SwapperConfig::default();
        assert_eq!(config.max_slippage_bps, dec!(25));
        assert_eq!(config.min_notional, dec!(1));
        assert_eq!(config.time_in_force, TimeInForce::Ioc);
        assert!(!config.roundtrip_mirror_last_leg);
    }

    #[test]
    fn deserializes_a_partial_yaml_document_with_defaults() {
        let yaml = "dry_run: true\nroundtrip_mirror_last_leg: true\n";
        let config: SwapperConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.dry_run);
        assert!(config.roundtrip_mirror_last_leg);
        assert_eq!(config.mirror_reemit_max, 0);
    }
}
