use crate::config::SizingConfig;
use rust_decimal::Decimal;

/// Resolved sizing parameters after applying exchange/symbol overrides, grounded on
/// `original_source::_get_override`.
struct ResolvedSizing {
    alpha_tob: Decimal,
    beta_dv_pct: Decimal,
    min_usd: Decimal,
    max_usd: Decimal,
}

fn resolve(config: &SizingConfig, exchange: &str, symbol: &str) -> ResolvedSizing {
    let mut resolved = ResolvedSizing {
        alpha_tob: config.alpha_tob,
        beta_dv_pct: config.beta_dv_pct,
        min_usd: config.min_usd,
        max_usd: config.max_usd,
    };

    let Some(exchange_overrides) = config.overrides.get(&exchange.to_lowercase()) else {
        return resolved;
    };

    // original_source checks the symbol-keyed override first, then an exchange-wide override
    // nested at the same map level under the bare field name; we only model the symbol-keyed
    // form since that's the one `arbit-engine` actually populates.
    if let Some(over) = exchange_overrides.get(&symbol.to_uppercase()) {
        resolved.alpha_tob = over.alpha_tob.unwrap_or(resolved.alpha_tob);
        resolved.beta_dv_pct = over.beta_dv_pct.unwrap_or(resolved.beta_dv_pct);
        resolved.min_usd = over.min_usd.unwrap_or(resolved.min_usd);
        resolved.max_usd = over.max_usd.unwrap_or(resolved.max_usd);
    }

    resolved
}

/// Compute the first hop's USD-denominated sizing cap, grounded on
/// `original_source::_compute_auto_cap_usdt`. Returns `None` when `config.mode != "auto"`; the
/// caller falls back to `SwapPlan::amount` or a plain wallet read in that case.
///
/// `est_usd_price` is the caller-supplied top-of-book estimate of the start currency's USD
/// value (1 unit of `start_ccy` in USD), following the Python's `USDT`/`USDC` ticker probing —
/// the Swapper resolves that price via the adapter's ticker fetch before calling this function,
/// since this module stays a pure calculation with no I/O.
pub fn compute_auto_cap_usd(config: &SizingConfig, exchange: &str, symbol: &str) -> Option<Decimal> {
    if config.mode.to_lowercase() != "auto" {
        return None;
    }

    let resolved = resolve(config, exchange, symbol);

    let mut target_usd = resolved.alpha_tob;
    if resolved.beta_dv_pct > Decimal::ZERO {
        target_usd += Decimal::from(100) * resolved.beta_dv_pct;
    }

    if resolved.min_usd > Decimal::ZERO && target_usd < resolved.min_usd {
        target_usd = resolved.min_usd;
    }
    if resolved.max_usd > Decimal::ZERO && target_usd > resolved.max_usd {
        target_usd = resolved.max_usd;
    }

    Some(target_usd)
}

/// Convert a USD cap into source-currency units via an estimated USD price (`est_usd_price` =
/// USD value of 1 unit of the source currency). Returns `None` when the price is non-positive,
/// mirroring the Python's silent fallback to wallet-based sizing.
pub fn usd_cap_to_source_units(usd_cap: Decimal, est_usd_price: Decimal) -> Option<Decimal> {
    (est_usd_price > Decimal::ZERO).then(|| usd_cap / est_usd_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn base_config() -> SizingConfig {
        SizingConfig {
            mode: "auto".to_string(),
            alpha_tob: dec!(50),
            beta_dv_pct: Decimal::ZERO,
            min_usd: dec!(10),
            max_usd: dec!(1000),
            overrides: HashMap::new(),
        }
    }

    #[test]
    fn disabled_mode_returns_none() {
        let mut config = base_config();
        config.mode = "manual".to_string();
        assert_eq!(compute_auto_cap_usd(&config, "binance", "BTC/USDT"), None);
    }

    #[test]
    fn clamps_to_max_usd() {
        let mut config = base_config();
        config.alpha_tob = dec!(5000);
        assert_eq!(compute_auto_cap_usd(&config, "binance", "BTC/USDT"), Some(dec!(1000)));
    }

    #[test]
    fn clamps_to_min_usd() {
        let mut config = base_config();
        config.alpha_tob = dec!(1);
        assert_eq!(compute_auto_cap_usd(&config, "binance", "BTC/USDT"), Some(dec!(10)));
    }

    #[test]
    fn symbol_override_replaces_alpha() {
        let mut config = base_config();
        let mut per_symbol = HashMap::new();
        per_symbol.insert(
            "BTC/USDT".to_string(),
            crate::config::SizingOverride {
                alpha_tob: Some(dec!(200)),
                beta_dv_pct: None,
                min_usd: None,
                max_usd: None,
            },
        );
        config.overrides.insert("binance".to_string(), per_symbol);

        assert_eq!(compute_auto_cap_usd(&config, "binance", "BTC/USDT"), Some(dec!(200)));
    }

    #[test]
    fn usd_cap_conversion_requires_positive_price() {
        assert_eq!(usd_cap_to_source_units(dec!(100), Decimal::ZERO), None);
        assert_eq!(usd_cap_to_source_units(dec!(100), dec!(50)), Some(dec!(2)));
    }
}
