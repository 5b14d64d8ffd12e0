use crate::order::OrderType;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Unique identifier for a venue supported by the engine.
///
/// Only the spot arbitrage universe is modelled (§1 Non-goals: no futures/margin), so this is
/// deliberately a flat enum rather than per-kind variants (c.f.
/// `jackbot-instrument::exchange::ExchangeId`, which also distinguishes futures/options venues).
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeId {
    Binance,
    Bitget,
    Bybit,
    Coinbase,
    Gateio,
    Hyperliquid,
    Kraken,
    Kucoin,
    Mexc,
    Okx,
    /// Deterministic fake adapter used by the Swapper/Dispatcher test suites.
    Mock,
}

impl ExchangeId {
    /// Normalise a loosely-cased venue identifier, resolving the aliases the original
    /// `arbitraje` tooling accepted (`gateio`/`okex`/`coinbasepro`/`huobipro`).
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "binance" => Some(Self::Binance),
            "bitget" => Some(Self::Bitget),
            "bybit" => Some(Self::Bybit),
            "coinbase" | "coinbasepro" => Some(Self::Coinbase),
            "gate" | "gateio" => Some(Self::Gateio),
            "hyperliquid" => Some(Self::Hyperliquid),
            "kraken" => Some(Self::Kraken),
            "kucoin" => Some(Self::Kucoin),
            "mexc" => Some(Self::Mexc),
            "okx" | "okex" => Some(Self::Okx),
            "mock" | "simulated" => Some(Self::Mock),
            _ => None,
        }
    }

    /// The [`VenuePolicy`] capability table for this venue (§4.1, §9 "policy, not branches").
    pub fn policy(&self) -> VenuePolicy {
        match self {
            Self::Binance => VenuePolicy {
                buy_market_uses_quote_cost: true,
                needs_password: false,
                default_order_type: OrderType::Market,
            },
            Self::Bitget => VenuePolicy {
                buy_market_uses_quote_cost: true,
                needs_password: true,
                default_order_type: OrderType::Market,
            },
            Self::Coinbase | Self::Okx | Self::Kucoin => VenuePolicy {
                buy_market_uses_quote_cost: false,
                needs_password: true,
                default_order_type: OrderType::Market,
            },
            _ => VenuePolicy {
                buy_market_uses_quote_cost: false,
                needs_password: false,
                default_order_type: OrderType::Market,
            },
        }
    }
}

/// Per-venue quirks encoded as data (§4.1 table, §9 design note), so adapters share one
/// generic order-placement code path parameterised by this table instead of branching on
/// `ExchangeId` at every call site.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct VenuePolicy {
    /// Whether a market buy is placed using a quote-currency cost (`quoteOrderQty`-style) rather
    /// than a base-currency amount.
    pub buy_market_uses_quote_cost: bool,
    /// Whether authenticated calls require a third credential (API passphrase/password) in
    /// addition to key/secret.
    pub needs_password: bool,
    pub default_order_type: OrderType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_aliases() {
        assert_eq!(ExchangeId::normalize("gateio"), Some(ExchangeId::Gateio));
        assert_eq!(ExchangeId::normalize("GATE"), Some(ExchangeId::Gateio));
        assert_eq!(ExchangeId::normalize("okex"), Some(ExchangeId::Okx));
        assert_eq!(
            ExchangeId::normalize("coinbasepro"),
            Some(ExchangeId::Coinbase)
        );
        assert_eq!(ExchangeId::normalize("nope"), None);
    }

    #[test]
    fn binance_and_bitget_use_quote_cost_on_market_buys() {
        assert!(ExchangeId::Binance.policy().buy_market_uses_quote_cost);
        assert!(ExchangeId::Bitget.policy().buy_market_uses_quote_cost);
        assert!(!ExchangeId::Kraken.policy().buy_market_uses_quote_cost);
    }
}
