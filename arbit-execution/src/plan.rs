use arbit_instrument::{Currency, ExchangeId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One leg of a [`SwapPlan`]: convert `base` into `quote` (or the reverse, depending on which
/// side of the market is cheaper to trade). Grounded on `original_source::SwapHop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapHop {
    pub base: Currency,
    pub quote: Currency,
}

impl SwapHop {
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

/// A detected cycle handed to the [`crate::swapper::Swapper`] for a single venue, grounded on
/// `original_source::SwapPlan`. `amount` is the first-hop cap in the first hop's base currency;
/// zero means "let the Swapper compute it" (fixed wallet read or auto sizing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub exchange: ExchangeId,
    pub hops: Vec<SwapHop>,
    pub amount: Decimal,
}

impl SwapPlan {
    pub fn start_currency(&self) -> Option<&Currency> {
        self.hops.first().map(|hop| &hop.base)
    }

    pub fn end_currency(&self) -> Option<&Currency> {
        self.hops.last().map(|hop| &hop.quote)
    }

    /// A cycle is a round trip when it starts and ends on the same currency — the only shape
    /// eligible for mirrored-last-leg execution and for a meaningful `delta`.
    pub fn is_round_trip(&self) -> bool {
        match (self.start_currency(), self.end_currency()) {
            (Some(start), Some(end)) => start == end,
            _ => false,
        }
    }
}

/// Terminal classification of a [`SwapResult`], grounded on `original_source::SwapResult`'s
/// `status` string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStatus {
    /// Every hop executed and (if round-trip) `delta >= 0`.
    Ok,
    /// Round trip finished with `delta < 0` — the unconditional guardrail (spec §4.7).
    Failed,
    /// A mirrored last-leg limit order never meaningfully filled; `delta` is neutralized to 0.
    MirrorPending,
}

/// Fee totals aggregated per currency across every hop of a plan, grounded on
/// `original_source::_sum_fees`.
pub type FeeTotals = HashMap<Currency, Decimal>;

/// Per-hop execution record, grounded on `original_source::swapper.py`'s `fills` list entries.
#[derive(Debug, Clone)]
pub struct HopFill {
    pub base: Currency,
    pub quote: Currency,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub order_id: Option<String>,
    pub fees: FeeTotals,
    pub mirror_last_leg: bool,
}

/// Outcome of running a [`SwapPlan`] through the [`crate::swapper::Swapper`].
#[derive(Debug, Clone)]
pub struct SwapResult {
    pub ok: bool,
    pub status: SwapStatus,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub delta: Decimal,
    pub fills: Vec<HopFill>,
    /// Present only when `status == MirrorPending` and a mark-to-market estimate could be
    /// computed from the currently held non-anchor balance (`original_source`'s `m2m_delta`).
    pub mark_to_market_delta: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_detects_matching_start_and_end_currency() {
        let plan = SwapPlan {
            exchange: ExchangeId::Binance,
            hops: vec![
                SwapHop::new("USDT", "BTC"),
                SwapHop::new("BTC", "ETH"),
                SwapHop::new("ETH", "USDT"),
            ],
            amount: Decimal::ZERO,
        };
        assert!(plan.is_round_trip());
    }

    #[test]
    fn non_round_trip_has_distinct_start_and_end() {
        let plan = SwapPlan {
            exchange: ExchangeId::Binance,
            hops: vec![SwapHop::new("USDT", "BTC")],
            amount: Decimal::ZERO,
        };
        assert!(!plan.is_round_trip());
    }
}
