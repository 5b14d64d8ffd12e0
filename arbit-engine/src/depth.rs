use arbit_data::adapter::AdapterError;
use arbit_data::books::cache::PartialBookCache;
use arbit_data::books::{Level, OrderBook};
use arbit_data::ExchangeAdapter;
use arbit_execution::plan::SwapHop;
use arbit_instrument::{Currency, Market, MarketMetadata, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Errors the Depth Revalidator (spec §4.6) surfaces as hard failures, distinct from the
/// conservative "reject this cycle" outcome it returns for insufficient depth or a return that
/// no longer clears threshold once slippage is accounted for.
#[derive(Debug, Error)]
pub enum DepthError {
    #[error("hop {base}/{quote} is not a known market on this venue")]
    UnknownHopMarket { base: Currency, quote: Currency },
}

/// Tuning for one detector's (`bf_*` or `tri_*`) depth revalidation pass.
#[derive(Debug, Clone)]
pub struct DepthRevalidatorConfig {
    pub depth_levels: usize,
    pub use_ws: bool,
    pub max_book_age_ms: u64,
    pub fee: Decimal,
    pub min_net_pct: Decimal,
    pub min_net_per_hop_pct: Decimal,
    pub latency_penalty_bps: Decimal,
}

/// One hop's realized fill after walking its order book, replacing the theoretical top-of-book
/// amount the graph/cycle detectors assumed.
#[derive(Debug, Clone)]
pub struct HopWalk {
    pub base: Currency,
    pub quote: Currency,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub slippage_bps: Decimal,
}

/// A cycle's size-aware realized return, re-checked against the same thresholds the theoretical
/// detector applied.
#[derive(Debug, Clone)]
pub struct DepthRevalidation {
    pub hops: Vec<HopWalk>,
    pub net_pct: Decimal,
}

/// Re-walk a detected cycle's order books hop by hop (spec §4.6). `Ok(None)` covers every
/// conservative rejection this step can produce — a hop's book unavailable within the freshness
/// window, insufficient depth to fill the full size, or an adjusted return that no longer clears
/// `min_net`/`min_net_per_hop` — since none of those are a defect in the pipeline, just a cycle
/// that doesn't survive contact with real depth. `Err` is reserved for a hop whose market isn't
/// known to this venue at all, which points at a stale universe rather than thin liquidity.
pub async fn revalidate(
    adapter: &dyn ExchangeAdapter,
    cache: &PartialBookCache,
    markets: &HashMap<Market, MarketMetadata>,
    hops: &[SwapHop],
    start_amount: Decimal,
    config: &DepthRevalidatorConfig,
) -> Result<Option<DepthRevalidation>, DepthError> {
    let mut amount = start_amount;
    let mut walks = Vec::with_capacity(hops.len());
    let mut slip_bps_total = Decimal::ZERO;

    for hop in hops {
        let (market, side) = resolve_hop_market(markets, hop).ok_or_else(|| DepthError::UnknownHopMarket {
            base: hop.base.clone(),
            quote: hop.quote.clone(),
        })?;

        let book = match fetch_book(adapter, cache, &market, config).await {
            Ok(book) => book,
            Err(error) => {
                debug!(%market, ?error, "depth revalidation has no usable order book for this hop");
                return Ok(None);
            }
        };

        let Some((amount_out, slippage_bps)) = walk_hop(&book, side, amount) else {
            debug!(%market, %side, %amount, "order book depth cannot fill this hop's full size");
            return Ok(None);
        };

        slip_bps_total += slippage_bps;
        walks.push(HopWalk {
            base: hop.base.clone(),
            quote: hop.quote.clone(),
            amount_in: amount,
            amount_out,
            slippage_bps,
        });
        amount = amount_out;
    }

    let hops_count = Decimal::from(hops.len() as u64);
    let fee_bps_total = config.fee * Decimal::from(10_000) * hops_count;
    let gross_pct = (amount / start_amount - Decimal::ONE) * Decimal::from(100);
    let net_pct =
        gross_pct - fee_bps_total / Decimal::from(100) - slip_bps_total / Decimal::from(100) - config.latency_penalty_bps / Decimal::from(100);

    if net_pct < config.min_net_pct || net_pct / hops_count < config.min_net_per_hop_pct {
        return Ok(None);
    }

    Ok(Some(DepthRevalidation { hops: walks, net_pct }))
}

/// Mirrors `arbit_execution::swapper`'s private hop-market resolution: a hop converts `base`
/// into `quote`, which is either the venue's direct `base/quote` market (sell side) or the
/// inverse `quote/base` market (buy side) when only that orientation is listed.
fn resolve_hop_market(markets: &HashMap<Market, MarketMetadata>, hop: &SwapHop) -> Option<(Market, Side)> {
    let direct = Market::new(hop.base.clone(), hop.quote.clone());
    if markets.contains_key(&direct) {
        return Some((direct, Side::Sell));
    }
    let inverse = Market::new(hop.quote.clone(), hop.base.clone());
    if markets.contains_key(&inverse) {
        return Some((inverse, Side::Buy));
    }
    None
}

async fn fetch_book(
    adapter: &dyn ExchangeAdapter,
    cache: &PartialBookCache,
    market: &Market,
    config: &DepthRevalidatorConfig,
) -> Result<OrderBook, AdapterError> {
    if config.use_ws {
        if let Some(age_ms) = cache.latency_ms(market) {
            if age_ms <= config.max_book_age_ms {
                if let Some(book) = cache.last_book(market) {
                    return Ok(book);
                }
            }
        }
    }
    adapter.fetch_order_book(market, config.depth_levels).await
}

/// Walk one hop's book for `amount_in` of the hop's base currency, returning `(amount_out,
/// slippage_bps)` measured against the book's top level, or `None` if the book can't cover the
/// whole size.
fn walk_hop(book: &OrderBook, side: Side, amount_in: Decimal) -> Option<(Decimal, Decimal)> {
    match side {
        Side::Sell => {
            let top = book.bids().levels().first()?.price;
            let (avg_price, unfilled) = book.walk(book.bids(), amount_in);
            if unfilled > Decimal::ZERO || avg_price.is_zero() {
                return None;
            }
            Some((amount_in * avg_price, slippage_bps(top, avg_price, side)))
        }
        Side::Buy => {
            let top = book.asks().levels().first()?.price;
            let (amount_out, unfilled_budget) = walk_by_quote_budget(book.asks().levels(), amount_in);
            if unfilled_budget > Decimal::ZERO || amount_out.is_zero() {
                return None;
            }
            let avg_price = amount_in / amount_out;
            Some((amount_out, slippage_bps(top, avg_price, side)))
        }
    }
}

/// Complement to [`OrderBook::walk`], which spends a fixed amount of *base* currency: this spends
/// a fixed *quote*-currency budget against ascending ask levels, needed for a hop that buys the
/// market's base with a fixed amount of its quote. Returns the base currency bought and any
/// budget left unspent if the book's depth ran out first.
fn walk_by_quote_budget(levels: &[Level], budget: Decimal) -> (Decimal, Decimal) {
    let mut remaining_budget = budget;
    let mut base_bought = Decimal::ZERO;
    for level in levels {
        if remaining_budget <= Decimal::ZERO {
            break;
        }
        let level_notional = level.price * level.amount;
        if level_notional <= remaining_budget {
            base_bought += level.amount;
            remaining_budget -= level_notional;
        } else {
            base_bought += remaining_budget / level.price;
            remaining_budget = Decimal::ZERO;
        }
    }
    (base_bought, remaining_budget)
}

fn slippage_bps(top_price: Decimal, avg_price: Decimal, side: Side) -> Decimal {
    if top_price.is_zero() {
        return Decimal::ZERO;
    }
    let diff = match side {
        Side::Sell => top_price - avg_price,
        Side::Buy => avg_price - top_price,
    };
    (diff / top_price * Decimal::from(10_000)).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_data::adapter::mock::MockAdapter;
    use arbit_instrument::ExchangeId;
    use rust_decimal_macros::dec;

    fn metadata() -> MarketMetadata {
        MarketMetadata {
            active: true,
            min_amount: Decimal::ZERO,
            min_cost: Decimal::ZERO,
            amount_precision: 8,
            price_precision: 8,
        }
    }

    fn book(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> OrderBook {
        OrderBook::new(1, None, bids, asks)
    }

    #[tokio::test]
    async fn sells_through_thin_depth_and_reports_slippage() {
        let markets = HashMap::from([(Market::new("BTC", "USDT"), metadata())]);
        let cache_book = book(vec![(dec!(100), dec!(1)), (dec!(99), dec!(5))], vec![]);
        let cache = PartialBookCache::new();
        // No WS subscription is spun up in this test; fetch_book falls back to the adapter's
        // REST snapshot, which MockAdapter answers from its configured books.
        let adapter = MockAdapter::new(ExchangeId::Mock);
        adapter.seed_order_book(Market::new("BTC", "USDT"), cache_book);

        let hops = vec![SwapHop::new("BTC", "USDT")];
        let config = DepthRevalidatorConfig {
            depth_levels: 10,
            use_ws: false,
            max_book_age_ms: 500,
            fee: dec!(0.001),
            min_net_pct: Decimal::ZERO,
            min_net_per_hop_pct: Decimal::ZERO,
            latency_penalty_bps: Decimal::ZERO,
        };

        let result = revalidate(&adapter, &cache, &markets, &hops, dec!(2), &config).await.unwrap();
        let revalidation = result.expect("book covers the requested size");
        assert_eq!(revalidation.hops.len(), 1);
        // 1 @100 + 1 @99 = 199, top was 100 => 1% slippage on the walked average of 99.5.
        assert!(revalidation.hops[0].slippage_bps > Decimal::ZERO);
    }

    #[tokio::test]
    async fn insufficient_book_depth_rejects_the_cycle() {
        let markets = HashMap::from([(Market::new("BTC", "USDT"), metadata())]);
        let thin_book = book(vec![(dec!(100), dec!(1))], vec![]);
        let cache = PartialBookCache::new();
        let adapter = MockAdapter::new(ExchangeId::Mock);
        adapter.seed_order_book(Market::new("BTC", "USDT"), thin_book);

        let hops = vec![SwapHop::new("BTC", "USDT")];
        let config = DepthRevalidatorConfig {
            depth_levels: 10,
            use_ws: false,
            max_book_age_ms: 500,
            fee: dec!(0.001),
            min_net_pct: Decimal::ZERO,
            min_net_per_hop_pct: Decimal::ZERO,
            latency_penalty_bps: Decimal::ZERO,
        };

        let result = revalidate(&adapter, &cache, &markets, &hops, dec!(5), &config).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn quote_budget_walk_matches_a_single_level_purchase() {
        let levels = vec![Level::new(dec!(10), dec!(3))];
        let (bought, remaining) = walk_by_quote_budget(&levels, dec!(20));
        assert_eq!(bought, dec!(2));
        assert_eq!(remaining, Decimal::ZERO);
    }

    #[test]
    fn quote_budget_walk_reports_unspent_budget_past_book_depth() {
        let levels = vec![Level::new(dec!(10), dec!(1))];
        let (bought, remaining) = walk_by_quote_budget(&levels, dec!(50));
        assert_eq!(bought, dec!(1));
        assert_eq!(remaining, dec!(40));
    }
}
