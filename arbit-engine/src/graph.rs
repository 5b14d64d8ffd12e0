use arbit_instrument::{Currency, ExchangeId, Market, Ticker};
use indexmap::IndexSet;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Errors building a [`RateGraph`], grounded on `original_source`'s `build_rates_for_exchange`
/// bail-out paths.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("exchange {0} has no anchors with any usable ticker")]
    EmptyUniverse(ExchangeId),
}

/// Configuration shared by both the Bellman-Ford and triangular universes (spec §4.2); callers
/// build two instances from `EngineConfig` — one from the `bf_*` keys, one from `tri_*` — since
/// the algorithm is identical but each detector tunes it independently.
#[derive(Debug, Clone)]
pub struct GraphBuilderConfig {
    /// Currencies always kept in the universe and preferred as cycle rotation points, in
    /// priority order (first present wins).
    pub anchors: Vec<Currency>,
    pub fee: Decimal,
    pub require_topofbook: bool,
    pub min_quote_vol: Decimal,
    pub currencies_limit: usize,
    /// Restrict the non-anchor universe to currencies that quote against *every* anchor.
    pub require_dual_quote: bool,
    /// Rank the non-anchor universe by aggregated anchor-paired quote volume before truncating.
    pub rank_by_liquidity: bool,
}

/// A directed, fee-adjusted currency graph for one venue (spec §4.2). `rates` is the parallel
/// map path reconstruction reads from; `edges`' weights are `-ln(rate)` so a negative cycle in
/// log-space is a profitable cycle in rate-space.
#[derive(Debug, Clone)]
pub struct RateGraph {
    pub currencies: IndexSet<Currency>,
    pub edges: Vec<Edge>,
    pub rates: HashMap<(usize, usize), Decimal>,
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub weight: Decimal,
}

impl RateGraph {
    pub fn node_count(&self) -> usize {
        self.currencies.len()
    }

    pub fn currency(&self, index: usize) -> &Currency {
        &self.currencies[index]
    }

    pub fn rate(&self, from: usize, to: usize) -> Option<Decimal> {
        self.rates.get(&(from, to)).copied()
    }
}

/// The post-fee rate and the quote volume it was judged against, for one usable direction
/// between `u` and `v`.
struct UsableRate {
    rate: Decimal,
    quote_volume: Decimal,
}

/// Pick the usable direction between `u` and `v` and compute its post-fee rate (spec §4.2 step
/// 1): direct `u/v` sells `u` at the bid, inverse `v/u` buys `v` with `u` at the ask. Shared by
/// the graph builder and the triangular enumerator (§4.4), which looks up `r1`/`r2`/`r3`
/// through the same direction-selection rule.
pub fn usable_rate(
    tickers: &HashMap<Market, Ticker>,
    u: &Currency,
    v: &Currency,
    fee: Decimal,
    require_topofbook: bool,
) -> Option<(Decimal, Decimal)> {
    let one_minus_fee = Decimal::ONE - fee;

    if let Some(ticker) = tickers.get(&Market::new(u.clone(), v.clone())) {
        if is_usable(ticker.bid, require_topofbook) {
            let volume = ticker.quote_volume.unwrap_or(Decimal::ZERO);
            return Some((ticker.bid * one_minus_fee, volume));
        }
    }

    if let Some(ticker) = tickers.get(&Market::new(v.clone(), u.clone())) {
        if is_usable(ticker.ask, require_topofbook) {
            let volume = ticker.quote_volume.unwrap_or(Decimal::ZERO);
            return Some((Decimal::ONE / ticker.ask * one_minus_fee, volume));
        }
    }

    None
}

fn is_usable(price: Decimal, require_topofbook: bool) -> bool {
    if require_topofbook {
        price > Decimal::ZERO
    } else {
        price >= Decimal::ZERO
    }
}

fn usable(tickers: &HashMap<Market, Ticker>, u: &Currency, v: &Currency, config: &GraphBuilderConfig) -> Option<UsableRate> {
    usable_rate(tickers, u, v, config.fee, config.require_topofbook)
        .map(|(rate, quote_volume)| UsableRate { rate, quote_volume })
}

/// Build the currency universe `C` (spec §4.2 "Universe selection"): anchors are always kept;
/// remaining currencies come from markets touching any anchor, optionally restricted to
/// currencies quoting against every anchor, optionally ranked by aggregated anchor-paired quote
/// volume, truncated to `currencies_limit`, and finally rotated so an anchor sits at index 0.
fn select_universe(tickers: &HashMap<Market, Ticker>, config: &GraphBuilderConfig) -> IndexSet<Currency> {
    // An anchor only earns its permanent seat once it actually appears in this venue's
    // tickers; an anchor absent from every market (or a venue with no tickers at all) leaves
    // the universe empty rather than a single unusable node.
    let present_anchors: Vec<Currency> = config
        .anchors
        .iter()
        .filter(|anchor| tickers.keys().any(|market| &market.base == *anchor || &market.quote == *anchor))
        .cloned()
        .collect();

    let mut touching: HashMap<Currency, Decimal> = HashMap::new();

    for market in tickers.keys() {
        for anchor in &config.anchors {
            if &market.base == anchor && !config.anchors.contains(&market.quote) {
                *touching.entry(market.quote.clone()).or_insert(Decimal::ZERO) += Decimal::ZERO;
            } else if &market.quote == anchor && !config.anchors.contains(&market.base) {
                *touching.entry(market.base.clone()).or_insert(Decimal::ZERO) += Decimal::ZERO;
            }
        }
    }

    if config.require_dual_quote {
        touching.retain(|currency, _| {
            config
                .anchors
                .iter()
                .all(|anchor| usable(tickers, currency, anchor, config).is_some() || usable(tickers, anchor, currency, config).is_some())
        });
    }

    if config.rank_by_liquidity {
        for (currency, volume) in touching.iter_mut() {
            let mut aggregated = Decimal::ZERO;
            for anchor in &config.anchors {
                if let Some(usable) = usable(tickers, currency, anchor, config) {
                    aggregated += usable.quote_volume;
                }
            }
            *volume = aggregated;
        }
    }

    let mut ranked: Vec<Currency> = touching.keys().cloned().collect();
    if config.rank_by_liquidity {
        ranked.sort_by(|a, b| touching[b].cmp(&touching[a]));
    } else {
        ranked.sort();
    }
    ranked.truncate(config.currencies_limit.saturating_sub(present_anchors.len()));

    let mut universe: IndexSet<Currency> = present_anchors.iter().cloned().collect();
    universe.extend(ranked);
    universe.truncate(config.currencies_limit.max(1));

    rotate_anchor_to_front(universe, &config.anchors)
}

fn rotate_anchor_to_front(universe: IndexSet<Currency>, anchors: &[Currency]) -> IndexSet<Currency> {
    let Some(anchor_index) = anchors.iter().find_map(|anchor| universe.get_index_of(anchor)) else {
        return universe;
    };
    if anchor_index == 0 {
        return universe;
    }
    let items: Vec<Currency> = universe.into_iter().collect();
    let mut rotated = IndexSet::with_capacity(items.len());
    rotated.extend(items[anchor_index..].iter().cloned());
    rotated.extend(items[..anchor_index].iter().cloned());
    rotated
}

/// Build the full rate graph for one venue's ticker snapshot (spec §4.2).
pub fn build_rate_graph(
    exchange: ExchangeId,
    tickers: &HashMap<Market, Ticker>,
    config: &GraphBuilderConfig,
) -> Result<RateGraph, GraphError> {
    let currencies = select_universe(tickers, config);
    if currencies.is_empty() {
        return Err(GraphError::EmptyUniverse(exchange));
    }

    let mut edges = Vec::new();
    let mut rates = HashMap::new();

    for (u_idx, u) in currencies.iter().enumerate() {
        for (v_idx, v) in currencies.iter().enumerate() {
            if u_idx == v_idx {
                continue;
            }
            let Some(found) = usable(tickers, u, v, config) else {
                continue;
            };
            if found.quote_volume < config.min_quote_vol {
                continue;
            }

            rates.insert((u_idx, v_idx), found.rate);
            edges.push(Edge {
                from: u_idx,
                to: v_idx,
                weight: -found.rate.ln(),
            });
        }
    }

    Ok(RateGraph { currencies, edges, rates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ticker(market: Market, bid: Decimal, ask: Decimal, quote_volume: Decimal) -> (Market, Ticker) {
        (
            market.clone(),
            Ticker {
                market,
                bid,
                ask,
                last: (bid + ask) / Decimal::TWO,
                quote_volume: Some(quote_volume),
            },
        )
    }

    fn config(anchors: &[&str]) -> GraphBuilderConfig {
        GraphBuilderConfig {
            anchors: anchors.iter().map(|a| Currency::new(a)).collect(),
            fee: dec!(0.001),
            require_topofbook: true,
            min_quote_vol: Decimal::ZERO,
            currencies_limit: 10,
            require_dual_quote: false,
            rank_by_liquidity: false,
        }
    }

    #[test]
    fn builds_edges_for_a_simple_triangle() {
        let tickers = HashMap::from([
            ticker(Market::new("BTC", "USDT"), dec!(50000), dec!(50010), dec!(1_000_000)),
            ticker(Market::new("ETH", "BTC"), dec!(20), dec!(20.01), dec!(10)),
            ticker(Market::new("ETH", "USDT"), dec!(2499), dec!(2500), dec!(500_000)),
        ]);
        let graph = build_rate_graph(ExchangeId::Mock, &tickers, &config(&["USDT"])).unwrap();

        assert!(graph.currencies.contains(&Currency::new("USDT")));
        assert_eq!(graph.currencies.get_index_of(&Currency::new("USDT")), Some(0));
        assert!(!graph.edges.is_empty());

        let btc = graph.currencies.get_index_of(&Currency::new("BTC")).unwrap();
        let usdt = graph.currencies.get_index_of(&Currency::new("USDT")).unwrap();
        // selling BTC for USDT uses the BTC/USDT bid directly.
        let rate = graph.rate(btc, usdt).unwrap();
        assert_eq!(rate, dec!(50000) * dec!(0.999));
    }

    #[test]
    fn min_quote_vol_drops_illiquid_edges() {
        let mut cfg = config(&["USDT"]);
        cfg.min_quote_vol = dec!(100);
        let tickers = HashMap::from([ticker(Market::new("BTC", "USDT"), dec!(50000), dec!(50010), dec!(1))]);
        let graph = build_rate_graph(ExchangeId::Mock, &tickers, &cfg).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn empty_universe_is_an_error() {
        let cfg = config(&["USDT"]);
        let result = build_rate_graph(ExchangeId::Mock, &HashMap::new(), &cfg);
        assert!(result.is_err());
    }
}
