use crate::graph::{usable_rate, RateGraph};
use arbit_instrument::{Currency, Market, Ticker};
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Bound on the `pred[]` walk (spec §9): guarantees termination into a genuine cycle even if a
/// relaxation race leaves a degenerate self-loop in the array.
fn pred_walk_margin(n: usize) -> usize {
    n + 2
}

/// A closed cycle of currencies, e.g. `[USDT, BTC, ETH]` traversed `USDT->BTC->ETH->USDT`
/// (the closing edge back to `path[0]` is implicit, not repeated in `path`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub path: Vec<Currency>,
    pub net_pct: Decimal,
    pub hops: usize,
}

/// Bellman-Ford detector configuration (the `bf_*` keys of spec §6).
#[derive(Debug, Clone)]
pub struct BfConfig {
    pub min_hops: usize,
    pub max_hops: usize,
    pub min_net_pct: Decimal,
    pub min_net_per_hop_pct: Decimal,
    pub require_quote: bool,
    /// Anchor priority order for the rotate-to-anchor step; independent of (but usually equal
    /// to) the graph builder's own anchor list.
    pub anchor_priority: Vec<Currency>,
    /// Disallowed consecutive `(from, to)` currency pairs.
    pub blacklist: HashSet<(Currency, Currency)>,
    pub top: usize,
}

/// Run Bellman-Ford over `graph` to find negative-weight (profitable) cycles (spec §4.3).
pub fn detect_bf_cycles(graph: &RateGraph, config: &BfConfig) -> Vec<Cycle> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    // dist[*] = 0 rather than the usual dist[source] = 0 / else-infinity: this is the standard
    // single-pass trick for finding a negative cycle anywhere in the graph, equivalent to
    // relaxing from a virtual source connected to every node with weight 0.
    let mut dist = vec![Decimal::ZERO; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];

    for _ in 0..n.saturating_sub(1) {
        let mut updated = false;
        for edge in &graph.edges {
            let candidate = dist[edge.from] + edge.weight;
            if candidate < dist[edge.to] {
                dist[edge.to] = candidate;
                pred[edge.to] = Some(edge.from);
                updated = true;
            }
        }
        if !updated {
            break;
        }
    }

    let relaxing_targets: Vec<usize> = graph
        .edges
        .iter()
        .filter(|edge| dist[edge.from] + edge.weight < dist[edge.to])
        .map(|edge| edge.to)
        .collect();

    let mut seen_rotated: HashSet<Vec<usize>> = HashSet::new();
    let mut cycles = Vec::new();

    for start in relaxing_targets {
        let Some(node_indices) = extract_cycle(&pred, start, n) else {
            continue;
        };
        let Some(cycle) = postprocess_cycle(graph, &node_indices, config, &mut seen_rotated) else {
            continue;
        };
        cycles.push(cycle);
    }

    cycles.sort_by(|a, b| b.net_pct.cmp(&a.net_pct));
    cycles.truncate(config.top);
    cycles
}

/// Walk `pred` from `start` up to `n` steps to guarantee landing inside the negative cycle,
/// then extract node indices until the walk repeats or exceeds `n+2` (spec §4.3/§9).
fn extract_cycle(pred: &[Option<usize>], start: usize, n: usize) -> Option<Vec<usize>> {
    let mut cursor = start;
    for _ in 0..n {
        cursor = pred[cursor]?;
    }

    let entry = cursor;
    let mut nodes = vec![entry];
    let mut current = entry;
    loop {
        current = pred[current]?;
        if current == entry {
            break;
        }
        nodes.push(current);
        if nodes.len() > pred_walk_margin(n) {
            return None;
        }
    }

    nodes.reverse();
    Some(nodes)
}

fn postprocess_cycle(
    graph: &RateGraph,
    node_indices: &[usize],
    config: &BfConfig,
    seen_rotated: &mut HashSet<Vec<usize>>,
) -> Option<Cycle> {
    let currencies: Vec<Currency> = node_indices.iter().map(|&i| graph.currency(i).clone()).collect();

    if config.require_quote && !config.anchor_priority.iter().any(|anchor| currencies.contains(anchor)) {
        return None;
    }

    let rotation = config
        .anchor_priority
        .iter()
        .find_map(|anchor| currencies.iter().position(|c| c == anchor))
        .unwrap_or(0);

    let mut rotated_indices = node_indices.to_vec();
    rotated_indices.rotate_left(rotation);
    let rotated_currencies: Vec<Currency> = rotated_indices.iter().map(|&i| graph.currency(i).clone()).collect();

    let mut product = Decimal::ONE;
    for window in rotated_indices.windows(2) {
        product *= graph.rate(window[0], window[1])?;
    }
    let closing_rate = graph.rate(*rotated_indices.last().unwrap(), rotated_indices[0])?;
    product *= closing_rate;

    let hops = rotated_indices.len();
    if hops < config.min_hops || hops > config.max_hops {
        return None;
    }

    if blacklisted(&rotated_currencies, config) {
        return None;
    }

    if !seen_rotated.insert(rotated_indices.clone()) {
        return None;
    }

    let net_pct = (product - Decimal::ONE) * Decimal::from(100);
    if net_pct < config.min_net_pct {
        return None;
    }
    if net_pct / Decimal::from(hops as u64) < config.min_net_per_hop_pct {
        return None;
    }

    Some(Cycle {
        path: rotated_currencies,
        net_pct,
        hops,
    })
}

fn blacklisted(path: &[Currency], config: &BfConfig) -> bool {
    if config.blacklist.is_empty() {
        return false;
    }
    path.iter()
        .zip(path.iter().cycle().skip(1))
        .any(|(from, to)| config.blacklist.contains(&(from.clone(), to.clone())))
}

/// Triangular detector configuration (the `tri_*` keys of spec §6).
#[derive(Debug, Clone)]
pub struct TriConfig {
    pub anchor: Currency,
    pub fee: Decimal,
    pub require_topofbook: bool,
    pub min_quote_vol: Decimal,
    pub currencies_limit: usize,
    pub fee_bps_per_hop: Decimal,
    pub latency_penalty_bps: Decimal,
    pub min_net_bps: Decimal,
    pub blacklist: HashSet<(Currency, Currency)>,
}

/// A triangular `Q -> X -> Y -> Q` opportunity (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriOpportunity {
    pub anchor: Currency,
    pub x: Currency,
    pub y: Currency,
    pub r1: Decimal,
    pub r2: Decimal,
    pub r3: Decimal,
    pub net_bps: Decimal,
}

/// Enumerate every ordered `(X, Y)` pair in the anchor's quoting set and evaluate the
/// `Q->X->Y->Q` triangle (spec §4.4).
pub fn detect_triangular(tickers: &HashMap<Market, Ticker>, config: &TriConfig) -> Vec<TriOpportunity> {
    let universe = triangular_universe(tickers, config);
    let mut found = Vec::new();

    for pair in universe.iter().permutations(2) {
        let (x, y) = (pair[0], pair[1]);
        if config.blacklist.contains(&(config.anchor.clone(), (*x).clone()))
            || config.blacklist.contains(&((*x).clone(), (*y).clone()))
            || config.blacklist.contains(&((*y).clone(), config.anchor.clone()))
        {
            continue;
        }

        let Some((r1, vol1)) = usable_rate(tickers, &config.anchor, x, config.fee, config.require_topofbook) else {
            continue;
        };
        let Some((r3, vol3)) = usable_rate(tickers, y, &config.anchor, config.fee, config.require_topofbook) else {
            continue;
        };
        let Some((r2, vol2)) = usable_rate(tickers, x, y, config.fee, config.require_topofbook) else {
            continue;
        };

        if vol1 < config.min_quote_vol || vol2 < config.min_quote_vol || vol3 < config.min_quote_vol {
            continue;
        }

        let net_bps = (r1 * r2 * r3 - Decimal::ONE) * Decimal::from(10_000)
            - config.fee_bps_per_hop * Decimal::from(3)
            - config.latency_penalty_bps;

        if net_bps < config.min_net_bps {
            continue;
        }

        found.push(TriOpportunity {
            anchor: config.anchor.clone(),
            x: (*x).clone(),
            y: (*y).clone(),
            r1,
            r2,
            r3,
            net_bps,
        });
    }

    found
}

fn triangular_universe(tickers: &HashMap<Market, Ticker>, config: &TriConfig) -> Vec<Currency> {
    let mut candidates: Vec<Currency> = tickers
        .keys()
        .filter_map(|market| {
            if market.quote == config.anchor {
                Some(market.base.clone())
            } else if market.base == config.anchor {
                Some(market.quote.clone())
            } else {
                None
            }
        })
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates.truncate(config.currencies_limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_rate_graph, GraphBuilderConfig};
    use arbit_instrument::ExchangeId;
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

    fn graph_config() -> GraphBuilderConfig {
        GraphBuilderConfig {
            anchors: vec![Currency::new("USDT")],
            fee: dec!(0.001),
            require_topofbook: true,
            min_quote_vol: Decimal::ZERO,
            currencies_limit: 10,
            require_dual_quote: false,
            rank_by_liquidity: false,
        }
    }

    fn bf_config() -> BfConfig {
        BfConfig {
            min_hops: 2,
            max_hops: 4,
            min_net_pct: dec!(0.5),
            min_net_per_hop_pct: Decimal::ZERO,
            require_quote: true,
            anchor_priority: vec![Currency::new("USDT")],
            blacklist: HashSet::new(),
            top: 5,
        }
    }

    #[test]
    fn s1_below_threshold_product_emits_no_cycle() {
        let tickers = HashMap::from([
            ticker(Market::new("BTC", "USDT"), Decimal::ONE / dec!(0.00002), Decimal::ONE / dec!(0.00002), dec!(1_000_000)),
            ticker(Market::new("BTC", "ETH"), dec!(20), dec!(20), dec!(1_000_000)),
            ticker(Market::new("ETH", "USDT"), dec!(2499), dec!(2499), dec!(1_000_000)),
        ]);
        let mut cfg = graph_config();
        cfg.fee = dec!(0.001);
        let graph = build_rate_graph(ExchangeId::Mock, &tickers, &cfg).unwrap();
        let cycles = detect_bf_cycles(&graph, &bf_config());
        assert!(cycles.is_empty(), "product below min_net should not surface an opportunity");
    }

    #[test]
    fn s2_positive_cycle_is_detected_and_rotated_to_anchor() {
        let tickers = HashMap::from([
            ticker(Market::new("BTC", "USDT"), Decimal::ONE / dec!(0.000025), Decimal::ONE / dec!(0.000025), dec!(1_000_000)),
            ticker(Market::new("BTC", "ETH"), dec!(20), dec!(20), dec!(1_000_000)),
            ticker(Market::new("ETH", "USDT"), dec!(2100), dec!(2100), dec!(1_000_000)),
        ]);
        let cfg = graph_config();
        let graph = build_rate_graph(ExchangeId::Mock, &tickers, &cfg).unwrap();
        let cycles = detect_bf_cycles(&graph, &bf_config());

        assert!(!cycles.is_empty(), "expected at least one profitable cycle");
        let best = &cycles[0];
        assert_eq!(best.path[0], Currency::new("USDT"));
        assert_eq!(best.hops, 3);
        assert!(best.net_pct > dec!(4.0) && best.net_pct < dec!(5.0), "net_pct was {}", best.net_pct);
    }

    #[test]
    fn triangular_emits_when_net_bps_clears_threshold() {
        let tickers = HashMap::from([
            ticker(Market::new("BTC", "USDT"), Decimal::ONE / dec!(0.000025), Decimal::ONE / dec!(0.000025), dec!(1_000_000)),
            ticker(Market::new("BTC", "ETH"), dec!(20), dec!(20), dec!(1_000_000)),
            ticker(Market::new("ETH", "USDT"), dec!(2100), dec!(2100), dec!(1_000_000)),
        ]);
        let config = TriConfig {
            anchor: Currency::new("USDT"),
            fee: dec!(0.001),
            require_topofbook: true,
            min_quote_vol: Decimal::ZERO,
            currencies_limit: 10,
            fee_bps_per_hop: dec!(10),
            latency_penalty_bps: Decimal::ZERO,
            min_net_bps: dec!(50),
            blacklist: HashSet::new(),
        };
        let found = detect_triangular(&tickers, &config);
        assert!(found.iter().any(|o| o.x == Currency::new("BTC") && o.y == Currency::new("ETH")));
    }

    #[test]
    fn triangular_rejects_illiquid_hop() {
        let tickers = HashMap::from([
            ticker(Market::new("BTC", "USDT"), dec!(50000), dec!(50000), dec!(1)),
            ticker(Market::new("ETH", "BTC"), dec!(20), dec!(20), dec!(1)),
            ticker(Market::new("ETH", "USDT"), dec!(1000000), dec!(1000000), dec!(1)),
        ]);
        let config = TriConfig {
            anchor: Currency::new("USDT"),
            fee: dec!(0.001),
            require_topofbook: true,
            min_quote_vol: dec!(100),
            currencies_limit: 10,
            fee_bps_per_hop: dec!(10),
            latency_penalty_bps: Decimal::ZERO,
            min_net_bps: Decimal::ZERO,
            blacklist: HashSet::new(),
        };
        assert!(detect_triangular(&tickers, &config).is_empty());
    }
}
